//! The live DOM as a [`Document`].

use async_trait::async_trait;
use futures::channel::oneshot;
use url::Url;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Element;

use datasrc::Document;

use crate::js_message;

/// Wrapper around the page's `document`.
pub struct WebDocument {
    document: web_sys::Document,
}

impl WebDocument {
    /// The current window's document, if there is one.
    pub fn current() -> Option<Self> {
        let document = web_sys::window()?.document()?;
        Some(Self { document })
    }

    fn is_loading(&self) -> bool {
        js_sys::Reflect::get(&self.document, &JsValue::from_str("readyState"))
            .ok()
            .and_then(|state| state.as_string())
            .map(|state| state == "loading")
            .unwrap_or(false)
    }
}

#[async_trait(?Send)]
impl Document for WebDocument {
    type Node = Element;

    async fn ready(&self) {
        if !self.is_loading() {
            return;
        }

        let (tx, rx) = oneshot::channel::<()>();
        let on_ready = Closure::once(move || {
            let _ = tx.send(());
        });
        if let Err(e) = self
            .document
            .add_event_listener_with_callback("DOMContentLoaded", on_ready.as_ref().unchecked_ref())
        {
            log::warn!("Cannot wait for DOMContentLoaded: {}", js_message(&e));
            return;
        }
        on_ready.forget();
        let _ = rx.await;
    }

    async fn after_render(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };

        let (tx, rx) = oneshot::channel::<()>();
        let on_frame = Closure::once(move || {
            let _ = tx.send(());
        });
        if let Err(e) = window.request_animation_frame(on_frame.as_ref().unchecked_ref()) {
            log::warn!("requestAnimationFrame failed: {}", js_message(&e));
            return;
        }
        on_frame.forget();
        let _ = rx.await;
    }

    fn query_all(&self, selector: &str) -> Vec<Element> {
        let list = match self.document.query_selector_all(selector) {
            Ok(list) => list,
            Err(e) => {
                log::error!("Invalid selector '{}': {}", selector, js_message(&e));
                return Vec::new();
            }
        };

        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn set_attribute(&self, node: &Element, name: &str, value: &str) {
        if let Err(e) = node.set_attribute(name, value) {
            log::warn!("Cannot set {}: {}", name, js_message(&e));
        }
    }

    fn remove_attribute(&self, node: &Element, name: &str) {
        if let Err(e) = node.remove_attribute(name) {
            log::warn!("Cannot remove {}: {}", name, js_message(&e));
        }
    }

    fn inner_html(&self, node: &Element) -> String {
        node.inner_html()
    }

    fn set_inner_html(&self, node: &Element, html: &str) {
        node.set_inner_html(html);
    }

    fn location(&self) -> Option<Url> {
        let href = self.document.location()?.href().ok()?;
        Url::parse(&href).ok()
    }
}
