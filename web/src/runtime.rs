//! petite-vue as the [`ReactiveRuntime`].
//!
//! The runtime script is injected at most once per page. Every caller of
//! [`ReactiveRuntime::ensure_available`] awaits the same load, whether it
//! comes from the container orchestrator or the simple loader.

use async_trait::async_trait;
use futures::channel::oneshot;
use futures::future::{LocalBoxFuture, Shared};
use futures::FutureExt;
use gloo_utils::format::JsValueSerdeExt;
use js_sys::{Function, Reflect};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlScriptElement};

use datasrc::config::{RUNTIME_SCRIPT_URL, SCOPE_ERROR_FIELD, SCOPE_LOADING_FIELD};
use datasrc::{ReactiveRuntime, RuntimeError, RuntimeResult, Scope};

use crate::js_message;

type RuntimeLoad = Shared<LocalBoxFuture<'static, RuntimeResult<()>>>;

thread_local! {
    static RUNTIME_LOAD: RefCell<Option<RuntimeLoad>> = const { RefCell::new(None) };
}

/// Bridge to `window.PetiteVue`.
#[derive(Debug, Clone)]
pub struct PetiteVueRuntime {
    script_url: String,
}

impl Default for PetiteVueRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl PetiteVueRuntime {
    pub fn new() -> Self {
        Self::with_script_url(RUNTIME_SCRIPT_URL)
    }

    pub fn with_script_url(script_url: impl Into<String>) -> Self {
        Self {
            script_url: script_url.into(),
        }
    }
}

/// `window.PetiteVue`, if it exposes `createApp`.
fn petite_vue() -> Option<JsValue> {
    let window = web_sys::window()?;
    let runtime = Reflect::get(&window, &JsValue::from_str("PetiteVue")).ok()?;
    if runtime.is_undefined() || runtime.is_null() {
        return None;
    }
    let create_app = Reflect::get(&runtime, &JsValue::from_str("createApp")).ok()?;
    create_app.is_function().then_some(runtime)
}

fn unavailable(message: &str) -> RuntimeError {
    RuntimeError::Unavailable(message.to_string())
}

/// Inject the runtime script and resolve on its `load` or `error` event.
fn inject_script(url: String) -> LocalBoxFuture<'static, RuntimeResult<()>> {
    async move {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| unavailable("No document to load PetiteVue into"))?;
        let script: HtmlScriptElement = document
            .create_element("script")
            .map_err(|e| RuntimeError::Unavailable(js_message(&e)))?
            .dyn_into()
            .map_err(|_| unavailable("PetiteVue load failed"))?;
        script.set_src(&url);
        script.set_defer(true);

        let (tx, rx) = oneshot::channel::<RuntimeResult<()>>();
        let tx = Rc::new(RefCell::new(Some(tx)));

        let on_load = {
            let tx = tx.clone();
            Closure::once(move || {
                let outcome = match petite_vue() {
                    Some(_) => Ok(()),
                    None => Err(unavailable("PetiteVue load failed")),
                };
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(outcome);
                }
            })
        };
        let on_error = Closure::once(move || {
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(Err(unavailable("PetiteVue network error")));
            }
        });
        script.set_onload(Some(on_load.as_ref().unchecked_ref()));
        script.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        on_load.forget();
        on_error.forget();

        let parent: web_sys::Node = match document.head() {
            Some(head) => head.into(),
            None => document
                .document_element()
                .ok_or_else(|| unavailable("No element to load PetiteVue into"))?
                .into(),
        };
        parent
            .append_child(&script)
            .map_err(|e| RuntimeError::Unavailable(js_message(&e)))?;
        log::debug!("Loading PetiteVue from {}", url);

        rx.await.unwrap_or_else(|_| Err(unavailable("PetiteVue load failed")))
    }
    .boxed_local()
}

fn set_field(target: &JsValue, key: &str, value: &JsValue) {
    if let Err(e) = Reflect::set(target, &JsValue::from_str(key), value) {
        log::error!("Cannot write scope field {}: {}", key, js_message(&e));
    }
}

#[async_trait(?Send)]
impl ReactiveRuntime for PetiteVueRuntime {
    type Node = Element;
    type App = JsValue;
    type Handle = Element;

    async fn ensure_available(&self) -> RuntimeResult<()> {
        if petite_vue().is_some() {
            return Ok(());
        }

        let load = RUNTIME_LOAD.with(|slot| {
            slot.borrow_mut()
                .get_or_insert_with(|| inject_script(self.script_url.clone()).shared())
                .clone()
        });
        load.await
    }

    fn create_app(&self, shared: &Value) -> RuntimeResult<JsValue> {
        let runtime = petite_vue().ok_or_else(|| unavailable("PetiteVue load failed"))?;
        let create_app: Function = Reflect::get(&runtime, &JsValue::from_str("createApp"))
            .map_err(|e| RuntimeError::CreateApp(js_message(&e)))?
            .dyn_into()
            .map_err(|_| RuntimeError::CreateApp("createApp is not a function".to_string()))?;

        let shared = JsValue::from_serde(shared).map_err(|e| RuntimeError::CreateApp(e.to_string()))?;
        create_app
            .call1(&runtime, &shared)
            .map_err(|e| RuntimeError::CreateApp(js_message(&e)))
    }

    fn mount(&self, app: &JsValue, node: &Element) -> RuntimeResult<Element> {
        let mount: Function = Reflect::get(app, &JsValue::from_str("mount"))
            .map_err(|e| RuntimeError::Mount(js_message(&e)))?
            .dyn_into()
            .map_err(|_| RuntimeError::Mount("mount is not a function".to_string()))?;

        mount
            .call1(app, node)
            .map_err(|e| RuntimeError::Mount(js_message(&e)))?;
        Ok(node.clone())
    }

    fn commit(&self, handle: &Element, binding: &str, scope: &Scope) {
        let live = match Reflect::get(handle, &JsValue::from_str("__v_scope")) {
            Ok(live) if live.is_object() => live,
            _ => {
                log::error!("Container has no live scope, dropping update for {}", binding);
                return;
            }
        };

        let data = match JsValue::from_serde(&scope.data) {
            Ok(data) => data,
            Err(e) => {
                log::error!("Cannot convert data for {}: {}", binding, e);
                JsValue::NULL
            }
        };
        let error = scope.error.as_deref().map(JsValue::from_str).unwrap_or(JsValue::NULL);

        set_field(&live, binding, &data);
        set_field(&live, SCOPE_ERROR_FIELD, &error);
        set_field(&live, SCOPE_LOADING_FIELD, &JsValue::from_bool(scope.loading));
    }
}
