//! Page-level driver.
//!
//! ```text
//! ready ─▶ discover ─▶ runtime available? ─▶ prepare all ─▶ create app
//!                          │ no                                  │
//!                          ▼                                     ▼
//!                   failure notice                 mount all ─▶ after render ─▶ load all
//! ```
//!
//! Loads start only after every container is mounted, since a load writes
//! into a scope the runtime must already be tracking. They then run
//! interleaved on the current thread and each one commits as soon as it
//! settles.

use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cell::{Ref, RefCell};
use url::Url;

use crate::config::{CONTAINER_SELECTOR, FAILURE_NOTICE_STYLE};
use crate::container::{activate, load, ContainerArena, ContainerDescriptor, ContainerId, Phase};
use crate::error::{LoadError, OrchestratorResult, RuntimeError};
use crate::events::{EventBroadcaster, LifecycleEvent};
use crate::host::{Document, Fetcher, ReactiveRuntime};

/// Terminal state of one container after a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerReport {
    pub id: ContainerId,
    pub source: String,
    pub phase: Phase,
    pub error: Option<String>,
}

/// Outcome of [`Orchestrator::run`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub containers: Vec<ContainerReport>,
}

impl RunReport {
    pub fn ready_count(&self) -> usize {
        self.count(Phase::Ready)
    }

    pub fn failed_count(&self) -> usize {
        self.count(Phase::Failed)
    }

    fn count(&self, phase: Phase) -> usize {
        self.containers.iter().filter(|c| c.phase == phase).count()
    }
}

/// Drives every container of a document through its lifecycle.
pub struct Orchestrator<D, F, R>
where
    D: Document,
{
    document: D,
    fetcher: F,
    runtime: R,
    events: EventBroadcaster,
    containers: RefCell<ContainerArena<D::Node>>,
}

impl<D, F, R> Orchestrator<D, F, R>
where
    D: Document,
    F: Fetcher,
    R: ReactiveRuntime<Node = D::Node>,
{
    pub fn new(document: D, fetcher: F, runtime: R) -> Self {
        Self {
            document,
            fetcher,
            runtime,
            events: EventBroadcaster::new(),
            containers: RefCell::new(ContainerArena::new()),
        }
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    /// Prepared containers and their current state.
    pub fn containers(&self) -> Ref<'_, ContainerArena<D::Node>> {
        self.containers.borrow()
    }

    /// Process the whole document once.
    ///
    /// Per-container failures end up in the containers' scopes and in the
    /// report. Only a missing runtime fails the run, after every eligible
    /// container has been replaced with a failure notice.
    pub async fn run(&self) -> OrchestratorResult<RunReport> {
        self.document.ready().await;

        let nodes = self.document.query_all(CONTAINER_SELECTOR);
        if nodes.is_empty() {
            log::debug!("No containers found, runtime not loaded");
            return Ok(RunReport::default());
        }
        self.events
            .emit(LifecycleEvent::info(format!("Found {} container(s)", nodes.len())));

        if let Err(e) = self.runtime.ensure_available().await {
            self.fail_page(&nodes, &e);
            return Err(e.into());
        }

        let ids: Vec<ContainerId> = nodes.iter().filter_map(|node| self.prepare_one(node)).collect();

        let handles = match self.mount_all(&ids) {
            Ok(handles) => handles,
            Err(e) => {
                self.fail_page(&nodes, &e);
                return Err(e.into());
            }
        };

        self.document.after_render().await;

        let base = self.document.location();
        join_all(
            handles
                .iter()
                .map(|(id, handle)| self.load_one(*id, handle, base.as_ref())),
        )
        .await;

        Ok(self.report())
    }

    fn prepare_one(&self, node: &D::Node) -> Option<ContainerId> {
        let Some(descriptor) = ContainerDescriptor::read(&self.document, node) else {
            log::debug!("Container without source skipped");
            return None;
        };

        let source = descriptor.source.clone();
        let id = self.containers.borrow_mut().insert(node.clone(), descriptor.clone());
        self.events.emit(
            LifecycleEvent::info(format!("Discovered container for {}", source))
                .for_container(id)
                .entering(Phase::Initializing),
        );

        activate(&self.document, node, &descriptor);
        if let Some(state) = self.containers.borrow_mut().get_mut(id) {
            state.begin_loading();
        }
        self.events.emit(
            LifecycleEvent::info(format!("Prepared container for {}", source))
                .for_container(id)
                .entering(Phase::Loading),
        );
        Some(id)
    }

    fn mount_all(&self, ids: &[ContainerId]) -> Result<Vec<(ContainerId, R::Handle)>, RuntimeError> {
        let app = self.runtime.create_app(&Value::Object(Map::new()))?;
        let containers = self.containers.borrow();

        let mut handles = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(state) = containers.get(*id) {
                handles.push((*id, self.runtime.mount(&app, &state.node)?));
            }
        }
        Ok(handles)
    }

    async fn load_one(&self, id: ContainerId, handle: &R::Handle, base: Option<&Url>) {
        let Some(descriptor) = self.containers.borrow().get(id).map(|s| s.descriptor.clone()) else {
            return;
        };

        let outcome = load(&self.fetcher, &descriptor, base).await;

        // Data and loading flag go out in one commit.
        let mut containers = self.containers.borrow_mut();
        let Some(state) = containers.get_mut(id) else {
            return;
        };
        let event = match &outcome {
            Ok(_) => LifecycleEvent::success(format!("Loaded {}", descriptor.source)),
            Err(e) => LifecycleEvent::error(format!("Failed to load {}: {}", descriptor.source, e)),
        };
        state.settle(outcome);
        self.runtime.commit(handle, &descriptor.binding, &state.scope);
        let phase = state.phase;
        drop(containers);

        self.events.emit(event.for_container(id).entering(phase));
    }

    /// Replace every eligible container with a visible failure notice.
    fn fail_page(&self, nodes: &[D::Node], error: &RuntimeError) {
        let notice = failure_notice(&error.to_string());
        for node in nodes {
            self.document.set_inner_html(node, &notice);
        }

        let message = error.to_string();
        let mut containers = self.containers.borrow_mut();
        let ids: Vec<ContainerId> = containers.iter().map(|s| s.id).collect();
        for id in ids {
            if let Some(state) = containers.get_mut(id) {
                state.settle(Err(LoadError::Network(message.clone())));
            }
        }
        drop(containers);

        self.events.emit(LifecycleEvent::error(format!("Adapter failed: {}", message)));
    }

    fn report(&self) -> RunReport {
        RunReport {
            containers: self
                .containers
                .borrow()
                .iter()
                .map(|state| ContainerReport {
                    id: state.id,
                    source: state.descriptor.source.clone(),
                    phase: state.phase,
                    error: state.scope.error.clone(),
                })
                .collect(),
        }
    }
}

/// Markup shown in place of a container when the runtime is unavailable.
pub fn failure_notice(message: &str) -> String {
    format!(
        r#"<pre style="{}">Adapter failed: {}</pre>"#,
        FAILURE_NOTICE_STYLE,
        escape_html(message)
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
