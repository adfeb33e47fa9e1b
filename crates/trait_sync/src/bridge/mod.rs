//! Live wiring between the host editor's components and the canvas DOM.
//!
//! A [`TraitBridge`] listens to the host's lifecycle signals. On mount it
//! applies explicit trait values and starts an attribute observer for traits
//! that mirror into internal elements; on select it attaches the
//! diff-and-dispatch listeners; deselect and unmount detach exactly what the
//! matching call attached.
//!
//! Listener closures only hold a `Weak` reference to the bridge, so the host
//! never keeps a destroyed bridge alive.

mod host;
mod ownership;

pub use host::{
    ChangeListener, ComponentHandle, ComponentId, EditorHost, Lifecycle, LifecycleListener,
    RequestRender, Subscription,
};

use core::{fmt, mem};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use canvas_dom::Node;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::context::EditorContext;
use crate::handler::{HandlerContext, TraitHandler, guard};
use crate::registry::{ComponentRegistration, TraitHandlers};
use crate::telemetry::{BridgeStats, SyncCounters, counters_json, maybe_emit};
use crate::value::{TraitValue, attribute_text};

use ownership::Ownership;

/// Traits that get a dedicated listener on select, so typing into them does
/// not wait for a full diff.
fn is_text_trait(name: &str) -> bool {
    name == "text" || name.ends_with("Text") || name.ends_with("-text")
}

struct BridgeInner {
    host: Arc<dyn EditorHost>,
    context: Arc<EditorContext>,
    owned: Mutex<HashMap<ComponentId, Ownership>>,
    lifecycle: Mutex<Option<Subscription>>,
    stats: Mutex<BridgeStats>,
    destroyed: AtomicBool,
}

/// Bridge between one host editor and its canvas.
#[derive(Clone)]
pub struct TraitBridge {
    inner: Arc<BridgeInner>,
}

impl fmt::Debug for TraitBridge {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TraitBridge")
            .field("components", &self.inner.lock_owned().len())
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

impl TraitBridge {
    /// Subscribe to `host`'s lifecycle signals.
    pub fn new(host: Arc<dyn EditorHost>, context: Arc<EditorContext>) -> Self {
        let inner = Arc::new(BridgeInner {
            host: Arc::clone(&host),
            context,
            owned: Mutex::new(HashMap::new()),
            lifecycle: Mutex::new(None),
            stats: Mutex::new(BridgeStats::default()),
            destroyed: AtomicBool::new(false),
        });
        let weak = Arc::downgrade(&inner);
        let subscription = host.on_lifecycle(Arc::new(move |event, component| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_lifecycle(event, component);
            }
        }));
        *inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);
        Self { inner }
    }

    pub fn context(&self) -> &EditorContext {
        &self.inner.context
    }

    /// Register a component with this bridge's registry.
    ///
    /// # Errors
    /// See [`ComponentRegistry::register`](crate::ComponentRegistry::register).
    pub fn register(&self, registration: ComponentRegistration) -> Result<()> {
        self.inner.context.registry().register(registration)
    }

    /// # Errors
    /// Stops at the first rejected registration.
    pub fn register_many<I>(&self, registrations: I) -> Result<()>
    where
        I: IntoIterator<Item = ComponentRegistration>,
    {
        self.inner.context.registry().register_many(registrations)
    }

    /// Listeners and observers currently attached for one component.
    pub fn active_listeners(&self, id: &ComponentId) -> usize {
        self.inner
            .lock_owned()
            .get(id)
            .map_or(0, Ownership::active)
    }

    /// Components with live bookkeeping.
    pub fn tracked_components(&self) -> usize {
        self.inner.lock_owned().len()
    }

    pub fn stats(&self) -> SyncCounters {
        SyncCounters {
            bridge: *self.inner.lock_stats(),
            retry: self.inner.context.retry().stats(),
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    /// Detach from the host and drop every listener, observer and retry task.
    /// Calling it again does nothing.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        let lifecycle = self
            .inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let owned: Vec<Ownership> = self
            .inner
            .lock_owned()
            .drain()
            .map(|(_, ownership)| ownership)
            .collect();
        let components = owned.len();
        drop(lifecycle);
        drop(owned);
        let cancelled = self.inner.context.retry().cancel_all();
        log::debug!(
            "bridge destroyed: {components} components released, {cancelled} retries cancelled"
        );
        maybe_emit(
            self.inner.context.config().telemetry_enabled,
            &counters_json(&self.stats()),
        );
    }
}

impl BridgeInner {
    fn lock_owned(&self) -> MutexGuard<'_, HashMap<ComponentId, Ownership>> {
        self.owned.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_stats(&self) -> MutexGuard<'_, BridgeStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle_lifecycle(self: &Arc<Self>, event: Lifecycle, component: &dyn ComponentHandle) {
        if self.destroyed.load(Ordering::Acquire) {
            return;
        }
        match event {
            Lifecycle::Mount => self.mount(component),
            Lifecycle::Select => self.select(component),
            Lifecycle::Deselect => self.deselect(&component.id()),
            Lifecycle::Unmount => self.unmount(component),
        }
    }

    fn handlers_for(&self, component: &dyn ComponentHandle) -> Option<(String, TraitHandlers)> {
        let tag = component.tag_name().to_ascii_lowercase();
        let Some(handlers) = self.context.registry().trait_handlers(&tag) else {
            log::debug!("<{tag}> {} is not registered", component.id());
            return None;
        };
        Some((tag, handlers))
    }

    /// Run one handler call through the guard and count it.
    fn call(
        &self,
        tag: &str,
        trait_name: &str,
        op: &str,
        call: impl FnOnce(&HandlerContext<'_>) -> Result<()>,
    ) -> bool {
        let cx = self.context.handler_context(trait_name);
        let succeeded = guard(tag, trait_name, op, || call(&cx));
        let mut stats = self.lock_stats();
        stats.handler_calls += 1;
        if !succeeded {
            stats.handler_failures += 1;
        }
        succeeded
    }

    fn mount(self: &Arc<Self>, component: &dyn ComponentHandle) {
        let Some((tag, handlers)) = self.handlers_for(component) else {
            return;
        };
        let id = component.id();
        let Some(element) = component.element() else {
            log::debug!("<{tag}> {id} mounted without a backing element");
            return;
        };
        self.lock_stats().mounts += 1;

        let attributes = component.attributes();
        for (name, handler) in &handlers {
            let Some(value) = attributes.get(name).filter(|value| !value.is_null()) else {
                continue;
            };
            self.call(&tag, name, "on_init", |cx| handler.on_init(cx, &element, value));
        }

        let applied: HashMap<String, Option<String>> = handlers
            .iter()
            .filter(|(_, handler)| handler.mirrors_internal())
            .map(|(name, _)| (name.clone(), element.attribute(name)))
            .collect();
        let observer = self.spawn_observer(&id, &tag, &element, &handlers);
        // A remount keeps the select-time listeners and replaces the observer.
        let replaced = {
            let mut owned = self.lock_owned();
            let ownership = owned.entry(id.clone()).or_default();
            ownership.element = Some(element.key());
            ownership.applied = applied;
            mem::replace(&mut ownership.observer, observer)
        };
        if let Some(replaced) = replaced {
            replaced.abort();
        }
        log::debug!("<{tag}> {id} mounted on {}", element.key());
    }

    /// Watch the host element's attributes and re-run internal-mirroring
    /// traits when one changes out of band. Records that only echo a
    /// bridge-driven write are skipped.
    fn spawn_observer(
        self: &Arc<Self>,
        id: &ComponentId,
        tag: &str,
        element: &Node,
        handlers: &TraitHandlers,
    ) -> Option<AbortHandle> {
        let watched: TraitHandlers = handlers
            .iter()
            .filter(|(_, handler)| handler.mirrors_internal())
            .map(|(name, handler)| (name.clone(), Arc::clone(handler)))
            .collect();
        if watched.is_empty() {
            return None;
        }
        let Ok(runtime) = Handle::try_current() else {
            log::debug!("<{tag}> no async runtime; attribute observer not started");
            return None;
        };
        let mut observer = element
            .document()
            .observe_attributes(element)
            .with_attribute_filter(watched.keys());
        let weak = Arc::downgrade(self);
        let id = id.clone();
        let tag = tag.to_owned();
        let element = element.clone();
        let task = runtime.spawn(async move {
            while let Some(record) = observer.next().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let Some(attribute) = record.attribute_name() else {
                    continue;
                };
                let Some((name, handler)) = watched
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
                else {
                    continue;
                };
                let current = element.attribute(name);
                if !inner.claim_out_of_band(&id, name, current.as_deref()) {
                    log::trace!("<{tag}> observer skipped the bridge's own `{name}` write");
                    continue;
                }
                log::trace!("<{tag}> observer re-syncing `{name}`");
                let value = current.map(TraitValue::String);
                inner.call(&tag, name, "on_change", |cx| {
                    handler.on_change(cx, &element, value.as_ref(), None)
                });
                inner.note_applied(&id, name, element.attribute(name));
            }
        });
        Some(task.abort_handle())
    }

    fn select(self: &Arc<Self>, component: &dyn ComponentHandle) {
        let Some((tag, handlers)) = self.handlers_for(component) else {
            return;
        };
        let id = component.id();
        let mut listeners = Vec::new();
        let mut narrow = Vec::new();

        let weak = Arc::downgrade(self);
        listeners.push(self.host.on_attributes_changed(
            &id,
            Arc::new(move |component| {
                if let Some(inner) = weak.upgrade() {
                    inner.dispatch(component);
                }
            }),
        ));

        if self.context.config().fast_text_listeners {
            for name in handlers.keys().filter(|name| is_text_trait(name)) {
                let weak = Arc::downgrade(self);
                let trait_name = name.clone();
                listeners.push(self.host.on_attribute_changed(
                    &id,
                    name,
                    Arc::new(move |component| {
                        if let Some(inner) = weak.upgrade() {
                            inner.dispatch_one(component, &trait_name);
                        }
                    }),
                ));
                narrow.push(name.clone());
            }
        }

        let count = listeners.len();
        let replaced = {
            let mut owned = self.lock_owned();
            let ownership = owned.entry(id.clone()).or_default();
            ownership.narrow = narrow;
            mem::replace(&mut ownership.listeners, listeners)
        };
        drop(replaced);
        log::debug!("<{tag}> {id} selected with {count} listeners");
    }

    fn deselect(&self, id: &ComponentId) {
        let released = {
            let mut owned = self.lock_owned();
            let Some(ownership) = owned.get_mut(id) else {
                return;
            };
            let listeners = mem::take(&mut ownership.listeners);
            ownership.narrow.clear();
            let idle = if ownership.is_idle() {
                owned.remove(id)
            } else {
                None
            };
            (listeners, idle)
        };
        log::debug!("{id} deselected, {} listeners released", released.0.len());
        drop(released);
    }

    fn unmount(&self, component: &dyn ComponentHandle) {
        let id = component.id();
        let released = self.lock_owned().remove(&id);
        let element = released
            .as_ref()
            .and_then(|ownership| ownership.element)
            .or_else(|| component.element().map(|element| element.key()));
        drop(released);
        let cancelled = element.map_or(0, |key| self.context.retry().cancel_element(key));
        log::debug!("{id} unmounted, {cancelled} retries cancelled");
    }

    /// Diff current against previous attributes and run `on_change` for every
    /// trait whose value differs. Traits with a live narrow listener were
    /// already handled there and only count toward the render request.
    /// Returns how many traits changed.
    fn dispatch(&self, component: &dyn ComponentHandle) -> usize {
        let Some((tag, handlers)) = self.handlers_for(component) else {
            return 0;
        };
        if component.element().is_none() {
            return 0;
        }
        let id = component.id();
        let current = component.attributes();
        let previous = component.previous_attributes();
        let narrow = self
            .lock_owned()
            .get(&id)
            .map(|ownership| ownership.narrow.clone())
            .unwrap_or_default();
        self.lock_stats().dispatches += 1;

        let mut changed = 0;
        for (name, handler) in &handlers {
            let value = current.get(name);
            let old = previous.get(name);
            if value == old {
                continue;
            }
            changed += 1;
            if narrow.contains(name) {
                continue;
            }
            log::trace!("<{tag}> dispatching `{name}`");
            self.apply_change(component, &tag, name, handler.as_ref(), value, old);
        }

        if changed > 0
            && let Some(render) = component.render_hook()
        {
            render.request_render();
            self.lock_stats().render_requests += 1;
        }
        changed
    }

    /// Narrow path for a single text-like trait. Rendering is left to the
    /// aggregate listener, which sees the same change.
    fn dispatch_one(&self, component: &dyn ComponentHandle, trait_name: &str) -> bool {
        let Some((tag, handlers)) = self.handlers_for(component) else {
            return false;
        };
        let Some(handler) = handlers.get(trait_name) else {
            return false;
        };
        let current = component.attributes();
        let previous = component.previous_attributes();
        let value = current.get(trait_name);
        let old = previous.get(trait_name);
        if value == old {
            return false;
        }
        self.apply_change(component, &tag, trait_name, handler.as_ref(), value, old)
    }

    /// Run `on_change` for a host-driven change. For observed traits, the
    /// attribute text the call leaves behind is remembered so the observer
    /// can tell the resulting record from an outside write.
    fn apply_change(
        &self,
        component: &dyn ComponentHandle,
        tag: &str,
        trait_name: &str,
        handler: &dyn TraitHandler,
        value: Option<&TraitValue>,
        old: Option<&TraitValue>,
    ) -> bool {
        let Some(element) = component.element() else {
            return false;
        };
        let id = component.id();
        let observed = handler.mirrors_internal();
        if observed {
            self.note_applied(&id, trait_name, attribute_text(value));
        }
        let succeeded = self.call(tag, trait_name, "on_change", |cx| {
            handler.on_change(cx, &element, value, old)
        });
        if observed {
            self.note_applied(&id, trait_name, element.attribute(trait_name));
        }
        succeeded
    }

    fn note_applied(&self, id: &ComponentId, trait_name: &str, text: Option<String>) {
        if let Some(ownership) = self.lock_owned().get_mut(id) {
            ownership.applied.insert(trait_name.to_owned(), text);
        }
    }

    /// Returns `false` when `current` is what the bridge itself last left on
    /// the host, otherwise remembers it and returns `true`.
    fn claim_out_of_band(&self, id: &ComponentId, trait_name: &str, current: Option<&str>) -> bool {
        let mut owned = self.lock_owned();
        let Some(ownership) = owned.get_mut(id) else {
            return false;
        };
        if ownership
            .applied
            .get(trait_name)
            .is_some_and(|applied| applied.as_deref() == current)
        {
            return false;
        }
        ownership
            .applied
            .insert(trait_name.to_owned(), current.map(str::to_owned));
        true
    }
}
