//! Capability surface the bridge consumes from the host editor.
//!
//! The host owns the component tree and its event bus. It calls listeners
//! synchronously and must not hold its own locks while doing so: a listener
//! may subscribe or dispose other listeners before it returns.

use core::fmt;
use std::sync::Arc;

use canvas_dom::Node;

use crate::value::AttributeMap;

/// Host-assigned identifier of a component instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(String);

impl ComponentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComponentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Per-component lifecycle signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// The component's element was inserted into the canvas.
    Mount,
    /// The component became the panel's subject.
    Select,
    Deselect,
    /// The component's element left the canvas for good.
    Unmount,
}

pub type LifecycleListener = Arc<dyn Fn(Lifecycle, &dyn ComponentHandle) + Send + Sync>;
pub type ChangeListener = Arc<dyn Fn(&dyn ComponentHandle) + Send + Sync>;

/// Optional capability: ask the host to re-render a component's view.
pub trait RequestRender: Send + Sync {
    fn request_render(&self);
}

/// One component of the host model.
pub trait ComponentHandle: Send + Sync {
    fn id(&self) -> ComponentId;

    fn tag_name(&self) -> String;

    /// Current attribute map.
    fn attributes(&self) -> AttributeMap;

    /// Attribute map as it was before the change being reported.
    fn previous_attributes(&self) -> AttributeMap;

    /// Backing canvas element, once rendered.
    fn element(&self) -> Option<Node>;

    fn render_hook(&self) -> Option<Arc<dyn RequestRender>> {
        None
    }
}

/// Event bus of the host editor.
pub trait EditorHost: Send + Sync {
    /// Receive lifecycle signals for every component.
    fn on_lifecycle(&self, listener: LifecycleListener) -> Subscription;

    /// Receive every attribute-map change of one component.
    fn on_attributes_changed(&self, id: &ComponentId, listener: ChangeListener) -> Subscription;

    /// Receive changes of a single attribute of one component.
    fn on_attribute_changed(
        &self,
        id: &ComponentId,
        name: &str,
        listener: ChangeListener,
    ) -> Subscription;
}

/// Handle to a registered listener. Disposing (or dropping) it detaches the
/// listener exactly once.
#[must_use = "dropping a subscription detaches its listener"]
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(dispose: impl FnOnce() + Send + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// A subscription with nothing to detach.
    pub const fn noop() -> Self {
        Self { dispose: None }
    }

    pub fn dispose(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Subscription")
            .field("active", &self.dispose.is_some())
            .finish()
    }
}
