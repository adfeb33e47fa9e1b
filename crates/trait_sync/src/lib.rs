//! Trait registry and synchronization engine for a visual page editor.
//!
//! Components are registered per tag with a set of traits, each a
//! [`TraitDefinition`] for the properties panel plus a [`TraitHandler`] that
//! knows how to push a value into the canvas DOM. A [`TraitBridge`] follows
//! the host editor's lifecycle and keeps the three copies of a trait (the
//! host's attribute map, the element's attribute and any internal element
//! rendered by the custom element) in step.
//!
//! Writes into internal elements go through [`RetrySync`], which polls for
//! targets that have not rendered yet under a bounded, cancellable budget.
#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

pub mod bridge;
pub mod components;
mod config;
mod context;
mod definition;
pub mod factories;
mod handler;
mod registry;
pub mod retry;
pub mod telemetry;
mod value;

pub use bridge::{
    ChangeListener, ComponentHandle, ComponentId, EditorHost, Lifecycle, LifecycleListener,
    RequestRender, Subscription, TraitBridge,
};
pub use config::SyncConfig;
pub use context::EditorContext;
pub use definition::{TraitDefinition, TraitOption, TraitType, VisibilityPredicate};
pub use handler::{FnTrait, HandlerContext, TraitHandler};
pub use registry::{ComponentRegistration, ComponentRegistry, TraitEntry, TraitHandlers};
pub use retry::{InternalWrite, RetryPolicy, RetryState, RetrySync};
pub use value::{AttributeMap, TraitValue, attribute_text, coerce_bool};
