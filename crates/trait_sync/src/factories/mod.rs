//! Reusable trait handlers for the recurring mirroring patterns.
//!
//! - [`AttributeTrait`]: a plain attribute, removed when it holds an implicit default
//! - [`BooleanTrait`]: an HTML boolean attribute, optionally mirrored onto an internal control
//! - [`InternalSyncTrait`]: an attribute whose value is also pushed into an
//!   internal element that may not have rendered yet
//!
//! All of them skip DOM writes when the DOM already holds the target state.

mod attribute;
mod boolean;
mod internal;

pub use attribute::{AttributeTrait, AttributeTraitConfig};
pub use boolean::{BooleanTrait, BooleanTraitConfig};
pub use internal::{InternalSyncConfig, InternalSyncTrait};

use canvas_dom::Node;

/// Converge one attribute on `text` (`None` removes it).
/// Returns whether the DOM was written.
pub(crate) fn write_attribute(element: &Node, name: &str, text: Option<&str>) -> bool {
    match text {
        Some(text) if element.attribute(name).as_deref() != Some(text) => {
            element.set_attribute(name, text);
            true
        }
        Some(_) => false,
        None => element.remove_attribute(name),
    }
}
