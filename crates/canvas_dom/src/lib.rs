//! Light-DOM model for the editor canvas.
//!
//! A [`Document`] owns an arena of nodes. [`Node`] handles are cheap to clone
//! and address their node through a process-unique [`NodeKey`], so a handle
//! stays valid (and comparable) after the node is detached. Attribute and
//! child-list changes are broadcast as [`MutationRecord`] values; a
//! [`MutationObserver`] receives them asynchronously, filtered to one target.
//!
//! Only the light DOM is modelled: every internal node of a custom element is
//! an ordinary descendant reachable through [`Node::query_selector`].
#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

mod document;
mod keys;
mod mutation;
mod node;
mod printing;
pub mod selector;

pub use document::Document;
pub use keys::{DocumentId, NodeKey};
pub use mutation::{MutationKind, MutationObserver, MutationRecord};
pub use node::{Node, NodeKind};

/// Property name that reads and replaces a node's text children.
pub const TEXT_CONTENT: &str = "textContent";
