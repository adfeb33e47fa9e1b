use std::collections::HashMap;

use canvas_dom::NodeKey;
use tokio::task::AbortHandle;

use super::host::Subscription;

/// Everything the bridge attached on behalf of one component.
///
/// Dropping the record detaches all of it: the subscriptions dispose
/// themselves and the observer task is aborted.
#[derive(Debug, Default)]
pub(crate) struct Ownership {
    /// Backing element seen at mount.
    pub element: Option<NodeKey>,
    /// Select-time listeners.
    pub listeners: Vec<Subscription>,
    /// Traits that currently have their own narrow listener.
    pub narrow: Vec<String>,
    /// Mount-time attribute observer task.
    pub observer: Option<AbortHandle>,
    /// Host attribute text last left behind by a bridge-driven call, per
    /// observed trait. The observer ignores records that match it.
    pub applied: HashMap<String, Option<String>>,
}

impl Ownership {
    /// Listeners plus the observer.
    pub fn active(&self) -> usize {
        self.listeners.len() + usize::from(self.observer.is_some())
    }

    /// Nothing left to tear down.
    pub fn is_idle(&self) -> bool {
        self.element.is_none() && self.listeners.is_empty() && self.observer.is_none()
    }
}

impl Drop for Ownership {
    fn drop(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.abort();
        }
    }
}
