//! Trait behaviour: the handler interface and the guard every call goes through.

use core::any::Any;
use core::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use anyhow::Result;
use canvas_dom::Node;

use crate::retry::{RetryPolicy, RetrySync};
use crate::value::TraitValue;

/// Collaborators a handler may use while it runs.
///
/// Built by [`EditorContext::handler_context`](crate::EditorContext::handler_context)
/// for one trait of one call.
#[derive(Clone, Copy)]
pub struct HandlerContext<'ctx> {
    trait_name: &'ctx str,
    retry: &'ctx RetrySync,
    policy: RetryPolicy,
}

impl fmt::Debug for HandlerContext<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HandlerContext")
            .field("trait_name", &self.trait_name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<'ctx> HandlerContext<'ctx> {
    pub(crate) const fn new(
        trait_name: &'ctx str,
        retry: &'ctx RetrySync,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            trait_name,
            retry,
            policy,
        }
    }

    /// Name of the trait being handled.
    #[inline]
    pub const fn trait_name(&self) -> &'ctx str {
        self.trait_name
    }

    /// Scheduler for writes into internal elements.
    #[inline]
    pub const fn retry(&self) -> &'ctx RetrySync {
        self.retry
    }

    /// Retry policy configured for the editor instance.
    #[inline]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }
}

/// Behaviour bound to one trait name.
///
/// `on_change` must be idempotent and must not write an attribute that
/// already holds the target value, otherwise an attribute observer would see
/// an echo of every write.
pub trait TraitHandler: Send + Sync {
    /// Bring the DOM in line with `value`. `previous` is the value before the change.
    ///
    /// # Errors
    /// Any error is logged by the caller and never propagated to the host.
    fn on_change(
        &self,
        cx: &HandlerContext<'_>,
        element: &Node,
        value: Option<&TraitValue>,
        previous: Option<&TraitValue>,
    ) -> Result<()>;

    /// Best-effort read of the current value from the DOM.
    fn value(&self, element: &Node) -> Option<TraitValue> {
        let _ = element;
        None
    }

    /// Called once at mount with the component's explicit value.
    /// Handlers without special init logic apply the value like a change.
    ///
    /// # Errors
    /// Same policy as [`TraitHandler::on_change`].
    fn on_init(&self, cx: &HandlerContext<'_>, element: &Node, value: &TraitValue) -> Result<()> {
        self.on_change(cx, element, Some(value), None)
    }

    /// Whether the handler writes into an internal element, which makes it
    /// subject to re-sync when the host attribute changes out of band.
    fn mirrors_internal(&self) -> bool {
        false
    }
}

/// Handler built from a closure, for one-off component behaviour.
pub struct FnTrait<F> {
    on_change: F,
}

impl<F> FnTrait<F>
where
    F: Fn(&Node, Option<&TraitValue>, Option<&TraitValue>) -> Result<()> + Send + Sync,
{
    pub const fn new(on_change: F) -> Self {
        Self { on_change }
    }
}

impl<F> TraitHandler for FnTrait<F>
where
    F: Fn(&Node, Option<&TraitValue>, Option<&TraitValue>) -> Result<()> + Send + Sync,
{
    fn on_change(
        &self,
        _cx: &HandlerContext<'_>,
        element: &Node,
        value: Option<&TraitValue>,
        previous: Option<&TraitValue>,
    ) -> Result<()> {
        (self.on_change)(element, value, previous)
    }
}

/// Extract a human-readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_owned();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_owned()
}

/// Run one handler call, containing both errors and panics.
///
/// Returns `true` when the handler completed successfully. Failures are
/// logged and end here.
pub(crate) fn guard(
    tag: &str,
    trait_name: &str,
    op: &str,
    call: impl FnOnce() -> Result<()>,
) -> bool {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            log::error!("<{tag}> trait `{trait_name}` {op} failed: {err:#}");
            false
        }
        Err(payload) => {
            log::error!(
                "<{tag}> trait `{trait_name}` {op} panicked: {}",
                panic_message(payload.as_ref())
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    #[test]
    fn guard_contains_errors_and_panics() {
        assert!(guard("x-el", "ok", "on_change", || Ok(())));
        assert!(!guard("x-el", "err", "on_change", || bail!("broken")));
        assert!(!guard("x-el", "boom", "on_change", || -> Result<()> {
            panic!("handler exploded")
        }));
    }
}
