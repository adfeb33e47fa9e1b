use core::time::Duration;

use anyhow::Result;
use canvas_dom::Node;

use super::write_attribute;
use crate::handler::{HandlerContext, TraitHandler};
use crate::retry::{InternalWrite, RetryPolicy};
use crate::value::{TraitValue, attribute_text, from_attribute};

/// Options for [`InternalSyncTrait`].
#[derive(Clone, Debug, PartialEq)]
pub struct InternalSyncConfig {
    pub internal_selector: String,
    pub sync_property: String,
    pub default: Option<TraitValue>,
    /// Overrides the editor's polling delay for this trait.
    pub delay: Option<Duration>,
    /// Overrides the editor's attempt budget for this trait.
    pub max_attempts: Option<u32>,
}

impl InternalSyncConfig {
    pub fn new(internal_selector: impl Into<String>, sync_property: impl Into<String>) -> Self {
        Self {
            internal_selector: internal_selector.into(),
            sync_property: sync_property.into(),
            default: None,
            delay: None,
            max_attempts: None,
        }
    }

    #[must_use]
    pub fn default_value(mut self, default: impl Into<TraitValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub const fn retry(mut self, delay: Duration, max_attempts: u32) -> Self {
        self.delay = Some(delay);
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// Keeps an attribute and a property of an internal element in step.
///
/// The attribute is written first and stays the durable source of truth;
/// the internal write goes through the retry scheduler because the custom
/// element may not have rendered the target yet.
#[derive(Clone, Debug)]
pub struct InternalSyncTrait {
    name: String,
    config: InternalSyncConfig,
}

impl InternalSyncTrait {
    pub fn new(name: impl Into<String>, config: InternalSyncConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    fn policy(&self, fallback: RetryPolicy) -> RetryPolicy {
        RetryPolicy::new(
            self.config.delay.unwrap_or(fallback.delay),
            self.config.max_attempts.unwrap_or(fallback.max_attempts),
        )
    }
}

impl TraitHandler for InternalSyncTrait {
    fn on_change(
        &self,
        cx: &HandlerContext<'_>,
        element: &Node,
        value: Option<&TraitValue>,
        _previous: Option<&TraitValue>,
    ) -> Result<()> {
        write_attribute(element, &self.name, attribute_text(value).as_deref());
        let write = InternalWrite::new(
            self.config.internal_selector.as_str(),
            self.config.sync_property.as_str(),
            value.cloned().unwrap_or(TraitValue::Null),
        );
        let state = cx
            .retry()
            .request(element, &self.name, write, self.policy(cx.retry_policy()));
        log::trace!("trait `{}` on {}: {state:?}", self.name, element.key());
        Ok(())
    }

    fn value(&self, element: &Node) -> Option<TraitValue> {
        from_attribute(element.attribute(&self.name)).or_else(|| self.config.default.clone())
    }

    fn mirrors_internal(&self) -> bool {
        true
    }
}
