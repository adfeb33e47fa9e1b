use anyhow::Result;
use canvas_dom::Node;

use super::write_attribute;
use crate::handler::{HandlerContext, TraitHandler};
use crate::value::{TraitValue, coerce_bool};

/// Options for [`BooleanTrait`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BooleanTraitConfig {
    /// Selector of an internal control that must carry the flag too
    /// (for example the native `button` inside a custom button).
    pub sync_to_internal: Option<String>,
}

impl BooleanTraitConfig {
    #[must_use]
    pub fn sync_to_internal(mut self, selector: impl Into<String>) -> Self {
        self.sync_to_internal = Some(selector.into());
        self
    }
}

/// Mirrors a trait onto an HTML boolean attribute: present and empty when
/// true, absent when false.
#[derive(Clone, Debug)]
pub struct BooleanTrait {
    name: String,
    config: BooleanTraitConfig,
}

impl BooleanTrait {
    pub fn new(name: impl Into<String>, config: BooleanTraitConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    fn apply(&self, element: &Node, enabled: bool) {
        let text = enabled.then_some("");
        write_attribute(element, &self.name, text);
        let Some(selector) = &self.config.sync_to_internal else {
            return;
        };
        let Some(internal) = element.query_selector(selector) else {
            log::trace!("`{selector}` not rendered yet for boolean trait `{}`", self.name);
            return;
        };
        write_attribute(&internal, &self.name, text);
        let flag = TraitValue::Bool(enabled);
        if internal.property(&self.name).as_ref() != Some(&flag) {
            internal.set_property(&self.name, flag);
        }
    }
}

impl TraitHandler for BooleanTrait {
    fn on_change(
        &self,
        _cx: &HandlerContext<'_>,
        element: &Node,
        value: Option<&TraitValue>,
        _previous: Option<&TraitValue>,
    ) -> Result<()> {
        self.apply(element, coerce_bool(value));
        Ok(())
    }

    fn value(&self, element: &Node) -> Option<TraitValue> {
        Some(TraitValue::Bool(element.has_attribute(&self.name)))
    }

    /// Absence at mount is already the false state, so init only ever enables.
    fn on_init(&self, _cx: &HandlerContext<'_>, element: &Node, value: &TraitValue) -> Result<()> {
        if coerce_bool(Some(value)) {
            self.apply(element, true);
        }
        Ok(())
    }

    fn mirrors_internal(&self) -> bool {
        self.config.sync_to_internal.is_some()
    }
}
