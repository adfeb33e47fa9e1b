use anyhow::Result;
use canvas_dom::Node;

use super::write_attribute;
use crate::handler::{HandlerContext, TraitHandler};
use crate::value::{TraitValue, attribute_text, from_attribute};

/// Options for [`AttributeTrait`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeTraitConfig {
    /// Reported by `value` when the attribute is absent.
    pub default: Option<TraitValue>,
    /// Values that mean "implicit default" and are kept out of the markup.
    pub remove_defaults: Vec<TraitValue>,
}

impl AttributeTraitConfig {
    #[must_use]
    pub fn default_value(mut self, default: impl Into<TraitValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn remove_defaults<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<TraitValue>,
    {
        self.remove_defaults = values.into_iter().map(Into::into).collect();
        self
    }
}

/// Mirrors a trait onto the same-named attribute of the host element.
#[derive(Clone, Debug)]
pub struct AttributeTrait {
    name: String,
    config: AttributeTraitConfig,
}

impl AttributeTrait {
    pub fn new(name: impl Into<String>, config: AttributeTraitConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    fn is_implicit_default(&self, text: &str) -> bool {
        self.config
            .remove_defaults
            .iter()
            .any(|candidate| attribute_text(Some(candidate)).as_deref() == Some(text))
    }
}

impl TraitHandler for AttributeTrait {
    fn on_change(
        &self,
        _cx: &HandlerContext<'_>,
        element: &Node,
        value: Option<&TraitValue>,
        _previous: Option<&TraitValue>,
    ) -> Result<()> {
        let text = attribute_text(value).filter(|text| !self.is_implicit_default(text));
        write_attribute(element, &self.name, text.as_deref());
        Ok(())
    }

    fn value(&self, element: &Node) -> Option<TraitValue> {
        from_attribute(element.attribute(&self.name)).or_else(|| self.config.default.clone())
    }
}
