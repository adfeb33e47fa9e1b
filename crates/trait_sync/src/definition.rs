//! Panel-facing trait schema.

use core::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::value::{AttributeMap, TraitValue};

/// Editor control used for a trait in the properties panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraitType {
    Text,
    Textarea,
    Select,
    Number,
    Checkbox,
}

/// One entry of a select trait.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TraitOption {
    pub id: String,
    pub label: String,
}

impl TraitOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Decides from the component's current attributes whether the panel shows a trait.
pub type VisibilityPredicate = Arc<dyn Fn(&AttributeMap) -> bool + Send + Sync>;

/// Schema descriptor for one trait. Pure data apart from the optional
/// visibility predicate, which is never serialized.
#[derive(Clone, Serialize)]
pub struct TraitDefinition {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: TraitType,
    pub default: TraitValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<TraitOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip)]
    pub visible_when: Option<VisibilityPredicate>,
}

impl fmt::Debug for TraitDefinition {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TraitDefinition")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("placeholder", &self.placeholder)
            .field("options", &self.options)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("visible_when", &self.visible_when.as_ref().map(|_| "<predicate>"))
            .finish()
    }
}

impl TraitDefinition {
    /// A definition whose label defaults to its name and whose default is empty text.
    pub fn new(name: impl Into<String>, kind: TraitType) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            kind,
            default: TraitValue::String(String::new()),
            placeholder: None,
            options: Vec::new(),
            min: None,
            max: None,
            visible_when: None,
        }
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn default_value(mut self, default: impl Into<TraitValue>) -> Self {
        self.default = default.into();
        self
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    #[must_use]
    pub fn options<I>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = TraitOption>,
    {
        self.options = options.into_iter().collect();
        self
    }

    #[must_use]
    pub const fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    #[must_use]
    pub fn visible_when(
        mut self,
        predicate: impl Fn(&AttributeMap) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.visible_when = Some(Arc::new(predicate));
        self
    }

    /// Evaluate the visibility predicate; traits without one are always visible.
    pub fn is_visible(&self, attributes: &AttributeMap) -> bool {
        self.visible_when
            .as_ref()
            .is_none_or(|predicate| predicate(attributes))
    }

    /// Copy with every function-valued field removed.
    #[must_use]
    pub fn to_data(&self) -> Self {
        Self {
            visible_when: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_without_predicate() {
        let definition = TraitDefinition::new("variant", TraitType::Select)
            .label("Variant")
            .default_value("default")
            .options([
                TraitOption::new("default", "Default"),
                TraitOption::new("secondary", "Secondary"),
            ])
            .visible_when(|_| false);
        let encoded = serde_json::to_value(&definition).unwrap();
        assert_eq!(
            encoded,
            json!({
                "name": "variant",
                "label": "Variant",
                "type": "select",
                "default": "default",
                "options": [
                    {"id": "default", "label": "Default"},
                    {"id": "secondary", "label": "Secondary"},
                ],
            })
        );
        assert!(!definition.is_visible(&AttributeMap::new()));
        assert!(definition.to_data().is_visible(&AttributeMap::new()));
    }
}
