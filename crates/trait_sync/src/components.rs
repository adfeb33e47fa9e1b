//! Component-specific handlers whose DOM work does not fit the generic factories.

use anyhow::{Context as _, Result};
use canvas_dom::Node;

use crate::factories::write_attribute;
use crate::handler::{HandlerContext, TraitHandler};
use crate::retry::InternalWrite;
use crate::value::{TraitValue, attribute_text};

/// Property holding the derived option list.
pub const OPTIONS_PROPERTY: &str = "options";
/// Marker attribute on nodes created by [`HelperTextTrait`].
pub const GENERATED_ATTRIBUTE: &str = "data-generated";

/// One of several indexed traits (`option1`, `option2`, ...) that together
/// make up a list. Each edit writes its own attribute and then rebuilds the
/// element's `options` property from every indexed sibling attribute.
#[derive(Clone, Debug)]
pub struct OptionListTrait {
    prefix: String,
    name: String,
    internal_selector: Option<String>,
}

impl OptionListTrait {
    pub fn new(prefix: &str, index: u32) -> Self {
        let prefix = prefix.to_ascii_lowercase();
        Self {
            name: format!("{prefix}{index}"),
            prefix,
            internal_selector: None,
        }
    }

    /// Also push the rebuilt list into an internal element (for example a native `select`).
    #[must_use]
    pub fn with_internal(mut self, selector: impl Into<String>) -> Self {
        self.internal_selector = Some(selector.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Collect the non-empty `<prefix><n>` attributes of `element` in index order
/// and store them as the element's `options` property.
pub fn rebuild_option_list(element: &Node, prefix: &str) -> Vec<String> {
    let mut indexed: Vec<(u32, String)> = element
        .attributes()
        .into_iter()
        .filter_map(|(name, value)| {
            let index = name.strip_prefix(prefix)?.parse::<u32>().ok()?;
            (!value.is_empty()).then_some((index, value))
        })
        .collect();
    indexed.sort_by_key(|(index, _)| *index);
    let options: Vec<String> = indexed.into_iter().map(|(_, value)| value).collect();
    let list = TraitValue::from(options.clone());
    if element.property(OPTIONS_PROPERTY).as_ref() != Some(&list) {
        element.set_property(OPTIONS_PROPERTY, list);
    }
    options
}

impl TraitHandler for OptionListTrait {
    fn on_change(
        &self,
        cx: &HandlerContext<'_>,
        element: &Node,
        value: Option<&TraitValue>,
        _previous: Option<&TraitValue>,
    ) -> Result<()> {
        let text = attribute_text(value).filter(|text| !text.is_empty());
        write_attribute(element, &self.name, text.as_deref());
        let options = rebuild_option_list(element, &self.prefix);
        if let Some(selector) = &self.internal_selector {
            // One task per list, so edits to different indices never race.
            let write = InternalWrite::new(selector.as_str(), OPTIONS_PROPERTY, options);
            cx.retry()
                .request(element, &self.prefix, write, cx.retry_policy());
        }
        Ok(())
    }

    fn value(&self, element: &Node) -> Option<TraitValue> {
        element.attribute(&self.name).map(TraitValue::String)
    }

    fn mirrors_internal(&self) -> bool {
        self.internal_selector.is_some()
    }
}

/// Helper text rendered as a generated child of the host element. The child
/// exists exactly while the text is non-empty.
#[derive(Clone, Debug)]
pub struct HelperTextTrait {
    name: String,
    tag: String,
}

impl HelperTextTrait {
    /// `tag` is the element created for the text (for example `small`).
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
        }
    }
}

/// Create, update or remove the direct child of `element` marked with `marker`.
///
/// # Errors
/// Fails if the generated node cannot be appended to `element`.
pub fn sync_generated_node(
    element: &Node,
    marker: &str,
    tag: &str,
    text: Option<&str>,
) -> Result<Option<Node>> {
    let existing = element
        .children()
        .into_iter()
        .find(|child| child.attribute(GENERATED_ATTRIBUTE).as_deref() == Some(marker));
    let Some(text) = text.filter(|text| !text.is_empty()) else {
        if let Some(node) = existing {
            node.remove();
        }
        return Ok(None);
    };
    let node = match existing {
        Some(node) => node,
        None => {
            let node = element.document().create_element(tag);
            node.set_attribute(GENERATED_ATTRIBUTE, marker);
            element
                .append_child(&node)
                .with_context(|| format!("appending generated `{marker}` node"))?;
            node
        }
    };
    if node.text_content() != text {
        node.set_text_content(text);
    }
    Ok(Some(node))
}

impl TraitHandler for HelperTextTrait {
    fn on_change(
        &self,
        _cx: &HandlerContext<'_>,
        element: &Node,
        value: Option<&TraitValue>,
        _previous: Option<&TraitValue>,
    ) -> Result<()> {
        let text = attribute_text(value).filter(|text| !text.is_empty());
        write_attribute(element, &self.name, text.as_deref());
        sync_generated_node(element, &self.name, &self.tag, text.as_deref())?;
        Ok(())
    }

    fn value(&self, element: &Node) -> Option<TraitValue> {
        element.attribute(&self.name).map(TraitValue::String)
    }
}
