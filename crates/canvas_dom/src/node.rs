use core::{fmt, mem};

use anyhow::{Result, anyhow, bail};
use indextree::{Node as ArenaNode, NodeId};
use serde_json::Value;

use crate::TEXT_CONTENT;
use crate::document::{Document, DomTree};
use crate::keys::NodeKey;
use crate::mutation::MutationKind;
use crate::printing;
use crate::selector::{self, SelectorList};

/// Kind of a node in the document arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element { tag: String },
    Text { text: String },
}

/// Handle to a node of a [`Document`].
///
/// Every accessor locks the document briefly; no lock outlives a call, so
/// handles may be used freely from callbacks. Operations on a node whose key
/// is unknown to the document are no-ops.
#[derive(Clone)]
pub struct Node {
    document: Document,
    key: NodeKey,
}

impl fmt::Debug for Node {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Node")
            .field("key", &self.key)
            .field("tag", &self.tag_name())
            .finish()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Node {}

impl Node {
    pub(crate) const fn new(document: Document, key: NodeKey) -> Self {
        Self { document, key }
    }

    /// Stable identity of this node.
    #[inline]
    pub const fn key(&self) -> NodeKey {
        self.key
    }

    /// Owning document.
    #[inline]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    fn read<T>(&self, read: impl FnOnce(&DomTree, NodeId) -> Option<T>) -> Option<T> {
        let tree = self.document.lock();
        let id = tree.id_of(self.key)?;
        read(&tree, id)
    }

    /// Lowercase tag name for elements, `None` for text and document nodes.
    pub fn tag_name(&self) -> Option<String> {
        self.read(|tree, id| tree.tag(id).map(str::to_owned))
    }

    /// True for element nodes.
    pub fn is_element(&self) -> bool {
        self.read(|tree, id| tree.tag(id).map(|_| ())).is_some()
    }

    /// Attribute value; the name is matched ASCII case-insensitively.
    pub fn attribute(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.read(|tree, id| tree.attr(id, &name).map(str::to_owned))
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// All attributes in insertion order.
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.read(|tree, id| Some(tree.data(id)?.attrs.to_vec()))
            .unwrap_or_default()
    }

    /// Set an attribute. Like the platform DOM, a record is broadcast even
    /// when the value is unchanged; callers that must not echo compare first.
    pub fn set_attribute(&self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        let mut tree = self.document.lock();
        let Some(id) = tree.id_of(self.key) else {
            return;
        };
        if tree.tag(id).is_none() {
            return;
        }
        let Some(data) = tree.data_mut(id) else {
            return;
        };
        let old_value = if let Some(slot) = data
            .attrs
            .iter_mut()
            .find(|(attr_name, _)| *attr_name == name)
        {
            Some(mem::replace(&mut slot.1, value.to_owned()))
        } else {
            data.attrs.push((name.clone(), value.to_owned()));
            None
        };
        tree.record(self.key, MutationKind::Attribute { name, old_value });
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attribute(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        let mut tree = self.document.lock();
        let Some(id) = tree.id_of(self.key) else {
            return false;
        };
        let Some(data) = tree.data_mut(id) else {
            return false;
        };
        let Some(index) = data
            .attrs
            .iter()
            .position(|(attr_name, _)| *attr_name == name)
        else {
            return false;
        };
        let (_, old_value) = data.attrs.remove(index);
        tree.record(
            self.key,
            MutationKind::Attribute {
                name,
                old_value: Some(old_value),
            },
        );
        true
    }

    /// Object property. `textContent` reads the node's text.
    pub fn property(&self, name: &str) -> Option<Value> {
        if name == TEXT_CONTENT {
            return Some(Value::String(self.text_content()));
        }
        self.read(|tree, id| tree.data(id)?.props.get(name).cloned())
    }

    /// Set an object property. Properties are not observable; `textContent`
    /// replaces the node's children with a single text node.
    pub fn set_property(&self, name: &str, value: Value) {
        if name == TEXT_CONTENT {
            let text = match value {
                Value::Null => String::new(),
                Value::String(text) => text,
                other => other.to_string(),
            };
            self.set_text_content(&text);
            return;
        }
        let mut tree = self.document.lock();
        let Some(id) = tree.id_of(self.key) else {
            return;
        };
        if let Some(data) = tree.data_mut(id) {
            data.props.insert(name.to_owned(), value);
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        self.read(|tree, id| {
            let mut out = String::new();
            for descendant in id.descendants(&tree.arena) {
                if let Some(NodeKind::Text { text }) = tree.data(descendant).map(|data| &data.kind)
                {
                    out.push_str(text);
                }
            }
            Some(out)
        })
        .unwrap_or_default()
    }

    /// Replace all children with one text node (none for an empty string).
    ///
    /// Replaced text children are freed, so handles to them stop resolving.
    /// Replaced elements are only detached and can be appended again.
    pub fn set_text_content(&self, text: &str) {
        let mut tree = self.document.lock();
        let Some(id) = tree.id_of(self.key) else {
            return;
        };
        if let Some(NodeKind::Text { text: current }) =
            tree.data_mut(id).map(|data| &mut data.kind)
        {
            text.clone_into(current);
            return;
        }
        let children: Vec<_> = id.children(&tree.arena).collect();
        for child in children {
            if tree.tag(child).is_some() {
                child.detach(&mut tree.arena);
            } else {
                tree.free_subtree(child);
            }
        }
        if !text.is_empty() {
            let text_key = tree.insert(NodeKind::Text {
                text: text.to_owned(),
            });
            if let Some(text_id) = tree.id_of(text_key) {
                id.append(text_id, &mut tree.arena);
            }
        }
        tree.record(self.key, MutationKind::ChildList);
    }

    /// Append `child`, detaching it from its previous parent.
    ///
    /// # Errors
    /// Fails when the child belongs to another document, when `self` is a
    /// text node, or when the append would create a cycle.
    pub fn append_child(&self, child: &Self) -> Result<()> {
        if !self.document.same_document(&child.document) {
            bail!("node {} belongs to another document", child.key);
        }
        let mut tree = self.document.lock();
        let parent_id = tree
            .id_of(self.key)
            .ok_or_else(|| anyhow!("unknown node {}", self.key))?;
        let child_id = tree
            .id_of(child.key)
            .ok_or_else(|| anyhow!("unknown node {}", child.key))?;
        if matches!(
            tree.data(parent_id).map(|data| &data.kind),
            Some(NodeKind::Text { .. })
        ) {
            bail!("text node {} cannot have children", self.key);
        }
        let previous_parent = tree
            .arena
            .get(child_id)
            .and_then(ArenaNode::parent)
            .and_then(|parent| tree.key_of(parent));
        child_id.detach(&mut tree.arena);
        parent_id
            .checked_append(child_id, &mut tree.arena)
            .map_err(|err| anyhow!("cannot append {} to {}: {err}", child.key, self.key))?;
        if let Some(previous) = previous_parent {
            tree.record(previous, MutationKind::ChildList);
        }
        tree.record(self.key, MutationKind::ChildList);
        Ok(())
    }

    /// Detach this node (and its subtree) from its parent.
    pub fn remove(&self) {
        let mut tree = self.document.lock();
        let Some(id) = tree.id_of(self.key) else {
            return;
        };
        let parent = tree
            .arena
            .get(id)
            .and_then(ArenaNode::parent)
            .and_then(|parent| tree.key_of(parent));
        id.detach(&mut tree.arena);
        if let Some(parent) = parent {
            tree.record(parent, MutationKind::ChildList);
        }
    }

    /// True while the document node is an ancestor.
    pub fn is_connected(&self) -> bool {
        self.read(|tree, id| tree.is_connected(id).then_some(()))
            .is_some()
    }

    pub fn parent(&self) -> Option<Self> {
        let key = self.read(|tree, id| {
            let parent = tree.arena.get(id)?.parent()?;
            tree.key_of(parent)
        })?;
        Some(Self::new(self.document.clone(), key))
    }

    pub fn children(&self) -> Vec<Self> {
        self.read(|tree, id| {
            Some(
                id.children(&tree.arena)
                    .filter_map(|child| tree.key_of(child))
                    .collect::<Vec<_>>(),
            )
        })
        .unwrap_or_default()
        .into_iter()
        .map(|key| Self::new(self.document.clone(), key))
        .collect()
    }

    fn parse(selectors: &str) -> Option<SelectorList> {
        let parsed = selector::parse_selector_list(selectors);
        if parsed.is_none() {
            log::debug!("unsupported selector `{selectors}`");
        }
        parsed
    }

    /// First descendant element matching `selectors`, in tree order.
    /// Unsupported selectors match nothing.
    pub fn query_selector(&self, selectors: &str) -> Option<Self> {
        let list = Self::parse(selectors)?;
        let key = self.read(|tree, id| {
            let found = tree.first_match(id, &list)?;
            tree.key_of(found)
        })?;
        Some(Self::new(self.document.clone(), key))
    }

    /// Every descendant element matching `selectors`, in tree order.
    pub fn query_selector_all(&self, selectors: &str) -> Vec<Self> {
        let Some(list) = Self::parse(selectors) else {
            return Vec::new();
        };
        self.read(|tree, id| {
            Some(
                tree.all_matches(id, &list)
                    .into_iter()
                    .filter_map(|found| tree.key_of(found))
                    .collect::<Vec<_>>(),
            )
        })
        .unwrap_or_default()
        .into_iter()
        .map(|key| Self::new(self.document.clone(), key))
        .collect()
    }

    /// Markup for this node and its subtree.
    pub fn outer_html(&self) -> String {
        self.read(|tree, id| Some(printing::outer_html(tree, id)))
            .unwrap_or_default()
    }

    /// Markup for this node's children.
    pub fn inner_html(&self) -> String {
        self.read(|tree, id| Some(printing::inner_html(tree, id)))
            .unwrap_or_default()
    }
}
