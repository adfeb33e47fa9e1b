use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indextree::{Arena, Node as ArenaNode, NodeId};
use serde_json::Value;
use smallvec::SmallVec;
use tokio::sync::broadcast;

use crate::keys::{DocumentId, NodeKey};
use crate::mutation::{MutationKind, MutationObserver, MutationRecord};
use crate::node::{Node, NodeKind};
use crate::selector::{self, SelectorList};

/// Capacity of the per-document mutation channel.
const MUTATION_CHANNEL_CAPACITY: usize = 256;

/// Arena payload for one node.
#[derive(Debug)]
pub(crate) struct NodeData {
    pub(crate) key: NodeKey,
    pub(crate) kind: NodeKind,
    pub(crate) attrs: SmallVec<[(String, String); 4]>,
    pub(crate) props: HashMap<String, Value>,
}

/// Mutable document state guarded by the [`Document`] mutex.
#[derive(Debug)]
pub(crate) struct DomTree {
    pub(crate) id: DocumentId,
    pub(crate) arena: Arena<NodeData>,
    pub(crate) root: NodeId,
    pub(crate) nodes: HashMap<NodeKey, NodeId>,
    next_counter: u32,
    mutations: broadcast::Sender<MutationRecord>,
}

impl DomTree {
    fn new() -> Self {
        let id = DocumentId::mint();
        let mut arena = Arena::new();
        let root_key = NodeKey::pack(id, 0);
        let root = arena.new_node(NodeData {
            key: root_key,
            kind: NodeKind::Document,
            attrs: SmallVec::new(),
            props: HashMap::new(),
        });
        let mut nodes = HashMap::new();
        nodes.insert(root_key, root);
        let (mutations, _) = broadcast::channel(MUTATION_CHANNEL_CAPACITY);
        Self {
            id,
            arena,
            root,
            nodes,
            next_counter: 1,
            mutations,
        }
    }

    /// Allocate a detached node. It stays in the arena and the key index until
    /// [`DomTree::free_subtree`] drops it; detaching alone never frees.
    pub(crate) fn insert(&mut self, kind: NodeKind) -> NodeKey {
        let key = NodeKey::pack(self.id, self.next_counter);
        self.next_counter = self.next_counter.wrapping_add(1);
        let id = self.arena.new_node(NodeData {
            key,
            kind,
            attrs: SmallVec::new(),
            props: HashMap::new(),
        });
        self.nodes.insert(key, id);
        key
    }

    /// Drop `id` and its descendants from the arena and the key index.
    pub(crate) fn free_subtree(&mut self, id: NodeId) {
        let keys: Vec<NodeKey> = id
            .descendants(&self.arena)
            .filter_map(|node| self.key_of(node))
            .collect();
        for key in keys {
            self.nodes.remove(&key);
        }
        id.remove_subtree(&mut self.arena);
    }

    #[inline]
    pub(crate) fn id_of(&self, key: NodeKey) -> Option<NodeId> {
        self.nodes.get(&key).copied()
    }

    #[inline]
    pub(crate) fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.arena.get(id).map(ArenaNode::get)
    }

    #[inline]
    pub(crate) fn data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.arena.get_mut(id).map(ArenaNode::get_mut)
    }

    #[inline]
    pub(crate) fn key_of(&self, id: NodeId) -> Option<NodeKey> {
        self.data(id).map(|data| data.key)
    }

    /// Element tag for `id`, if it is an element.
    pub(crate) fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.data(id)?.kind {
            NodeKind::Element { tag } => Some(tag),
            NodeKind::Document | NodeKind::Text { .. } => None,
        }
    }

    pub(crate) fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.data(id)?
            .attrs
            .iter()
            .find(|(attr_name, _)| attr_name == name)
            .map(|(_, value)| value.as_str())
    }

    /// Parent element of `id` (the document node is not an element).
    pub(crate) fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.arena.get(id)?.parent()?;
        self.tag(parent).map(|_| parent)
    }

    pub(crate) fn is_connected(&self, id: NodeId) -> bool {
        id.ancestors(&self.arena).any(|ancestor| ancestor == self.root)
    }

    /// First element below `scope` (excluding it) matching `list`, in tree order.
    pub(crate) fn first_match(&self, scope: NodeId, list: &SelectorList) -> Option<NodeId> {
        scope
            .descendants(&self.arena)
            .skip(1)
            .find(|candidate| selector::matches_selector_list(self, *candidate, list))
    }

    pub(crate) fn all_matches(&self, scope: NodeId, list: &SelectorList) -> Vec<NodeId> {
        scope
            .descendants(&self.arena)
            .skip(1)
            .filter(|candidate| selector::matches_selector_list(self, *candidate, list))
            .collect()
    }

    /// Broadcast a record to observers; having none is not an error.
    pub(crate) fn record(&self, target: NodeKey, kind: MutationKind) {
        if self.mutations.receiver_count() == 0 {
            return;
        }
        if let Err(err) = self.mutations.send(MutationRecord { target, kind }) {
            log::trace!("mutation for {target} dropped: {err}");
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<MutationRecord> {
        self.mutations.subscribe()
    }
}

/// A live document. Cloning yields another handle to the same document.
#[derive(Clone, Debug)]
pub struct Document {
    tree: Arc<Mutex<DomTree>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only its root node.
    pub fn new() -> Self {
        Self {
            tree: Arc::new(Mutex::new(DomTree::new())),
        }
    }

    /// Lock the tree. A poisoned lock is recovered: every mutation leaves the
    /// arena structurally valid, so a panic elsewhere never corrupts it.
    pub(crate) fn lock(&self) -> MutexGuard<'_, DomTree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The document's process-unique id.
    pub fn id(&self) -> DocumentId {
        self.lock().id
    }

    /// True if both handles refer to the same document.
    #[inline]
    pub fn same_document(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree)
    }

    /// The document node. Nodes are connected when it is one of their ancestors.
    pub fn root(&self) -> Node {
        let key = {
            let tree = self.lock();
            NodeKey::pack(tree.id, 0)
        };
        Node::new(self.clone(), key)
    }

    /// Create a detached element. The tag is stored in ASCII lowercase.
    pub fn create_element(&self, tag: &str) -> Node {
        let key = self.lock().insert(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
        });
        Node::new(self.clone(), key)
    }

    /// Create a detached text node.
    pub fn create_text(&self, text: &str) -> Node {
        let key = self.lock().insert(NodeKind::Text {
            text: text.to_owned(),
        });
        Node::new(self.clone(), key)
    }

    /// Nodes currently allocated, the document node included.
    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    /// Resolve a key minted by this document.
    pub fn node(&self, key: NodeKey) -> Option<Node> {
        let known = self.lock().id_of(key).is_some();
        known.then(|| Node::new(self.clone(), key))
    }

    /// First element in the document matching `selectors`.
    pub fn query_selector(&self, selectors: &str) -> Option<Node> {
        self.root().query_selector(selectors)
    }

    /// Observe attribute mutations of `target`.
    pub fn observe_attributes(&self, target: &Node) -> MutationObserver {
        MutationObserver::new(target.key(), self.lock().subscribe())
    }

    /// Subscribe to every mutation record of the document.
    pub fn subscribe(&self) -> broadcast::Receiver<MutationRecord> {
        self.lock().subscribe()
    }

    /// Serialized markup of the document's children.
    pub fn to_html(&self) -> String {
        self.root().inner_html()
    }
}
