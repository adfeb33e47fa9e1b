#![allow(dead_code, reason = "each test binary uses a different subset")]
//! In-memory host editor for integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use canvas_dom::{Document, Node};
use trait_sync::{
    AttributeMap, ChangeListener, ComponentHandle, ComponentId, EditorHost, Lifecycle,
    LifecycleListener, RequestRender, Subscription, TraitValue,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Create `<tag>` attached to the document root.
pub fn connected_element(doc: &Document, tag: &str) -> Node {
    let element = doc.create_element(tag);
    doc.root().append_child(&element).unwrap();
    element
}

/// Append `<tag>` under `parent` and return it.
pub fn append(parent: &Node, tag: &str) -> Node {
    let child = parent.document().create_element(tag);
    parent.append_child(&child).unwrap();
    child
}

#[derive(Debug, Default)]
pub struct RenderCounter(AtomicUsize);

impl RenderCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl RequestRender for RenderCounter {
    fn request_render(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Snapshot {
    current: AttributeMap,
    previous: AttributeMap,
}

pub struct MemoryComponent {
    id: ComponentId,
    tag: String,
    element: Option<Node>,
    attributes: Mutex<Snapshot>,
    render: Option<Arc<RenderCounter>>,
}

impl MemoryComponent {
    pub fn renders(&self) -> usize {
        self.render.as_ref().map_or(0, |render| render.count())
    }
}

impl ComponentHandle for MemoryComponent {
    fn id(&self) -> ComponentId {
        self.id.clone()
    }

    fn tag_name(&self) -> String {
        self.tag.clone()
    }

    fn attributes(&self) -> AttributeMap {
        self.attributes.lock().unwrap().current.clone()
    }

    fn previous_attributes(&self) -> AttributeMap {
        self.attributes.lock().unwrap().previous.clone()
    }

    fn element(&self) -> Option<Node> {
        self.element.clone()
    }

    fn render_hook(&self) -> Option<Arc<dyn RequestRender>> {
        self.render
            .as_ref()
            .map(|render| Arc::clone(render) as Arc<dyn RequestRender>)
    }
}

struct ChangeEntry {
    id: ComponentId,
    attribute: Option<String>,
    listener: ChangeListener,
}

#[derive(Default)]
struct Listeners {
    next_token: u64,
    lifecycle: HashMap<u64, LifecycleListener>,
    changes: HashMap<u64, ChangeEntry>,
}

/// Host editor keeping components and listeners in memory. Listeners are
/// called after the internal locks are released.
#[derive(Default)]
pub struct MemoryEditor {
    components: Mutex<HashMap<ComponentId, Arc<MemoryComponent>>>,
    listeners: Arc<Mutex<Listeners>>,
}

impl MemoryEditor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn as_host(self: &Arc<Self>) -> Arc<dyn EditorHost> {
        Arc::clone(self) as Arc<dyn EditorHost>
    }

    pub fn add(
        &self,
        id: &str,
        tag: &str,
        element: Option<Node>,
        attributes: AttributeMap,
    ) -> Arc<MemoryComponent> {
        self.insert(id, tag, element, attributes, None)
    }

    /// Like [`MemoryEditor::add`], with a render-request capability.
    pub fn add_renderable(
        &self,
        id: &str,
        tag: &str,
        element: Option<Node>,
        attributes: AttributeMap,
    ) -> Arc<MemoryComponent> {
        self.insert(id, tag, element, attributes, Some(Arc::default()))
    }

    fn insert(
        &self,
        id: &str,
        tag: &str,
        element: Option<Node>,
        attributes: AttributeMap,
        render: Option<Arc<RenderCounter>>,
    ) -> Arc<MemoryComponent> {
        let component = Arc::new(MemoryComponent {
            id: ComponentId::from(id),
            tag: tag.to_owned(),
            element,
            attributes: Mutex::new(Snapshot {
                previous: attributes.clone(),
                current: attributes,
            }),
            render,
        });
        self.components
            .lock()
            .unwrap()
            .insert(component.id.clone(), Arc::clone(&component));
        component
    }

    fn component(&self, id: &str) -> Arc<MemoryComponent> {
        Arc::clone(&self.components.lock().unwrap()[&ComponentId::from(id)])
    }

    pub fn emit(&self, event: Lifecycle, id: &str) {
        let component = self.component(id);
        let listeners: Vec<LifecycleListener> = self
            .listeners
            .lock()
            .unwrap()
            .lifecycle
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener(event, component.as_ref());
        }
    }

    pub fn mount(&self, id: &str) {
        self.emit(Lifecycle::Mount, id);
    }

    pub fn select(&self, id: &str) {
        self.emit(Lifecycle::Select, id);
    }

    pub fn deselect(&self, id: &str) {
        self.emit(Lifecycle::Deselect, id);
    }

    pub fn unmount(&self, id: &str) {
        self.emit(Lifecycle::Unmount, id);
    }

    /// Change one attribute and fire the per-attribute and aggregate events.
    pub fn set_attribute(&self, id: &str, name: &str, value: impl Into<TraitValue>) {
        let mut changes = AttributeMap::new();
        changes.insert(name.to_owned(), value.into());
        self.set_attributes(id, changes);
    }

    /// Apply several changes as one event.
    pub fn set_attributes(&self, id: &str, changes: AttributeMap) {
        let component = self.component(id);
        {
            let mut snapshot = component.attributes.lock().unwrap();
            snapshot.previous = snapshot.current.clone();
            for (name, value) in &changes {
                snapshot.current.insert(name.clone(), value.clone());
            }
        }
        self.fire_changes(&component, changes.keys().map(String::as_str));
    }

    pub fn remove_attribute(&self, id: &str, name: &str) {
        let component = self.component(id);
        {
            let mut snapshot = component.attributes.lock().unwrap();
            snapshot.previous = snapshot.current.clone();
            snapshot.current.shift_remove(name);
        }
        self.fire_changes(&component, [name]);
    }

    fn fire_changes<'name>(
        &self,
        component: &Arc<MemoryComponent>,
        names: impl IntoIterator<Item = &'name str>,
    ) {
        let names: Vec<&str> = names.into_iter().collect();
        let mut narrow: Vec<ChangeListener> = Vec::new();
        let mut aggregate: Vec<ChangeListener> = Vec::new();
        {
            let listeners = self.listeners.lock().unwrap();
            for entry in listeners.changes.values() {
                if entry.id != component.id {
                    continue;
                }
                match entry.attribute.as_deref() {
                    None => aggregate.push(Arc::clone(&entry.listener)),
                    Some(attribute) if names.contains(&attribute) => {
                        narrow.push(Arc::clone(&entry.listener));
                    }
                    Some(_) => {}
                }
            }
        }
        for listener in narrow.into_iter().chain(aggregate) {
            listener(component.as_ref());
        }
    }

    /// Change listeners attached for one component.
    pub fn change_listeners(&self, id: &str) -> usize {
        let id = ComponentId::from(id);
        self.listeners
            .lock()
            .unwrap()
            .changes
            .values()
            .filter(|entry| entry.id == id)
            .count()
    }

    pub fn lifecycle_listeners(&self) -> usize {
        self.listeners.lock().unwrap().lifecycle.len()
    }

    fn subscribe(&self, attach: impl FnOnce(&mut Listeners, u64)) -> Subscription {
        let token = {
            let mut listeners = self.listeners.lock().unwrap();
            let token = listeners.next_token;
            listeners.next_token += 1;
            attach(&mut listeners, token);
            token
        };
        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                let mut listeners = listeners.lock().unwrap();
                listeners.lifecycle.remove(&token);
                listeners.changes.remove(&token);
            }
        })
    }
}

impl EditorHost for MemoryEditor {
    fn on_lifecycle(&self, listener: LifecycleListener) -> Subscription {
        self.subscribe(|listeners, token| {
            listeners.lifecycle.insert(token, listener);
        })
    }

    fn on_attributes_changed(&self, id: &ComponentId, listener: ChangeListener) -> Subscription {
        let id = id.clone();
        self.subscribe(|listeners, token| {
            listeners.changes.insert(
                token,
                ChangeEntry {
                    id,
                    attribute: None,
                    listener,
                },
            );
        })
    }

    fn on_attribute_changed(
        &self,
        id: &ComponentId,
        name: &str,
        listener: ChangeListener,
    ) -> Subscription {
        let id = id.clone();
        let attribute = Some(name.to_owned());
        self.subscribe(|listeners, token| {
            listeners.changes.insert(
                token,
                ChangeEntry {
                    id,
                    attribute,
                    listener,
                },
            );
        })
    }
}
