//! Per-tag catalog of trait definitions and handlers.
//!
//! Registrations are stored whole; readers get one of three projections so
//! the panel (definitions), instance seeding (defaults) and the bridge
//! (handlers) never depend on each other's shape.

use core::fmt;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Result, bail};
use indexmap::IndexMap;

use crate::definition::TraitDefinition;
use crate::handler::TraitHandler;
use crate::value::{AttributeMap, TraitValue};

/// Handlers of one component, in declaration order.
pub type TraitHandlers = IndexMap<String, Arc<dyn TraitHandler>>;

/// Definition and behaviour of one trait.
#[derive(Clone)]
pub struct TraitEntry {
    pub definition: TraitDefinition,
    pub handler: Arc<dyn TraitHandler>,
}

impl fmt::Debug for TraitEntry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TraitEntry")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

/// Everything the editor knows about one custom element tag.
#[derive(Clone, Debug)]
pub struct ComponentRegistration {
    tag_name: String,
    droppable: bool,
    traits: IndexMap<String, TraitEntry>,
    /// Trait names declared more than once; such a registration is rejected.
    duplicates: Vec<String>,
}

impl ComponentRegistration {
    /// Start a registration. The tag is stored in ASCII lowercase.
    pub fn new(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            droppable: false,
            traits: IndexMap::new(),
            duplicates: Vec::new(),
        }
    }

    /// Whether other components may be dropped inside this one.
    #[must_use]
    pub const fn droppable(mut self, droppable: bool) -> Self {
        self.droppable = droppable;
        self
    }

    /// Add a trait keyed by its definition's name.
    #[must_use]
    pub fn with_trait(
        self,
        definition: TraitDefinition,
        handler: impl TraitHandler + 'static,
    ) -> Self {
        self.with_shared_trait(definition, Arc::new(handler))
    }

    /// Add a trait whose handler is shared with other registrations.
    #[must_use]
    pub fn with_shared_trait(
        mut self,
        definition: TraitDefinition,
        handler: Arc<dyn TraitHandler>,
    ) -> Self {
        let name = definition.name.clone();
        if self.traits.contains_key(&name) {
            self.duplicates.push(name);
            return self;
        }
        self.traits.insert(name, TraitEntry { definition, handler });
        self
    }

    #[inline]
    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    #[inline]
    pub const fn is_droppable(&self) -> bool {
        self.droppable
    }

    /// Traits in declaration order.
    pub fn traits(&self) -> impl Iterator<Item = (&str, &TraitEntry)> {
        self.traits.iter().map(|(name, entry)| (name.as_str(), entry))
    }
}

/// Catalog of component registrations, keyed by tag name.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: RwLock<HashMap<String, Arc<ComponentRegistration>>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<ComponentRegistration>>> {
        self.components.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<ComponentRegistration>>> {
        self.components.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self, tag_name: &str) -> Option<Arc<ComponentRegistration>> {
        self.read().get(&tag_name.to_ascii_lowercase()).cloned()
    }

    /// Insert a registration, replacing any previous one for the same tag.
    ///
    /// Replacing is how component definitions are hot-reloaded.
    ///
    /// # Errors
    /// Rejects registrations that declare a trait name twice; the registry is
    /// left unchanged.
    pub fn register(&self, registration: ComponentRegistration) -> Result<()> {
        if !registration.duplicates.is_empty() {
            bail!(
                "<{}> declares traits more than once: {}",
                registration.tag_name,
                registration.duplicates.join(", ")
            );
        }
        let tag = registration.tag_name.clone();
        if self.write().insert(tag.clone(), Arc::new(registration)).is_some() {
            log::debug!("replaced registration for <{tag}>");
        }
        Ok(())
    }

    /// Register several components; stops at the first rejected one.
    ///
    /// # Errors
    /// See [`ComponentRegistry::register`].
    pub fn register_many<I>(&self, registrations: I) -> Result<()>
    where
        I: IntoIterator<Item = ComponentRegistration>,
    {
        registrations
            .into_iter()
            .try_for_each(|registration| self.register(registration))
    }

    pub fn contains(&self, tag_name: &str) -> bool {
        self.get(tag_name).is_some()
    }

    pub fn is_droppable(&self, tag_name: &str) -> bool {
        self.get(tag_name)
            .is_some_and(|registration| registration.droppable)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.read().keys().cloned().collect();
        tags.sort();
        tags
    }

    /// Serializable definitions for the properties panel, in declaration order.
    /// Unknown tags have none.
    pub fn trait_definitions(&self, tag_name: &str) -> Vec<TraitDefinition> {
        self.get(tag_name)
            .map(|registration| {
                registration
                    .traits
                    .values()
                    .map(|entry| entry.definition.to_data())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Definitions whose visibility predicate accepts `attributes`.
    pub fn visible_traits(
        &self,
        tag_name: &str,
        attributes: &AttributeMap,
    ) -> Vec<TraitDefinition> {
        self.get(tag_name)
            .map(|registration| {
                registration
                    .traits
                    .values()
                    .filter(|entry| entry.definition.is_visible(attributes))
                    .map(|entry| entry.definition.to_data())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Handlers for the bridge; `None` for unknown tags.
    pub fn trait_handlers(&self, tag_name: &str) -> Option<TraitHandlers> {
        self.get(tag_name).map(|registration| {
            registration
                .traits
                .iter()
                .map(|(name, entry)| (name.clone(), Arc::clone(&entry.handler)))
                .collect()
        })
    }

    /// Default value of every trait, for seeding new components.
    pub fn trait_defaults(&self, tag_name: &str) -> AttributeMap {
        self.get(tag_name)
            .map(|registration| {
                registration
                    .traits
                    .iter()
                    .map(|(name, entry)| (name.clone(), entry.definition.default.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fill in defaults for traits missing from `attributes`; explicit values win.
    /// Returns how many attributes were added.
    pub fn seed_attributes(&self, tag_name: &str, attributes: &mut AttributeMap) -> usize {
        let mut added = 0;
        for (name, default) in self.trait_defaults(tag_name) {
            if default == TraitValue::Null || attributes.contains_key(&name) {
                continue;
            }
            attributes.insert(name, default);
            added += 1;
        }
        added
    }
}
