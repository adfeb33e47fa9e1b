use crate::config::SyncConfig;
use crate::handler::HandlerContext;
use crate::registry::ComponentRegistry;
use crate::retry::RetrySync;

/// State of one editor instance: its registry, its retry table and its
/// configuration. Nothing in this crate is global; two contexts never
/// share a table.
#[derive(Debug, Default)]
pub struct EditorContext {
    registry: ComponentRegistry,
    retry: RetrySync,
    config: SyncConfig,
}

impl EditorContext {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            registry: ComponentRegistry::new(),
            retry: RetrySync::new(),
            config,
        }
    }

    #[inline]
    pub const fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    #[inline]
    pub const fn retry(&self) -> &RetrySync {
        &self.retry
    }

    #[inline]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Collaborators for one handler call on `trait_name`.
    pub fn handler_context<'ctx>(&'ctx self, trait_name: &'ctx str) -> HandlerContext<'ctx> {
        HandlerContext::new(trait_name, &self.retry, self.config.retry_policy())
    }
}
