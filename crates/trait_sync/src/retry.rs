//! Bounded, cancellable polling for internal elements that render late.
//!
//! A custom element may build its internals after it is inserted. A write
//! aimed at such an internal node is attempted immediately and, if the node
//! is missing, retried on a timer until it appears, the host element is
//! disconnected, or the attempt budget runs out.
//!
//! The table holds at most one task per `(element, trait)` key. Every request
//! cancels the previous task for its key before anything else, and every
//! terminal transition removes the entry, so the table only ever contains
//! tasks that are still waiting.

use core::time::Duration;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use canvas_dom::{Node, NodeKey};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::sleep;

use crate::value::TraitValue;

/// Delay between polling attempts unless configured otherwise.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(50);
/// Attempts before giving up unless configured otherwise.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Timing budget for one retry task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RETRY_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Build a policy; zero values are raised to one.
    #[inline]
    #[must_use]
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay: delay.max(Duration::from_millis(1)),
            max_attempts: max_attempts.max(1),
        }
    }
}

/// Write one property on the first descendant matching a selector.
#[derive(Clone, Debug, PartialEq)]
pub struct InternalWrite {
    pub selector: String,
    pub property: String,
    pub value: TraitValue,
}

impl InternalWrite {
    pub fn new(
        selector: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<TraitValue>,
    ) -> Self {
        Self {
            selector: selector.into(),
            property: property.into(),
            value: value.into(),
        }
    }

    /// Apply the write under `host`. Returns `false` while the target is missing.
    pub fn apply(&self, host: &Node) -> bool {
        let Some(target) = host.query_selector(&self.selector) else {
            return false;
        };
        if target.property(&self.property).as_ref() != Some(&self.value) {
            target.set_property(&self.property, self.value.clone());
        }
        true
    }
}

/// Result of [`RetrySync::request`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryState {
    /// The target existed and was written synchronously.
    Synced,
    /// The target is missing; a polling task now owns the key.
    Scheduled,
    /// The target is missing and no async runtime is available to poll.
    Unscheduled,
}

/// Terminal-transition counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RetryStats {
    pub synced: u64,
    pub cancelled: u64,
    pub exhausted: u64,
    /// Exhaustions reported while the host element was still connected.
    pub warnings: u64,
}

/// Identity of a retry task.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RetryKey {
    pub element: NodeKey,
    pub trait_name: String,
}

impl RetryKey {
    pub fn new(element: NodeKey, trait_name: &str) -> Self {
        Self {
            element,
            trait_name: trait_name.to_owned(),
        }
    }
}

#[derive(Debug)]
struct ScheduledTask {
    generation: u64,
    handle: AbortHandle,
    attempts: u32,
    write: InternalWrite,
    policy: RetryPolicy,
}

#[derive(Debug, Default)]
struct RetryTable {
    tasks: HashMap<RetryKey, ScheduledTask>,
    next_generation: u64,
    stats: RetryStats,
}

enum Terminal {
    Synced,
    Disconnected,
    Exhausted { connected: bool },
}

/// Scheduler owning every pending internal-element write of one editor instance.
#[derive(Clone, Debug, Default)]
pub struct RetrySync {
    table: Arc<Mutex<RetryTable>>,
}

impl RetrySync {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RetryTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write `write` under `element` now, or keep retrying under `policy`.
    ///
    /// Any task already pending for `(element, trait_name)` is cancelled
    /// first, so only the latest value for a key can ever be applied.
    pub fn request(
        &self,
        element: &Node,
        trait_name: &str,
        write: InternalWrite,
        policy: RetryPolicy,
    ) -> RetryState {
        let key = RetryKey::new(element.key(), trait_name);
        self.cancel_key(&key);

        if write.apply(element) {
            self.lock().stats.synced += 1;
            return RetryState::Synced;
        }

        let Ok(runtime) = Handle::try_current() else {
            log::warn!(
                "no async runtime; `{}` for trait `{trait_name}` on {} will not be retried",
                write.selector,
                element.key()
            );
            return RetryState::Unscheduled;
        };

        let mut table = self.lock();
        let generation = table.next_generation;
        table.next_generation = table.next_generation.wrapping_add(1);
        let task = runtime.spawn(poll(
            self.clone(),
            key.clone(),
            generation,
            element.clone(),
            write.clone(),
            policy,
        ));
        table.tasks.insert(
            key,
            ScheduledTask {
                generation,
                handle: task.abort_handle(),
                attempts: 0,
                write,
                policy,
            },
        );
        RetryState::Scheduled
    }

    fn cancel_key(&self, key: &RetryKey) -> bool {
        let mut table = self.lock();
        let Some(task) = table.tasks.remove(key) else {
            return false;
        };
        task.handle.abort();
        table.stats.cancelled += 1;
        log::trace!(
            "cancelled retry for `{}` on {} after {} attempts",
            key.trait_name,
            key.element,
            task.attempts
        );
        true
    }

    /// Cancel the task for one key. Returns whether one was pending.
    pub fn cancel(&self, element: NodeKey, trait_name: &str) -> bool {
        self.cancel_key(&RetryKey::new(element, trait_name))
    }

    /// Cancel every task of one element. Returns how many were pending.
    pub fn cancel_element(&self, element: NodeKey) -> usize {
        let mut table = self.lock();
        let keys: Vec<RetryKey> = table
            .tasks
            .keys()
            .filter(|key| key.element == element)
            .cloned()
            .collect();
        for key in &keys {
            if let Some(task) = table.tasks.remove(key) {
                task.handle.abort();
            }
        }
        table.stats.cancelled += keys.len() as u64;
        keys.len()
    }

    /// Cancel everything. Returns how many tasks were pending.
    pub fn cancel_all(&self) -> usize {
        let mut table = self.lock();
        let count = table.tasks.len();
        for (_, task) in table.tasks.drain() {
            task.handle.abort();
        }
        table.stats.cancelled += count as u64;
        count
    }

    /// Number of live tasks.
    pub fn pending(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_pending(&self, element: NodeKey, trait_name: &str) -> bool {
        self.lock()
            .tasks
            .contains_key(&RetryKey::new(element, trait_name))
    }

    /// Attempts made so far by the live task for a key.
    pub fn attempts(&self, element: NodeKey, trait_name: &str) -> Option<u32> {
        self.lock()
            .tasks
            .get(&RetryKey::new(element, trait_name))
            .map(|task| task.attempts)
    }

    /// Value the live task for a key is trying to write.
    pub fn target_value(&self, element: NodeKey, trait_name: &str) -> Option<TraitValue> {
        self.lock()
            .tasks
            .get(&RetryKey::new(element, trait_name))
            .map(|task| task.write.value.clone())
    }

    pub fn stats(&self) -> RetryStats {
        self.lock().stats
    }

    fn record_attempt(&self, key: &RetryKey, generation: u64, attempt: u32) {
        if let Some(task) = self.lock().tasks.get_mut(key) {
            if task.generation == generation {
                task.attempts = attempt;
            }
        }
    }

    /// Drop the entry for a finished task. Returns `false` if the entry
    /// already belongs to a newer task (or is gone), in which case nothing
    /// is counted.
    fn finish(&self, key: &RetryKey, generation: u64, terminal: &Terminal) -> bool {
        let mut table = self.lock();
        if table
            .tasks
            .get(key)
            .is_none_or(|task| task.generation != generation)
        {
            return false;
        }
        let removed = table.tasks.remove(key);
        let budget = removed.map(|task| task.policy.max_attempts).unwrap_or_default();
        match terminal {
            Terminal::Synced => table.stats.synced += 1,
            Terminal::Disconnected => table.stats.cancelled += 1,
            Terminal::Exhausted { connected } => {
                table.stats.exhausted += 1;
                if *connected {
                    table.stats.warnings += 1;
                }
                log::trace!(
                    "retry for `{}` on {} exhausted {budget} attempts",
                    key.trait_name,
                    key.element
                );
            }
        }
        true
    }
}

async fn poll(
    sync: RetrySync,
    key: RetryKey,
    generation: u64,
    element: Node,
    write: InternalWrite,
    policy: RetryPolicy,
) {
    for attempt in 1..=policy.max_attempts {
        sleep(policy.delay).await;
        // A detached host will never render its internals; stop quietly.
        if !element.is_connected() {
            sync.finish(&key, generation, &Terminal::Disconnected);
            return;
        }
        sync.record_attempt(&key, generation, attempt);
        if write.apply(&element) {
            sync.finish(&key, generation, &Terminal::Synced);
            return;
        }
    }
    let connected = element.is_connected();
    if sync.finish(&key, generation, &Terminal::Exhausted { connected }) && connected {
        log::warn!(
            "<{}> {}: internal element `{}` not found for trait `{}` after {} attempts",
            element.tag_name().unwrap_or_default(),
            key.element,
            write.selector,
            key.trait_name,
            policy.max_attempts
        );
    }
}
