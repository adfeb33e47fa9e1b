use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::NodeKey;

/// What changed on a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationKind {
    /// An attribute was set or removed. `name` is ASCII lowercase.
    Attribute {
        name: String,
        old_value: Option<String>,
    },
    /// Children were inserted into or removed from the target.
    ChildList,
}

/// A single DOM mutation, broadcast to every observer of the document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeKey,
    pub kind: MutationKind,
}

impl MutationRecord {
    /// Attribute name for attribute records.
    #[inline]
    pub fn attribute_name(&self) -> Option<&str> {
        match &self.kind {
            MutationKind::Attribute { name, .. } => Some(name),
            MutationKind::ChildList => None,
        }
    }
}

/// Receives the attribute mutations of one target node.
///
/// Records are delivered asynchronously relative to the write that produced
/// them. Dropping the observer disconnects it.
#[derive(Debug)]
pub struct MutationObserver {
    target: NodeKey,
    receiver: broadcast::Receiver<MutationRecord>,
    attribute_filter: Option<Vec<String>>,
}

impl MutationObserver {
    pub(crate) fn new(target: NodeKey, receiver: broadcast::Receiver<MutationRecord>) -> Self {
        Self {
            target,
            receiver,
            attribute_filter: None,
        }
    }

    /// Only deliver records for the named attributes (compared case-insensitively).
    #[must_use]
    pub fn with_attribute_filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.attribute_filter = Some(
            names
                .into_iter()
                .map(|name| name.as_ref().to_ascii_lowercase())
                .collect(),
        );
        self
    }

    /// The observed node.
    #[inline]
    pub const fn target(&self) -> NodeKey {
        self.target
    }

    fn accepts(&self, record: &MutationRecord) -> bool {
        if record.target != self.target {
            return false;
        }
        let Some(name) = record.attribute_name() else {
            return false;
        };
        self.attribute_filter
            .as_ref()
            .is_none_or(|filter| filter.iter().any(|allowed| allowed == name))
    }

    /// Wait for the next matching record. Returns `None` once the document is gone.
    pub async fn next(&mut self) -> Option<MutationRecord> {
        loop {
            match self.receiver.recv().await {
                Ok(record) if self.accepts(&record) => return Some(record),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!(
                        "mutation observer for {} skipped {skipped} records",
                        self.target
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Drain one pending matching record without waiting.
    pub fn try_next(&mut self) -> Option<MutationRecord> {
        loop {
            match self.receiver.try_recv() {
                Ok(record) if self.accepts(&record) => return Some(record),
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}
