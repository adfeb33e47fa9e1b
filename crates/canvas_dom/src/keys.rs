use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

/// Process-wide counter handing out document ids. Id 0 is never minted.
static NEXT_DOCUMENT: AtomicU32 = AtomicU32::new(1);

/// Identifies one [`Document`](crate::Document) within the process.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct DocumentId(pub u32);

impl DocumentId {
    /// Mint a fresh id for a new document.
    pub(crate) fn mint() -> Self {
        Self(NEXT_DOCUMENT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A 64-bit stable key for DOM nodes.
///
/// The upper 32 bits carry the owning document, the lower 32 bits a
/// per-document counter, so keys from distinct documents never collide.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// Pack a document id and a per-document counter into a single key.
    #[inline]
    #[must_use]
    pub const fn pack(document: DocumentId, counter: u32) -> Self {
        Self(((document.0 as u64) << 32) | counter as u64)
    }

    /// Extract the owning document from the key.
    #[inline]
    #[must_use]
    pub const fn document(self) -> DocumentId {
        DocumentId((self.0 >> 32) as u32)
    }

    /// Extract the per-document counter from the key.
    #[inline]
    #[must_use]
    pub const fn counter(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.document().0, self.counter())
    }
}
