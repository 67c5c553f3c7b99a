//! Read-only structured snapshots.

use tundra_shared::{ErrorEnvelope, Result};

/// A value that can be exported as a structured document but never loaded
/// back from one.
pub trait SnapshotCodable {
    /// Document type produced by [`SnapshotCodable::snapshot`].
    type Snapshot;

    /// Name used in the `unsupported` error raised by [`SnapshotCodable::restore`].
    const KIND: &'static str;

    /// Export the current state.
    fn snapshot(&self) -> Self::Snapshot;

    /// Loading state from a document always fails with `core:unsupported`.
    fn restore(&mut self, snapshot: &Self::Snapshot) -> Result<()> {
        let _ = snapshot;
        Err(ErrorEnvelope::unsupported(&format!("{}.restore", Self::KIND)))
    }
}
