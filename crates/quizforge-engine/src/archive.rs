//! Durable record of sessions.
//!
//! The engine reports a session to the archive when it is created and once
//! more, with final standings, right before it is evicted. Archive
//! failures are logged and otherwise ignored: the live session is the
//! source of truth while it exists.

use crate::model::Session;

/// Error returned by an archive backend.
#[derive(Debug, thiserror::Error)]
#[error("archive failed: {0}")]
pub struct ArchiveError(pub String);

/// Sink for session snapshots.
///
/// Called from inside session tasks, so implementations should hand slow
/// work off rather than block.
pub trait SessionArchive: Send + Sync + 'static {
    fn record(&self, session: &Session) -> Result<(), ArchiveError>;
}

/// Archive that keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopArchive;

impl SessionArchive for NoopArchive {
    fn record(&self, _session: &Session) -> Result<(), ArchiveError> {
        Ok(())
    }
}

/// Records a snapshot, logging rather than propagating failure.
pub(crate) fn record_best_effort(archive: &dyn SessionArchive, session: &Session) {
    if let Err(e) = archive.record(session) {
        tracing::warn!(
            join_code = %session.join_code,
            session_id = %session.id,
            error = %e,
            "failed to archive session"
        );
    }
}
