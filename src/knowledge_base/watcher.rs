//! Polling-based source directory watcher that triggers a full rebuild on changes

use crate::knowledge_base::KnowledgeBaseHandle;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Run the knowledge base directory watcher.
///
/// Polls at the given interval and calls `handle.reload()` when a document
/// is added, modified or removed. A failed reload keeps the previous
/// snapshot and is retried on the next detected change. Returns when
/// `cancel` fires.
pub async fn run_watcher(
    handle: KnowledgeBaseHandle,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    let source = handle.config().source.clone();
    let mut last_seen = snapshot_mtimes(source.document_mtimes());
    info!(
        dir = %source.dir.display(),
        files = last_seen.len(),
        interval_secs = poll_interval.as_secs(),
        "Knowledge base watcher started"
    );

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("Knowledge base watcher stopping");
                return;
            }
            () = tokio::time::sleep(poll_interval) => {}
        }

        let current = snapshot_mtimes(source.document_mtimes());
        if detect_changes(&last_seen, &current) {
            debug!("Rebuilding knowledge base due to source changes");
            let rebuild = handle.clone();
            match tokio::task::spawn_blocking(move || rebuild.reload()).await {
                Ok(Ok(kb)) => debug!(entries = kb.entries().len(), "Watcher rebuild applied"),
                // reload() already logged the cause; the old snapshot stays active.
                Ok(Err(e)) => debug!(error = %e, "Watcher rebuild rejected"),
                Err(e) => warn!(error = %e, "Watcher rebuild task failed"),
            }
        }
        last_seen = current;
    }
}

fn snapshot_mtimes(files: Vec<(PathBuf, SystemTime)>) -> HashMap<PathBuf, SystemTime> {
    files.into_iter().collect()
}

/// Compare two scans, logging every difference. True if anything changed.
fn detect_changes(
    old_state: &HashMap<PathBuf, SystemTime>,
    current: &HashMap<PathBuf, SystemTime>,
) -> bool {
    let mut changed = false;

    for (path, mtime) in current {
        match old_state.get(path) {
            Some(old_mtime) if mtime != old_mtime => {
                info!(path = %path.display(), "Knowledge base document modified");
                changed = true;
            }
            None => {
                info!(path = %path.display(), "New knowledge base document detected");
                changed = true;
            }
            _ => {}
        }
    }

    for path in old_state.keys().filter(|p| !current.contains_key(*p)) {
        info!(path = %path.display(), "Knowledge base document removed");
        changed = true;
    }

    changed
}
