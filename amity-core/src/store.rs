use std::fs;
use std::path::{Path, PathBuf};

use amity_common::records::Graph;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};

use crate::error::StoreError;

/// Authoritative, serialized, crash-safe holder of the relationship graph.
///
/// All read-modify-write cycles run under the single [`RelationStore::lock`]
/// guard, and the [`RelationStore::save`] that belongs to a mutation is made
/// while that guard is still held, so two operations never interleave their
/// reads and writes against the graph.
pub struct RelationStore {
    path: PathBuf,
    tmp_path: PathBuf,
    bak_path: PathBuf,
    graph: Mutex<Graph>,
}

impl RelationStore {
    /// Opens the store at `path`, loading the canonical file if present.
    ///
    /// Never fails: a missing file yields an empty graph, and an unreadable
    /// one is recovered from the `.bak` sibling or reset to empty. Recovery
    /// is logged, not surfaced.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tmp_path = suffixed(&path, "tmp");
        let bak_path = suffixed(&path, "bak");
        let graph = load_or_recover(&path, &bak_path);
        Self {
            path,
            tmp_path,
            bak_path,
            graph: Mutex::new(graph),
        }
    }

    /// Acquires the whole-store exclusive section. Every operation that
    /// reads then writes the graph must hold this guard for its entire
    /// read-modify-write, including the `save` call.
    pub async fn lock(&self) -> MutexGuard<'_, Graph> {
        self.graph.lock().await
    }

    /// Serializes `graph` to a temporary file and atomically renames it over
    /// the canonical file, copying the previous canonical to `.bak` first.
    /// No reader ever observes a half-written file. Call with the lock held.
    pub fn save(&self, graph: &Graph) -> Result<(), StoreError> {
        if self.path.exists() {
            fs::copy(&self.path, &self.bak_path)?;
        }
        let bytes = serde_json::to_vec_pretty(graph)?;
        fs::write(&self.tmp_path, bytes)?;
        fs::rename(&self.tmp_path, &self.path)?;
        Ok(())
    }

    /// Final flush for process shutdown.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let graph = self.graph.lock().await;
        self.save(&graph)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn suffixed(path: &Path, ext: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(ext);
    path.with_file_name(name)
}

fn load_or_recover(path: &Path, bak_path: &Path) -> Graph {
    match read_graph(path) {
        Ok(Some(graph)) => return normalized(graph),
        Ok(None) => return Graph::new(),
        Err(err) => {
            error!(file = %path.display(), %err, "relation data unreadable, trying backup");
        }
    }
    match read_graph(bak_path) {
        Ok(Some(graph)) => {
            info!(file = %bak_path.display(), "recovered relation data from backup");
            normalized(graph)
        }
        Ok(None) => Graph::new(),
        Err(err) => {
            error!(file = %bak_path.display(), %err, "backup unreadable, starting empty");
            Graph::new()
        }
    }
}

fn read_graph(path: &Path) -> Result<Option<Graph>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Scrubs invariants a loaded file cannot be trusted to hold: friend sets
/// already deduplicate through the set type, but self-links and inbox
/// entries keyed by someone other than the request sender are dropped.
fn normalized(mut graph: Graph) -> Graph {
    for (id, record) in graph.iter_mut() {
        if record.friends.remove(id) {
            warn!(user = %id, "dropped self-referential friend link");
        }
        let before = record.inbox.len();
        record.inbox.retain(|sender, req| *sender == req.from);
        if record.inbox.len() != before {
            warn!(user = %id, "dropped inbox entries with mismatched sender key");
        }
    }
    graph
}
