use crate::error::*;
use crate::types::*;
use chrono::Utc;
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Durable set of monitoring requests.
///
/// Implementations lock internally and never hold the lock across an
/// `.await`. Snapshots are clones.
pub trait Registry: Send + Sync {
    fn add(&self, request: MonitoringRequest) -> Result<()>;
    /// Returns `true` only for the call that turned `active` off.
    fn deactivate(&self, id: &RequestId, reason: Deactivation) -> Result<bool>;
    fn get(&self, id: &RequestId) -> Result<Option<MonitoringRequest>>;
    /// Active requests ordered by creation time.
    fn list_active(&self) -> Result<Vec<MonitoringRequest>>;
    fn list_by_owner(&self, owner: &Owner) -> Result<Vec<MonitoringRequest>>;
    fn list_all(&self) -> Result<Vec<MonitoringRequest>>;
}

type RequestMap = BTreeMap<RequestId, MonitoringRequest>;

fn lock(map: &Mutex<RequestMap>) -> Result<MutexGuard<'_, RequestMap>> {
    map.lock()
        .map_err(|_| RoomwatchError::storage_error("lock", "registry mutex poisoned"))
}

fn insert(map: &mut RequestMap, request: MonitoringRequest) -> Result<()> {
    if map.contains_key(&request.id) {
        return Err(RoomwatchError::storage_error(
            "add",
            &format!("duplicate request id {}", request.id),
        ));
    }
    map.insert(request.id.clone(), request);
    Ok(())
}

/// Flip `active` off; hands back the previous record when it did.
fn flip(map: &mut RequestMap, id: &RequestId, reason: Deactivation) -> Option<MonitoringRequest> {
    let req = map.get_mut(id)?;
    if !req.active {
        return None;
    }
    let before = req.clone();
    req.active = false;
    req.deactivated_at = Some(Utc::now());
    req.deactivation = Some(reason);
    Some(before)
}

fn sorted<'a>(items: impl Iterator<Item = &'a MonitoringRequest>) -> Vec<MonitoringRequest> {
    let mut out: Vec<MonitoringRequest> = items.cloned().collect();
    out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    out
}

fn active(map: &RequestMap) -> Vec<MonitoringRequest> {
    sorted(map.values().filter(|r| r.active))
}

fn by_owner(map: &RequestMap, owner: &Owner) -> Vec<MonitoringRequest> {
    sorted(map.values().filter(|r| &r.owner == owner))
}

/// In-process registry. Lost on exit.
#[derive(Default)]
pub struct MemoryRegistry {
    requests: Mutex<RequestMap>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Registry for MemoryRegistry {
    fn add(&self, request: MonitoringRequest) -> Result<()> {
        insert(&mut *lock(&self.requests)?, request)
    }

    fn deactivate(&self, id: &RequestId, reason: Deactivation) -> Result<bool> {
        Ok(flip(&mut *lock(&self.requests)?, id, reason).is_some())
    }

    fn get(&self, id: &RequestId) -> Result<Option<MonitoringRequest>> {
        Ok(lock(&self.requests)?.get(id).cloned())
    }

    fn list_active(&self) -> Result<Vec<MonitoringRequest>> {
        Ok(active(&*lock(&self.requests)?))
    }

    fn list_by_owner(&self, owner: &Owner) -> Result<Vec<MonitoringRequest>> {
        Ok(by_owner(&*lock(&self.requests)?, owner))
    }

    fn list_all(&self) -> Result<Vec<MonitoringRequest>> {
        Ok(sorted(lock(&self.requests)?.values()))
    }
}

#[derive(Serialize, Deserialize)]
struct RegistryDoc {
    requests: Vec<MonitoringRequest>,
}

/// Registry persisted as one JSON document.
///
/// Several processes may share the file (a running poller and one-shot CLI
/// commands). Every operation takes an advisory lock on `<path>.lock`, shared
/// for reads and exclusive for writes, and works on what is on disk at that
/// moment. A mutation is written to a temp file and renamed into place; if the
/// write fails the file is left as it was.
pub struct FileRegistry {
    path: PathBuf,
    lock_path: PathBuf,
    // serializes this process's threads before they contend for the file lock
    local: Mutex<()>,
}

impl FileRegistry {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let reg = Self {
            lock_path: path.with_extension("json.lock"),
            path,
            local: Mutex::new(()),
        };
        let count = reg.read(|map| map.len())?;
        tracing::debug!(path = %reg.path.display(), requests = count, "opened registry");
        Ok(reg)
    }

    /// Open the store at the platform data dir.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::config::default_store_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_file(&self) -> Result<RwLock<fs::File>> {
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        Ok(RwLock::new(file))
    }

    fn load(&self) -> Result<RequestMap> {
        let mut map = RequestMap::new();
        if !self.path.exists() {
            return Ok(map);
        }
        let file = fs::File::open(&self.path)?;
        let doc: RegistryDoc = serde_json::from_reader(file).map_err(|e| {
            RoomwatchError::storage_error("load", &format!("{}: {e}", self.path.display()))
        })?;
        for req in doc.requests {
            map.insert(req.id.clone(), req);
        }
        Ok(map)
    }

    fn persist(&self, map: &RequestMap) -> Result<()> {
        let doc = RegistryDoc {
            requests: sorted(map.values()),
        };
        let tmp = self.path.with_extension("json.tmp");
        let file = fs::File::create(&tmp)?;
        serde_json::to_writer_pretty(file, &doc)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&RequestMap) -> T) -> Result<T> {
        let _local = lock_local(&self.local)?;
        let lock = self.lock_file()?;
        let _shared = lock.read()?;
        Ok(f(&self.load()?))
    }

    /// Load, mutate, write back, all under the exclusive lock. `f` returning
    /// `false` means nothing changed and nothing is written.
    fn update<T>(&self, f: impl FnOnce(&mut RequestMap) -> Result<(bool, T)>) -> Result<T> {
        let _local = lock_local(&self.local)?;
        let mut lock = self.lock_file()?;
        let _exclusive = lock.write()?;
        let mut map = self.load()?;
        let (changed, out) = f(&mut map)?;
        if changed {
            self.persist(&map)?;
        }
        Ok(out)
    }
}

fn lock_local(m: &Mutex<()>) -> Result<MutexGuard<'_, ()>> {
    m.lock()
        .map_err(|_| RoomwatchError::storage_error("lock", "registry mutex poisoned"))
}

impl Registry for FileRegistry {
    fn add(&self, request: MonitoringRequest) -> Result<()> {
        self.update(|map| insert(map, request).map(|()| (true, ())))
    }

    fn deactivate(&self, id: &RequestId, reason: Deactivation) -> Result<bool> {
        self.update(|map| {
            let flipped = flip(map, id, reason).is_some();
            Ok((flipped, flipped))
        })
    }

    fn get(&self, id: &RequestId) -> Result<Option<MonitoringRequest>> {
        self.read(|map| map.get(id).cloned())
    }

    fn list_active(&self) -> Result<Vec<MonitoringRequest>> {
        self.read(active)
    }

    fn list_by_owner(&self, owner: &Owner) -> Result<Vec<MonitoringRequest>> {
        self.read(|map| by_owner(map, owner))
    }

    fn list_all(&self) -> Result<Vec<MonitoringRequest>> {
        self.read(|map| sorted(map.values()))
    }
}
