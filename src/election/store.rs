// Record stores for elections.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::{debug, info};
use snafu::{ensure, OptionExt, ResultExt};

use crate::election::*;

/// Persistence of elections.
///
/// Updates of an election must be serialized: `update_election` is a read-modify-write that
/// must not interleave with another update of the same election. All the checks that depend on
/// the stored election belong in the closure.
pub trait ElectionStore {
    fn get_election(&self, id: &str) -> ElectionResult<Option<Election>>;

    fn get_all_elections(&self) -> ElectionResult<Vec<Election>>;

    fn create_election(&self, election: &Election) -> ElectionResult<()>;

    /// Applies `f` to the stored election and saves it. Nothing is saved if `f` fails.
    fn update_election(
        &self,
        id: &str,
        f: &mut dyn FnMut(&mut Election) -> ElectionResult<()>,
    ) -> ElectionResult<Election>;
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding the lock leaves the data as it was before the update.
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    elections: Mutex<HashMap<String, Election>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl ElectionStore for MemoryStore {
    fn get_election(&self, id: &str) -> ElectionResult<Option<Election>> {
        Ok(lock(&self.elections).get(id).cloned())
    }

    fn get_all_elections(&self) -> ElectionResult<Vec<Election>> {
        let mut res: Vec<Election> = lock(&self.elections).values().cloned().collect();
        res.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(res)
    }

    fn create_election(&self, election: &Election) -> ElectionResult<()> {
        let mut elections = lock(&self.elections);
        ensure!(
            !elections.contains_key(&election.id),
            AlreadyExistsSnafu {
                what: "Election",
                id: election.id.clone()
            }
        );
        elections.insert(election.id.clone(), election.clone());
        Ok(())
    }

    fn update_election(
        &self,
        id: &str,
        f: &mut dyn FnMut(&mut Election) -> ElectionResult<()>,
    ) -> ElectionResult<Election> {
        let mut elections = lock(&self.elections);
        let stored = elections.get_mut(id).context(NotFoundSnafu { id })?;
        let mut updated = stored.clone();
        f(&mut updated)?;
        *stored = updated.clone();
        Ok(updated)
    }
}

/// One pretty-printed JSON file per election, named `<id>.json`, in a directory.
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    // Serializes the read-modify-write cycles of this process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(root: &Path) -> JsonFileStore {
        JsonFileStore {
            root: root.to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn path_for(&self, id: &str) -> ElectionResult<PathBuf> {
        ensure!(
            !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'),
            NotFoundSnafu { id }
        );
        Ok(self.root.join(format!("{}.json", id)))
    }

    fn read(path: &Path) -> ElectionResult<Election> {
        let p = path.display().to_string();
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path: p })?;
        serde_json::from_str(&contents).context(ParsingJsonSnafu {})
    }

    fn write(&self, path: &Path, election: &Election) -> ElectionResult<()> {
        let p = path.display().to_string();
        fs::create_dir_all(&self.root).context(WritingJsonSnafu {
            path: self.root.display().to_string(),
        })?;
        let js = serde_json::to_string_pretty(election).context(ParsingJsonSnafu {})?;
        fs::write(path, js).context(WritingJsonSnafu { path: p })?;
        debug!("JsonFileStore: wrote {:?}", path);
        Ok(())
    }
}

impl ElectionStore for JsonFileStore {
    fn get_election(&self, id: &str) -> ElectionResult<Option<Election>> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Ok(None);
        }
        JsonFileStore::read(&path).map(Some)
    }

    fn get_all_elections(&self) -> ElectionResult<Vec<Election>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.root).context(OpeningJsonSnafu {
            path: self.root.display().to_string(),
        })?;
        let mut res: Vec<Election> = Vec::new();
        for entry in entries {
            let entry = entry.context(OpeningJsonSnafu {
                path: self.root.display().to_string(),
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                res.push(JsonFileStore::read(&path)?);
            }
        }
        res.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(res)
    }

    fn create_election(&self, election: &Election) -> ElectionResult<()> {
        let _guard = lock(&self.write_lock);
        let path = self.path_for(&election.id)?;
        ensure!(
            !path.exists(),
            AlreadyExistsSnafu {
                what: "Election",
                id: election.id.clone()
            }
        );
        info!("Creating election {} in {:?}", election.id, path);
        self.write(&path, election)
    }

    fn update_election(
        &self,
        id: &str,
        f: &mut dyn FnMut(&mut Election) -> ElectionResult<()>,
    ) -> ElectionResult<Election> {
        let _guard = lock(&self.write_lock);
        let path = self.path_for(id)?;
        ensure!(path.exists(), NotFoundSnafu { id });
        let mut election = JsonFileStore::read(&path)?;
        f(&mut election)?;
        self.write(&path, &election)?;
        Ok(election)
    }
}
