/// Flat-file checkpoint store: one text file per queue, one identifier per line
use super::CheckpointStore;
use crate::errors::CheckpointError;
use crate::logger::{self, LogTag};
use crate::paths;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub struct FileCheckpointStore {
    dir: PathBuf,
    /// Known identifiers per checkpoint file; the lock also serializes appends
    known: Mutex<HashMap<PathBuf, HashSet<String>>>,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            known: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, queue: &str) -> PathBuf {
        paths::get_checkpoint_path(&self.dir, queue)
    }

    fn read_file(path: &Path) -> Result<HashSet<String>, CheckpointError> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashSet::new()),
            Err(source) => Err(CheckpointError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn append_line(&self, path: &Path, identifier: &str) -> Result<(), CheckpointError> {
        let write_err = |source| CheckpointError::Write {
            path: path.to_path_buf(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(write_err)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(write_err)?;
        writeln!(file, "{}", identifier).map_err(write_err)?;
        file.sync_data().map_err(write_err)
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self, queue: &str) -> Result<HashSet<String>, CheckpointError> {
        let path = self.path_for(queue);
        let done = Self::read_file(&path)?;

        if done.is_empty() {
            logger::info(
                LogTag::Checkpoint,
                &format!("📋 No checkpoint for '{}', starting from the beginning", queue),
            );
        } else {
            logger::info(
                LogTag::Checkpoint,
                &format!(
                    "📋 Resuming '{}': {} wallets already processed ({})",
                    queue,
                    done.len(),
                    path.display()
                ),
            );
        }

        self.known.lock().insert(path, done.clone());
        Ok(done)
    }

    fn mark_done(&self, queue: &str, identifier: &str) -> Result<bool, CheckpointError> {
        let identifier = identifier.trim();
        let path = self.path_for(queue);
        let mut known = self.known.lock();

        if !known.contains_key(&path) {
            let existing = Self::read_file(&path)?;
            known.insert(path.clone(), existing);
        }
        let done = known.entry(path.clone()).or_default();

        if done.contains(identifier) {
            logger::debug(
                LogTag::Checkpoint,
                &format!("{} already checkpointed for '{}'", identifier, queue),
            );
            return Ok(false);
        }

        self.append_line(&path, identifier)?;
        done.insert(identifier.to_string());
        Ok(true)
    }
}
