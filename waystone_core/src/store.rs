use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use waystone_proto::PlayerId;

use crate::list::PlayerWaystoneList;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access waystone list at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse waystone list at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode waystone list: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Persistence for the authoritative per-player lists.
pub trait WaystoneStore {
    /// Players without a stored list get an empty one.
    fn get(&self, player: PlayerId) -> Result<PlayerWaystoneList, StoreError>;
    fn put(&mut self, player: PlayerId, list: &PlayerWaystoneList) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    lists: HashMap<PlayerId, PlayerWaystoneList>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list(mut self, player: PlayerId, list: PlayerWaystoneList) -> Self {
        self.lists.insert(player, list);
        self
    }

    /// Number of `put` calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl WaystoneStore for MemoryStore {
    fn get(&self, player: PlayerId) -> Result<PlayerWaystoneList, StoreError> {
        Ok(self.lists.get(&player).cloned().unwrap_or_default())
    }

    fn put(&mut self, player: PlayerId, list: &PlayerWaystoneList) -> Result<(), StoreError> {
        self.lists.insert(player, list.clone());
        self.writes += 1;
        Ok(())
    }
}

/// One `<player-uuid>.json` file per player under a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, player: PlayerId) -> PathBuf {
        self.root.join(format!("{}.json", player.0))
    }
}

impl WaystoneStore for JsonFileStore {
    fn get(&self, player: PlayerId) -> Result<PlayerWaystoneList, StoreError> {
        let path = self.path_for(player);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(PlayerWaystoneList::default())
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let stored: PlayerWaystoneList = serde_json::from_str(&contents)
            .map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?;
        // Hand-edited files may carry stale indices.
        Ok(PlayerWaystoneList::new(stored.into_entries()))
    }

    fn put(&mut self, player: PlayerId, list: &PlayerWaystoneList) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Io {
            path: self.root.clone(),
            source,
        })?;
        let path = self.path_for(player);
        let tmp = path.with_extension("json.tmp");
        let encoded = serde_json::to_string_pretty(list)?;
        fs::write(&tmp, encoded).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path, source })
    }
}
