//! JSON snapshot of the engine state inside a capability-scoped directory.
//!
//! The store only touches its own file within the opened directory. Saves
//! write a sibling temporary file and rename it over the snapshot, so a
//! crash mid-write leaves the previous snapshot intact.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use tracing::debug;

use crate::domain::PersistedState;
use crate::domain::ports::{StateStore, StateStoreError};

const DEFAULT_FILE_NAME: &str = "quickroute-state.json";

/// State store writing one JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    dir: Arc<Dir>,
    file_name: String,
}

impl JsonFileStateStore {
    /// Use `dir` with the default file name.
    pub fn new(dir: Dir) -> Self {
        Self::with_file_name(dir, DEFAULT_FILE_NAME)
    }

    /// Use `dir` with an explicit file name.
    pub fn with_file_name(dir: Dir, file_name: impl Into<String>) -> Self {
        Self {
            dir: Arc::new(dir),
            file_name: file_name.into(),
        }
    }

    /// Open `path` with ambient authority, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns [`StateStoreError::Io`] when the directory cannot be created
    /// or opened.
    pub fn open(path: &Path) -> Result<Self, StateStoreError> {
        Dir::create_ambient_dir_all(path, ambient_authority())
            .map_err(|error| io_error(path, &error))?;
        let dir = Dir::open_ambient_dir(path, ambient_authority())
            .map_err(|error| io_error(path, &error))?;
        Ok(Self::new(dir))
    }

    fn temp_file_name(&self) -> String {
        format!("{}.tmp", self.file_name)
    }
}

fn io_error(path: &Path, error: &std::io::Error) -> StateStoreError {
    StateStoreError::io(format!("{}: {error}", path.display()))
}

async fn blocking<T, F>(task: F) -> Result<T, StateStoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StateStoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|error| StateStoreError::io(format!("state store task failed: {error}")))?
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn load(&self) -> Result<Option<PersistedState>, StateStoreError> {
        let dir = Arc::clone(&self.dir);
        let file_name = self.file_name.clone();
        blocking(move || {
            let text = match dir.read_to_string(&file_name) {
                Ok(text) => text,
                Err(error) if error.kind() == ErrorKind::NotFound => {
                    debug!(file = %file_name, "no saved state");
                    return Ok(None);
                }
                Err(error) => return Err(io_error(Path::new(&file_name), &error)),
            };
            serde_json::from_str(&text)
                .map(Some)
                .map_err(|error| StateStoreError::serialization(error.to_string()))
        })
        .await
    }

    async fn save(&self, state: &PersistedState) -> Result<(), StateStoreError> {
        let json = serde_json::to_vec_pretty(state)
            .map_err(|error| StateStoreError::serialization(error.to_string()))?;
        let dir = Arc::clone(&self.dir);
        let file_name = self.file_name.clone();
        let temp_name = self.temp_file_name();
        blocking(move || {
            dir.write(&temp_name, &json)
                .map_err(|error| io_error(Path::new(&temp_name), &error))?;
            dir.rename(&temp_name, &dir, &file_name)
                .map_err(|error| io_error(Path::new(&file_name), &error))?;
            debug!(file = %file_name, bytes = json.len(), "state saved");
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    //! Round trips through a temporary directory.

    use super::*;
    use crate::domain::{Coordinate, FetchCache, FetchResult, WaypointList};
    use crate::test_support::{FixedClock, address, addresses, place};
    use mockable::Clock;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn temp_dir() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn store_in(temp: &TempDir) -> JsonFileStateStore {
        let dir = Dir::open_ambient_dir(temp.path(), ambient_authority()).expect("open temp dir");
        JsonFileStateStore::new(dir)
    }

    fn sample_state() -> PersistedState {
        let waypoints = WaypointList::from_addresses(addresses(&["A", "B"]));
        let mut cache = FetchCache::new();
        for (text, coordinate) in [("A", Coordinate::new(1.0, 2.0)), ("B", Coordinate::new(3.0, 4.0))] {
            cache.put_place(
                address(text),
                FetchResult::Success {
                    value: place(text, coordinate),
                },
            );
        }
        PersistedState::capture(&waypoints, &cache, FixedClock::reference().utc())
    }

    #[rstest]
    #[tokio::test]
    async fn missing_file_loads_as_none(temp_dir: TempDir) {
        let store = store_in(&temp_dir);
        assert_eq!(store.load().await.expect("load"), None);
    }

    #[rstest]
    #[tokio::test]
    async fn saved_state_loads_back(temp_dir: TempDir) {
        let store = store_in(&temp_dir);
        let state = sample_state();

        store.save(&state).await.expect("save");

        assert_eq!(store.load().await.expect("load"), Some(state));
        assert!(temp_dir.path().join(DEFAULT_FILE_NAME).exists());
        assert!(!temp_dir.path().join(store.temp_file_name()).exists());
    }

    #[rstest]
    #[tokio::test]
    async fn corrupt_file_is_a_serialization_error(temp_dir: TempDir) {
        let store = store_in(&temp_dir);
        store
            .dir
            .write(DEFAULT_FILE_NAME, b"{ not json")
            .expect("write corrupt file");

        let error = store.load().await.expect_err("corrupt");
        assert!(matches!(error, StateStoreError::Serialization { .. }), "{error}");
    }

    #[rstest]
    #[tokio::test]
    async fn open_creates_the_directory(temp_dir: TempDir) {
        let path = temp_dir.path().join("nested").join("state");
        let store = JsonFileStateStore::open(&path).expect("open creates dir");

        store.save(&sample_state()).await.expect("save");

        assert!(path.join(DEFAULT_FILE_NAME).exists());
    }

    #[rstest]
    #[tokio::test]
    async fn reopening_an_existing_directory_keeps_the_snapshot(temp_dir: TempDir) {
        let path = temp_dir.path().join("state");
        let state = sample_state();
        JsonFileStateStore::open(&path)
            .expect("first open")
            .save(&state)
            .await
            .expect("save");

        let reopened = JsonFileStateStore::open(&path).expect("second open");

        assert_eq!(reopened.load().await.expect("load"), Some(state));
    }
}
