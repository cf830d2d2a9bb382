//! On-disk checkpoint for `--state-file`: one JSON document per source,
//! replaced atomically by writing a temporary file and renaming it over the
//! old one.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use harvest::checkpoint::CheckpointStore;
use harvest::{Error, Result, State};

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointRecord {
    state: State,
    updated_at: DateTime<Utc>,
}

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path
            .with_extension(format!("tmp.{}", std::process::id()))
    }
}

impl CheckpointStore for JsonFileStore {
    fn load(&self) -> Result<Option<State>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: CheckpointRecord = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| {
                Error::Checkpoint(format!("failed to parse {}: {}", self.path.display(), e))
            })?;
        record.state.validate()?;
        Ok(Some(record.state))
    }

    fn save(&mut self, state: &State) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let record = CheckpointRecord {
            state: *state,
            updated_at: Utc::now(),
        };
        let temp_path = self.temp_path();
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        serde_json::to_writer_pretty(&mut writer, &record)
            .map_err(|e| Error::Checkpoint(format!("failed to write checkpoint: {}", e)))?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?
            .sync_all()?;

        fs::rename(&temp_path, &self.path)?;
        debug!(path = %self.path.display(), ?state, "checkpoint saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn state(encoded: u64) -> State {
        State {
            encoded_offset: encoded,
            converted_segment_offset: 0,
            converted_stream_offset: encoded * 2,
        }
    }

    #[test]
    fn test_missing_file_loads_nothing() -> Result<()> {
        let dir = TempDir::new()?;
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert_eq!(store.load()?, None);
        Ok(())
    }

    #[test]
    fn test_save_then_load() -> Result<()> {
        let dir = TempDir::new()?;
        let mut store = JsonFileStore::new(dir.path().join("nested/state.json"));

        store.save(&state(10))?;
        store.save(&state(42))?;
        assert_eq!(store.load()?, Some(state(42)));

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("nested"))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name() != "state.json")
            .collect();
        assert!(leftovers.is_empty());
        Ok(())
    }

    #[test]
    fn test_corrupt_file_is_an_error() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json")?;
        assert!(matches!(JsonFileStore::new(&path).load(), Err(Error::Checkpoint(_))));
        Ok(())
    }

    #[test]
    fn test_invalid_state_is_rejected_on_load() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            r#"{"state":{"encoded_offset":0,"converted_segment_offset":9,"converted_stream_offset":1},"updated_at":"2024-01-01T00:00:00Z"}"#,
        )?;
        assert!(matches!(
            JsonFileStore::new(&path).load(),
            Err(Error::InvalidState { .. })
        ));
        Ok(())
    }
}
