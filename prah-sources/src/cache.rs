//! Session source backed by an on-disk cache of session dumps
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/<year>/schedule.json
//! <root>/<year>/<round:02>/<session code>.json
//! <root>/<year>/<round:02>/<session code>.json.zst
//! ```
//!
//! Dumps are written by an external fetcher; this source only reads them.

use prah_core::model::{EventInfo, Session};
use prah_core::{LoadOptions, SessionKind, SessionSource, SourceError};
use serde::de::DeserializeOwned;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct FileCacheSource {
    root: PathBuf,
}

impl FileCacheSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn schedule_path(&self, year: i32) -> PathBuf {
        self.root.join(year.to_string()).join("schedule.json")
    }

    fn session_dir(&self, year: i32, round: u32) -> PathBuf {
        self.root.join(year.to_string()).join(format!("{:02}", round))
    }

    /// Locate the dump for a session, preferring the uncompressed file
    fn session_file(&self, year: i32, round: u32, kind: SessionKind) -> Option<PathBuf> {
        let dir = self.session_dir(year, round);
        let plain = dir.join(format!("{}.json", kind.code()));
        let packed = dir.join(format!("{}.json.zst", kind.code()));
        [plain, packed].into_iter().find(|p| p.is_file())
    }
}

/// Read and decode a JSON document, transparently inflating `.zst` files
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SourceError> {
    let raw = fs::read(path).map_err(|e| SourceError::io(path, e))?;
    let bytes = if path.extension().is_some_and(|ext| ext == "zst") {
        zstd::decode_all(raw.as_slice()).map_err(|e| SourceError::io(path, e))?
    } else {
        raw
    };
    serde_json::from_slice(&bytes).map_err(|e| SourceError::decode(path, e))
}

impl SessionSource for FileCacheSource {
    fn name(&self) -> &str {
        "Cache"
    }

    fn event_schedule(&self, year: i32) -> Result<Vec<EventInfo>, SourceError> {
        let path = self.schedule_path(year);
        let mut events: Vec<EventInfo> = match read_json(&path) {
            Ok(events) => events,
            Err(SourceError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                return Err(SourceError::ScheduleUnavailable { year });
            }
            Err(e) => return Err(e),
        };
        events.sort_by_key(|e| e.round_number);
        debug!("Loaded {} events for {} from {}", events.len(), year, path.display());
        Ok(events)
    }

    fn load_session(
        &self,
        year: i32,
        event: &str,
        kind: SessionKind,
        options: LoadOptions,
    ) -> Result<Session, SourceError> {
        let event = self.find_event(year, event)?;
        let path = self
            .session_file(year, event.round_number, kind)
            .ok_or_else(|| SourceError::SessionUnavailable {
                year,
                round: event.round_number,
                session: kind.to_string(),
            })?;

        let mut session: Session = read_json(&path)?;
        if session.year == 0 {
            session.year = year;
        }
        if session.name.is_empty() {
            session.name = kind.display_name().to_string();
        }
        if session.event.is_none() {
            session.event = Some(event);
        }
        options.apply(&mut session);

        info!(
            "Loaded {} {} from {} ({} drivers)",
            year,
            session.name,
            path.display(),
            session.drivers.len()
        );
        Ok(session)
    }
}
