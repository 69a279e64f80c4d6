//! Sessions started from the GUI, keyed by id.
//!
//! Holds only controllers and finished paths; workers never see it. Locks
//! are held for a map lookup at most, never across an await.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use fdl_download::{SessionController, SessionId};

use crate::error::GuiError;

struct Entry {
    controller: SessionController,
    finished: Option<PathBuf>,
}

#[derive(Default)]
pub struct SessionRegistry {
    entries: RwLock<HashMap<SessionId, Entry>>,
}

impl SessionRegistry {
    pub fn insert(&self, controller: SessionController) {
        let id = controller.id();
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Entry {
                    controller,
                    finished: None,
                },
            );
    }

    pub fn controller(&self, id: &str) -> Result<SessionController, GuiError> {
        let id = parse_id(id)?;
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(|e| e.controller.clone())
            .ok_or_else(|| not_found(id))
    }

    pub fn mark_finished(&self, id: SessionId, path: &Path) {
        if let Some(entry) = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&id)
        {
            entry.finished = Some(path.to_path_buf());
        }
    }

    /// Path of a completed download.
    pub fn finished_path(&self, id: &str) -> Result<PathBuf, GuiError> {
        let id = parse_id(id)?;
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(&id).ok_or_else(|| not_found(id))?;
        entry
            .finished
            .clone()
            .ok_or_else(|| GuiError::Conflict("download has not finished".to_string()))
    }

    /// Drop a session that reached a terminal phase.
    pub fn remove(&self, id: &str) -> Result<(), GuiError> {
        let id = parse_id(id)?;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(&id).ok_or_else(|| not_found(id))?;
        let phase = entry.controller.phase();
        if !phase.is_terminal() {
            return Err(GuiError::Conflict(format!(
                "download is still {}",
                phase.as_str()
            )));
        }
        entries.remove(&id);
        Ok(())
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }
}

fn parse_id(id: &str) -> Result<SessionId, GuiError> {
    SessionId::parse(id).ok_or_else(|| GuiError::NotFound {
        entity: "download",
        id: id.to_string(),
    })
}

fn not_found(id: SessionId) -> GuiError {
    GuiError::NotFound {
        entity: "download",
        id: id.to_string(),
    }
}
