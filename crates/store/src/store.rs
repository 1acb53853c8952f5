use crate::error::StoreError;
use convoy_core::{JobRecord, PersistedState, QueuedMessage};
use parking_lot::Mutex;
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Durable, thread-safe mapping of jobs and queued messages. Every mutator
/// writes the entire state to disk, within the same critical section, before
/// returning (SPEC_FULL §4.3).
pub struct Store {
    path: PathBuf,
    state: Mutex<PersistedState>,
}

impl Store {
    /// Load state from `path`. A missing file yields a fresh, empty state; a
    /// corrupt file is a hard error the caller must decide how to handle.
    pub fn load(path: impl Into<PathBuf>, agent_id: &str) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                PersistedState::fresh(agent_id)
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// A deep copy of the current state, safe to read without observing
    /// later mutations.
    pub fn snapshot(&self) -> PersistedState {
        self.state.lock().clone()
    }

    pub fn get_job(&self, job_id: &str) -> Option<JobRecord> {
        self.state.lock().jobs.get(job_id).cloned()
    }

    pub fn get_queued_message(&self, id: &str) -> Option<QueuedMessage> {
        self.state.lock().queued_messages.get(id).cloned()
    }

    pub fn update_job(&self, job: JobRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.jobs.insert(job.job_id.to_string(), job);
        write_atomic(&self.path, &state)
    }

    pub fn remove_job(&self, job_id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.jobs.remove(job_id);
        write_atomic(&self.path, &state)
    }

    pub fn add_queued_message(&self, message: QueuedMessage) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state
            .queued_messages
            .insert(message.processed_message_id.clone(), message);
        write_atomic(&self.path, &state)
    }

    pub fn remove_queued_message(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.queued_messages.remove(id);
        write_atomic(&self.path, &state)
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_atomic(path: &Path, state: &PersistedState) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        #[cfg(unix)]
        fs::set_permissions(parent, fs::Permissions::from_mode(0o755))?;
    }

    let tmp_path = tmp_path_for(path);
    let bytes = serde_json::to_vec_pretty(state)?;
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    #[cfg(unix)]
    fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o644))?;

    fs::rename(&tmp_path, path)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
