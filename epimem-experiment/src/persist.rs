use crate::session_log::SessionLog;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("cannot write session log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize session log: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Keeps `[A-Za-z0-9-_. ]`, replaces anything else with `_`
pub fn safe_filename(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistError {
    let path = path.to_path_buf();
    move |source| PersistError::Io { path, source }
}

/// Directory of JSON session logs
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<started_at>_<subject>_<session_id>.json`
    pub fn file_name(log: &SessionLog) -> String {
        let meta = &log.session;
        let stamp = meta.started_at.to_rfc3339().replace(':', "-");
        safe_filename(&format!("{stamp}_{}_{}.json", meta.subject_id, meta.session_id))
    }

    pub fn save(&self, log: &SessionLog) -> Result<PathBuf, PersistError> {
        std::fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        let path = self.dir.join(Self::file_name(log));
        let file = File::create(&path).map_err(io_error(&path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, log)?;
        writer.flush().map_err(io_error(&path))?;

        info!(
            "Saved session {} ({} tasks, {} telemetry messages) to {}",
            log.session.session_id,
            log.tasks.len(),
            log.vr_messages.len(),
            path.display()
        );
        Ok(path)
    }
}
