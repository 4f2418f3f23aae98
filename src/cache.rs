use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::config_directory;
use crate::error::{AppError, AppResult};

const CACHE_FILE_NAME: &str = "classification.json";

/// The classification a submission was filed under. Remembered across
/// invocations so the next draft starts from the last-used values, the way
/// the form keeps project, tracker and priority after a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub project_id: Option<u32>,
    pub tracker_id: Option<u32>,
    pub priority_id: Option<u32>,
}

#[derive(Debug)]
pub struct ClassificationCache {
    file_path: PathBuf,
    current: Classification,
}

impl ClassificationCache {
    pub fn load() -> AppResult<Self> {
        let dir = config_directory()?;
        Self::load_from(dir.join(CACHE_FILE_NAME))
    }

    pub fn load_from(file_path: PathBuf) -> AppResult<Self> {
        let current = match fs::read_to_string(&file_path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|err| AppError::Configuration(format!("invalid cache file: {err}")))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Classification::default(),
            Err(err) => return Err(AppError::Io(err)),
        };

        Ok(Self { file_path, current })
    }

    pub fn get(&self) -> &Classification {
        &self.current
    }

    pub fn remember(&mut self, classification: Classification) {
        self.current = classification;
    }

    pub fn save(&self) -> AppResult<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&self.current)
            .map_err(|err| AppError::Configuration(format!("failed to write cache: {err}")))?;
        fs::write(&self.file_path, data)?;
        Ok(())
    }
}
