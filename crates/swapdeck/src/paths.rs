use crate::config::CONFIG_FILE_NAME;
use directories::ProjectDirs;
use eyre::{Context as _, ContextCompat as _};
use std::path::PathBuf;

pub const LOG_FILE_NAME: &str = "swapdeck.log.jsonl";

#[derive(Debug, Clone)]
pub struct SwapdeckPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
}

impl SwapdeckPaths {
    pub fn discover() -> eyre::Result<Self> {
        // Test/CI override knobs.
        if let (Ok(data_dir), Ok(config_dir)) = (
            std::env::var("SWAPDECK_DATA_DIR"),
            std::env::var("SWAPDECK_CONFIG_DIR"),
        ) {
            return Ok(Self::at(PathBuf::from(config_dir), PathBuf::from(data_dir)));
        }

        // Linux: ~/.config/swapdeck, macOS: ~/Library/Application Support/swapdeck
        let proj =
            ProjectDirs::from("", "", "swapdeck").context("failed to resolve project dirs")?;
        Ok(Self::at(
            proj.config_dir().to_path_buf(),
            proj.data_dir().to_path_buf(),
        ))
    }

    fn at(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        let log_file = data_dir.join(LOG_FILE_NAME);
        Self {
            config_dir,
            data_dir,
            log_file,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    pub fn ensure_data_dir(&self) -> eyre::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("create dir {}", self.data_dir.display()))
    }
}
