use std::error::Error;
use std::fs;
use std::path::PathBuf;

const APP_DIR: &str = "frozen-table";

pub struct AppPaths;

impl AppPaths {
    pub fn data_dir() -> Result<PathBuf, Box<dyn Error>> {
        let data_dir = dirs::data_dir()
            .ok_or("Cannot determine data directory")?
            .join(APP_DIR);

        fs::create_dir_all(&data_dir)?;
        Ok(data_dir)
    }

    pub fn config_dir() -> Result<PathBuf, Box<dyn Error>> {
        Ok(dirs::config_dir()
            .ok_or("Cannot determine config directory")?
            .join(APP_DIR))
    }

    pub fn config_file() -> Result<PathBuf, Box<dyn Error>> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Directory holding one persisted table layout per settings key
    pub fn layouts_dir() -> Result<PathBuf, Box<dyn Error>> {
        let layouts_dir = Self::data_dir()?.join("layouts");
        fs::create_dir_all(&layouts_dir)?;
        Ok(layouts_dir)
    }
}
