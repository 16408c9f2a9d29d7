//! Configuration loader for the ZXFS tools.
//!
//! The image geometry is fixed and never read from here. The file only
//! tells the tools where the image lives and how chatty to be:
//!
//! ```ini
//! [storage]
//! image = /var/lib/zxfs/files.img
//!
//! [logging]
//! level = info
//! ```
//!
//! Both keys are optional. `--image` on the command line overrides
//! `storage.image`; `logging.level` defaults to `warn`.

use configparser::ini::Ini;
use log::LevelFilter;

use crate::error::{Result, ZxfsError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZxfsConfig {
    /// Path to the image file.
    pub image: Option<String>,

    /// Maximum level printed by the stderr logger.
    pub log_level: LevelFilter,
}

impl Default for ZxfsConfig {
    fn default() -> Self {
        Self {
            image: None,
            log_level: LevelFilter::Warn,
        }
    }
}

/// Load and parse the configuration from an INI file.
pub fn load_config(path: &str) -> Result<ZxfsConfig> {
    let mut ini = Ini::new();
    ini.load(path)
        .map_err(|e| ZxfsError::Config(format!("{}: {}", path, e)))?;
    from_ini(&ini)
}

/// Parse configuration from INI text.
pub fn parse_config(text: &str) -> Result<ZxfsConfig> {
    let mut ini = Ini::new();
    ini.read(text.to_string()).map_err(ZxfsError::Config)?;
    from_ini(&ini)
}

fn from_ini(ini: &Ini) -> Result<ZxfsConfig> {
    let image = ini
        .get("storage", "image")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let log_level = match ini.get("logging", "level") {
        Some(raw) => raw
            .trim()
            .parse::<LevelFilter>()
            .map_err(|_| ZxfsError::Config(format!("invalid logging.level `{}`", raw)))?,
        None => LevelFilter::Warn,
    };

    Ok(ZxfsConfig { image, log_level })
}
