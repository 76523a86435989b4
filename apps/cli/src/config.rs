use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vault::VaultConfig;

const DEFAULT_CONFIG_DIR: &str = "/etc/cloudblue-connector";
const CONFIG_FILE_NAME: &str = "vault.toml";

/// On-disk CLI configuration. Paths default to the conventional connector
/// layout inside the config directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    pub key_file: Option<PathBuf>,
    pub store_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub vault: VaultConfig,
    pub file: PathBuf,
    pub created: bool,
}

pub fn config_dir(override_dir: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir;
    }
    if let Ok(dir) = std::env::var("CONNECTOR_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    PathBuf::from(DEFAULT_CONFIG_DIR)
}

pub fn load_or_create(dir: &Path) -> Result<ConfigLoad, String> {
    fs::create_dir_all(dir)
        .map_err(|err| format!("create config dir {}: {}", dir.display(), err))?;
    let file = dir.join(CONFIG_FILE_NAME);

    let (config, created) = if file.exists() {
        let contents = fs::read_to_string(&file)
            .map_err(|err| format!("read config {}: {}", file.display(), err))?;
        let config: CliConfig = toml::from_str(&contents)
            .map_err(|err| format!("parse config {}: {}", file.display(), err))?;
        (config, false)
    } else {
        let config = CliConfig::default();
        let contents = toml::to_string_pretty(&config)
            .map_err(|err| format!("serialize config: {}", err))?;
        fs::write(&file, contents)
            .map_err(|err| format!("write config {}: {}", file.display(), err))?;
        (config, true)
    };

    let defaults = VaultConfig::in_dir(dir);
    let vault = VaultConfig::new(
        config.key_file.unwrap_or(defaults.key_path),
        config.store_file.unwrap_or(defaults.store_path),
    );
    Ok(ConfigLoad {
        vault,
        file,
        created,
    })
}
