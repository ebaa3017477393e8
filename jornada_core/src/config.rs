use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use iroh::SecretKey;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

use crate::error::StartError;
use crate::storage::MIN_KEY_LEN;

static DATA_DIR_NAME: &str = "jornada";
static JORNADA_DB_NAME: &str = "jornada_db.sqlite";
static CONFIG_FILE_NAME: &str = "config.json";

// data_dir_path
// |- jornada
//    |- jornada_db.sqlite
//    |- config.json

pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 60 * 60;
pub const DEFAULT_MAX_AVATAR_BYTES: u64 = 5 * 1024 * 1024;

fn default_secret_key() -> SecretKey {
    SecretKey::generate(&mut rand::rng())
}

fn default_storage_secret() -> String {
    let bytes: [u8; 32] = rand::random();
    STANDARD.encode(bytes)
}

fn default_signed_url_ttl_secs() -> u64 {
    DEFAULT_SIGNED_URL_TTL_SECS
}

fn default_max_avatar_bytes() -> u64 {
    DEFAULT_MAX_AVATAR_BYTES
}

#[derive(Serialize, Deserialize, Debug)]
pub struct JornadaConfig {
    /// Secret key for the local node/instance.
    #[serde(default = "default_secret_key")]
    pub(crate) secret_key: SecretKey,

    /// Secret key of the bundled client endpoint (separate from node secret).
    #[serde(default = "default_secret_key")]
    pub(crate) client_secret_key: SecretKey,

    pub(crate) database_path: PathBuf,

    /// Base64 key used to sign private storage URLs.
    #[serde(default = "default_storage_secret")]
    pub(crate) storage_secret: String,

    #[serde(default = "default_signed_url_ttl_secs")]
    pub signed_url_ttl_secs: u64,

    #[serde(default = "default_max_avatar_bytes")]
    pub max_avatar_bytes: u64,
}

impl JornadaConfig {
    /// Creates a new JornadaConfig with generated secrets and the specified data directory
    fn new(data_dir: &Path) -> Self {
        JornadaConfig {
            secret_key: default_secret_key(),
            client_secret_key: default_secret_key(),
            database_path: data_dir.join(JORNADA_DB_NAME),
            storage_secret: default_storage_secret(),
            signed_url_ttl_secs: DEFAULT_SIGNED_URL_TTL_SECS,
            max_avatar_bytes: DEFAULT_MAX_AVATAR_BYTES,
        }
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// Decoded signing key for private storage URLs.
    pub(crate) fn storage_key(&self) -> Result<Vec<u8>, StartError> {
        let key = STANDARD
            .decode(self.storage_secret.as_bytes())
            .map_err(|_| StartError::InvalidConfig("storage_secret is not valid base64"))?;
        if key.len() < MIN_KEY_LEN {
            return Err(StartError::InvalidConfig(
                "storage_secret must decode to at least 16 bytes",
            ));
        }
        Ok(key)
    }
}

/// Gets the existing config or initializes a new one in the platform data directory
pub async fn get_or_init() -> Result<JornadaConfig, StartError> {
    let data_dir = dirs::data_dir().ok_or(StartError::NoDataDir)?;
    get_or_init_in(&data_dir.join(DATA_DIR_NAME)).await
}

/// Same as [`get_or_init`] but rooted at an explicit directory.
pub async fn get_or_init_in(dir: &Path) -> Result<JornadaConfig, StartError> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    fs::create_dir_all(dir).await?;

    if fs::try_exists(&config_path).await? {
        let mut file = fs::File::open(&config_path).await?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;

        let raw: serde_json::Value = serde_json::from_str(&contents)?;
        let config: JornadaConfig = serde_json::from_value(raw.clone())?;

        // fields filled from defaults (fresh keys included) must survive a restart
        if serde_json::to_value(&config)? != raw {
            write_config(&config_path, &config).await?;
            info!(path = %config_path.display(), "filled in missing config fields");
        } else {
            debug!(path = %config_path.display(), "loaded config");
        }
        Ok(config)
    } else {
        let config = JornadaConfig::new(dir);
        write_config(&config_path, &config).await?;

        info!(path = %config_path.display(), "created new config");
        Ok(config)
    }
}

async fn write_config(path: &Path, config: &JornadaConfig) -> Result<(), StartError> {
    let json = serde_json::to_string_pretty(config)?;
    let mut file = fs::File::create(path).await?;
    file.write_all(json.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
