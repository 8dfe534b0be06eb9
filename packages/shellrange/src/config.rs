use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// Two equivalent ways to configure:
//
//   config.toml:     [server]
//                    url = "https://lab.example.org"
//
//   env var:         RANGE_SERVER__URL=https://lab.example.org
//                    (double underscore = nesting into sections)
//
// The --server flag beats both.

/// Tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// Lab-server tunables (lives under `[server]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFileConfig {
    /// Base URL of the lab platform API. An `https` base makes the terminal
    /// connection use `wss`.
    #[serde(default = "default_server_url")]
    pub url: String,
}

impl Default for ServerFileConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
        }
    }
}

fn default_server_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

/// Build a figment that layers: defaults -> config.toml -> RANGE_* env vars.
pub fn load_config(data_dir: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(data_dir.join("config.toml")))
        .merge(Env::prefixed("RANGE_").split("__"))
}

/// Directory layout (not tunable via figment; derived from --data-dir).
#[derive(Clone, Debug)]
pub struct RangeConfig {
    pub data_dir: PathBuf,
}

impl RangeConfig {
    pub fn new(custom_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match custom_dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .context("could not find home directory")?
                .join(".shellrange"),
        };

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory: {data_dir:?}"))?;

        Ok(Self { data_dir })
    }

    pub fn config_toml_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }
}
