//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/cart.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:7340"
//!
//! [shopping_list]
//! max_write_retries = 3
//! default_quantity = "1"
//!
//! [logging]
//! level = "info"
//!
//! [user]
//! default_id = "local"
//! ```
//!
//! Only `[db]` is required. See [`load_config`] for validation rules.

use anyhow::{Context, Result};
use mealcart_core::AggregatorOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub shopping_list: ShoppingListConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub user: UserConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShoppingListConfig {
    /// Attempts per conditional entry write before reporting a conflict.
    #[serde(default = "default_max_write_retries")]
    pub max_write_retries: u32,
    #[serde(default = "default_quantity")]
    pub default_quantity: String,
}

impl Default for ShoppingListConfig {
    fn default() -> Self {
        Self {
            max_write_retries: default_max_write_retries(),
            default_quantity: default_quantity(),
        }
    }
}

fn default_max_write_retries() -> u32 {
    3
}
fn default_quantity() -> String {
    "1".to_string()
}

impl ShoppingListConfig {
    pub fn aggregator_options(&self) -> AggregatorOptions {
        AggregatorOptions {
            max_write_retries: self.max_write_retries,
            default_quantity: self.default_quantity.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct UserConfig {
    /// User key the CLI acts as unless `--user` is given.
    #[serde(default = "default_user_id")]
    pub default_id: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            default_id: default_user_id(),
        }
    }
}

fn default_user_id() -> String {
    "local".to_string()
}

impl Config {
    /// Defaults used by `cart init` when no config file exists yet.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/cart.sqlite"),
            },
            server: ServerConfig::default(),
            shopping_list: ShoppingListConfig::default(),
            logging: LoggingConfig::default(),
            user: UserConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.shopping_list.max_write_retries < 1 {
        anyhow::bail!("shopping_list.max_write_retries must be >= 1");
    }

    if config.shopping_list.default_quantity.trim().is_empty() {
        anyhow::bail!("shopping_list.default_quantity must not be empty");
    }

    if config.user.default_id.trim().is_empty() {
        anyhow::bail!("user.default_id must not be empty");
    }

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    Ok(config)
}
