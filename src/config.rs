//! Watcher configuration
//!
//! `WatcherConfig` deserializes with per-field defaults, so an empty file, a missing
//! file or no environment at all yields the public-network defaults. Files are TOML
//! and environment variables use the `PAYMENT_WATCHER__` prefix, e.g.
//! `PAYMENT_WATCHER__HORIZON_URL`.

use config::{Config, ConfigError, Environment, File, FileFormat, Source};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const PUBLIC_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Largest page Horizon serves
pub const MAX_PAGE_SIZE: u32 = 200;

/// Stellar network, identified by its passphrase
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Network {
    #[default]
    Public,
    Testnet,
    /// Any other network, by passphrase
    Custom(String),
}

impl Network {
    pub fn passphrase(&self) -> &str {
        match self {
            Network::Public => PUBLIC_PASSPHRASE,
            Network::Testnet => TESTNET_PASSPHRASE,
            Network::Custom(passphrase) => passphrase,
        }
    }
}

impl From<String> for Network {
    fn from(value: String) -> Self {
        match value.trim() {
            "public" | "pubnet" | "mainnet" | PUBLIC_PASSPHRASE => Network::Public,
            "testnet" | TESTNET_PASSPHRASE => Network::Testnet,
            _ => Network::Custom(value),
        }
    }
}

impl From<Network> for String {
    fn from(network: Network) -> Self {
        network.to_string()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Public => write!(f, "public"),
            Network::Testnet => write!(f, "testnet"),
            Network::Custom(passphrase) => write!(f, "{}", passphrase),
        }
    }
}

/// Settings fixed for the lifetime of a watcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Horizon base URL
    pub horizon_url: String,
    /// Permit plain `http://` Horizon URLs
    pub allow_http: bool,
    /// Sent as `X-App-Name`
    pub app_name: Option<String>,
    /// Sent as `X-App-Version`
    pub app_version: Option<String>,
    /// Transactions per backfill page, clamped to `1..=200`
    pub page_size: u32,
    pub network: Network,
    /// Overrides `network` with the test network
    pub use_testnet: bool,
    /// Delay before re-entering after a transport failure
    pub reconnect_delay_ms: u64,
    /// A live stream silent for this long is treated as failed
    pub stream_idle_timeout_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            horizon_url: "https://horizon.stellar.org".to_string(),
            allow_http: false,
            app_name: None,
            app_version: None,
            page_size: 100,
            network: Network::Public,
            use_testnet: false,
            reconnect_delay_ms: 15_000,
            stream_idle_timeout_ms: 15_000,
        }
    }
}

impl WatcherConfig {
    /// Apply clamping and the testnet override.
    pub fn normalized(mut self) -> Self {
        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        if self.use_testnet {
            self.network = Network::Testnet;
        }
        self
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_idle_timeout_ms.max(1))
    }
}

/// Load configuration from an optional TOML file layered with the environment.
///
/// A missing file is not an error; the defaults apply.
pub fn load_config(path: &str) -> Result<WatcherConfig, ConfigError> {
    build_config(File::with_name(path).required(false))
}

/// Parse configuration from TOML text layered with the environment.
pub fn parse_config(toml: &str) -> Result<WatcherConfig, ConfigError> {
    build_config(File::from_str(toml, FileFormat::Toml))
}

fn build_config<S>(file: S) -> Result<WatcherConfig, ConfigError>
where
    S: Source + Send + Sync + 'static,
{
    let settings: WatcherConfig = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("PAYMENT_WATCHER")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    Ok(settings.normalized())
}
