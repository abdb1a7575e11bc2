//! Board specific configuration of the EC driver
//!
//! On a real board these values come from the platform description. They can
//! be given as a TOML file with a `[cros_ec]` table:
//!
//! ```toml
//! [cros_ec]
//! max_packet_size = 256
//! optimise_flash_write = true
//! flash_erase_value = 0xff
//! ```

use serde::Deserialize;

use crate::chromium_ec::protocol::{EC_LPC_HOST_PACKET_SIZE, MSG_BYTES};

/// Maximum time to wait for a command that the EC reported as in progress
pub const CROS_EC_CMD_TIMEOUT_MS: u64 = 5000;
/// Maximum time to wait for the EC to finish hashing an image
pub const CROS_EC_CMD_HASH_TIMEOUT_MS: u64 = 2000;
/// Delay between two polls of a busy EC
pub const CROS_EC_POLL_INTERVAL_US: u64 = 50_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CrosEcConfig {
    /// Largest packet (header included) the bus can move in one go.
    /// Clamped to the size of the device buffers.
    pub max_packet_size: usize,
    /// Don't rewrite flash chunks that already hold the requested data
    pub optimise_flash_write: bool,
    /// Byte value of erased flash. Usually 0xff but some parts erase to 0.
    /// `None` if not known.
    pub flash_erase_value: Option<u8>,
    pub command_timeout_ms: u64,
    pub hash_timeout_ms: u64,
    pub poll_interval_us: u64,
}

impl Default for CrosEcConfig {
    fn default() -> Self {
        CrosEcConfig {
            max_packet_size: EC_LPC_HOST_PACKET_SIZE as usize,
            optimise_flash_write: false,
            flash_erase_value: Some(0xff),
            command_timeout_ms: CROS_EC_CMD_TIMEOUT_MS,
            hash_timeout_ms: CROS_EC_CMD_HASH_TIMEOUT_MS,
            poll_interval_us: CROS_EC_POLL_INTERVAL_US,
        }
    }
}

impl CrosEcConfig {
    /// Packet size actually usable with the driver's buffers
    pub fn packet_size(&self) -> usize {
        if self.max_packet_size > MSG_BYTES {
            warn!(
                "max_packet_size {} exceeds buffer size, using {}",
                self.max_packet_size, MSG_BYTES
            );
            MSG_BYTES
        } else {
            self.max_packet_size
        }
    }
}

#[cfg(feature = "std")]
#[derive(Debug, Deserialize)]
struct Config {
    cros_ec: Option<CrosEcConfig>,
}

/// Parse a board configuration. A missing `[cros_ec]` table gives the defaults.
#[cfg(feature = "std")]
pub fn parse_config(toml_str: &str) -> Result<CrosEcConfig, toml::de::Error> {
    let decoded: Config = toml::from_str(toml_str)?;
    debug!("{:?}", decoded);
    Ok(decoded.cros_ec.unwrap_or_default())
}

#[cfg(feature = "std")]
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

#[cfg(feature = "std")]
impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "Failed to read config: {}", err),
            ConfigError::Parse(err) => write!(f, "Failed to parse config: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> Result<CrosEcConfig, ConfigError> {
    let toml_str = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&toml_str).map_err(ConfigError::Parse)
}
