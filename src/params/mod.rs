//! Process-wide parameters: well-known names and the runtime configurables
//! read from the environment.

use std::sync::OnceLock;
use std::time::Duration;

use log::warn;

/// Name of the leaf identifying the backend kind a configuration targets.
pub const IDENTIFIER: &str = "identifier";

/// Extensions of files written by the built-in stores.
pub mod ext {
    pub const JSONL: &str = "jsonl";
}

pub mod env {
    pub const MAX_CONCURRENT_CREATIONS: &str = "GEOPROVD_MAX_CONCURRENT_CREATIONS";
    pub const CREATION_TIMEOUT_SECS: &str = "GEOPROVD_CREATION_TIMEOUT_SECS";
}

const DEFAULT_MAX_CONCURRENT_CREATIONS: usize = 8;
const DEFAULT_CREATION_TIMEOUT_SECS: u64 = 30;

/// Tunables shared by the whole process.
#[derive(Debug, Clone)]
pub struct Configurables {
    /// Upper bound of provider instances being created at the same time
    /// during a batch bring-up.
    pub max_concurrent_creations: usize,
    /// Deadline applied to each provider creation during a batch bring-up.
    pub creation_timeout: Duration,
}

impl Default for Configurables {
    fn default() -> Self {
        Self {
            max_concurrent_creations: DEFAULT_MAX_CONCURRENT_CREATIONS,
            creation_timeout: Duration::from_secs(DEFAULT_CREATION_TIMEOUT_SECS),
        }
    }
}

impl Configurables {
    /// Reads configurables from the environment, falling back to defaults for
    /// unset or unparsable variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_concurrent_creations = read_env(env::MAX_CONCURRENT_CREATIONS)
            .filter(|v: &usize| *v > 0)
            .unwrap_or(defaults.max_concurrent_creations);

        let creation_timeout = read_env(env::CREATION_TIMEOUT_SECS)
            .map(Duration::from_secs)
            .unwrap_or(defaults.creation_timeout);

        Self {
            max_concurrent_creations,
            creation_timeout,
        }
    }
}

fn read_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("ignoring invalid value `{}` for {}", raw, key);
            None
        }
    }
}

static CONFIGURABLES: OnceLock<Configurables> = OnceLock::new();

/// Returns process configurables, reading them from the environment on first
/// access.
pub fn configurables() -> &'static Configurables {
    CONFIGURABLES.get_or_init(Configurables::from_env)
}
