use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::{env, fs, net};

/// Name of the environment variable overriding the configured UDP port,
/// handy where binding the privileged default is not possible.
pub const PORT_ENV_VAR: &str = "THESEUS_PORT";

/// Configuration values obtained parsing the configuration file.
#[derive(Debug, Serialize, Deserialize)]
pub struct Conf {
    pub log_level: log::Level,
    pub udp_server: UdpServerConf,
    pub resolver: ResolverConf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UdpServerConf {
    pub address: String,
    pub port: u16,
    pub write_timeout: u64,
    pub threads: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolverConf {
    pub exchange_timeout_ms: u64,
    pub max_retries: usize,
    pub max_depth: usize,
    pub budget_ms: u64,
    pub negative_ttl: u32,
    pub cache: CacheSection,
    pub tracker: TrackerSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheSection {
    pub ttl_cap: u64,
    pub reclaim_period: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackerSection {
    pub retry_interval_ms: u64,
}

impl Conf {
    /// Read and parse the configuration values from a file. The file must
    /// be JSON-encoded and follow the organization of the [Conf] struct.
    /// Environment overrides are applied before validation.
    pub fn from_file(path: &str) -> Result<Self, String> {
        let file_bytes = match fs::read_to_string(path) {
            Err(err) => return Err(err.to_string()),
            Ok(v) => v,
        };
        let mut conf = match serde_json::from_str::<Conf>(&file_bytes) {
            Err(err) => return Err(err.to_string()),
            Ok(conf) => conf,
        };
        conf.apply_env_overrides()?;
        match conf.validate() {
            Ok(_) => Ok(conf),
            Err(err) => Err(err),
        }
    }

    // The single environment override permitted: the UDP listening port.
    fn apply_env_overrides(&mut self) -> Result<(), String> {
        if let Ok(port) = env::var(PORT_ENV_VAR) {
            match port.parse::<u16>() {
                Ok(port) => self.udp_server.port = port,
                Err(_) => return Err(format!("invalid {} value: '{}'", PORT_ENV_VAR, port)),
            }
        }
        Ok(())
    }

    /// Validate a configuration struct against some common errors.
    fn validate(&self) -> Result<(), String> {
        // Udp server confs.
        if let Err(err) = net::IpAddr::from_str(self.udp_server.address.as_ref()) {
            return Err(format!("invalid udp address: {}", err));
        }
        if self.udp_server.write_timeout == 0 {
            return Err("invalid udp write timeout: 0 seconds".to_string());
        }
        if self.udp_server.threads == 0 {
            return Err("invalid udp threads: 0".to_string());
        }

        // Resolver confs.
        if self.resolver.exchange_timeout_ms == 0 {
            return Err("invalid 'exchange_timeout_ms' resolver param: cannot be 0".to_string());
        }
        if self.resolver.max_retries == 0 {
            return Err("invalid 'max_retries' resolver param: cannot be 0".to_string());
        }
        if self.resolver.max_depth == 0 {
            return Err("invalid 'max_depth' resolver param: cannot be 0".to_string());
        }
        if self.resolver.budget_ms == 0 {
            return Err("invalid 'budget_ms' resolver param: cannot be 0".to_string());
        }

        // Cache confs.
        if self.resolver.cache.ttl_cap == 0 {
            return Err("invalid 'ttl_cap' cache param: cannot be 0".to_string());
        }
        if self.resolver.cache.reclaim_period == 0 {
            return Err("invalid 'reclaim_period' cache param: cannot be 0".to_string());
        }

        // Tracker confs.
        if self.resolver.tracker.retry_interval_ms == 0 {
            return Err("invalid 'retry_interval_ms' tracker param: cannot be 0".to_string());
        }

        Ok(())
    }
}
