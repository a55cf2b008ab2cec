//! Runtime configuration.
//!
//! Every field has a default, so an empty or partial TOML file is valid:
//!
//! ```toml
//! [decoder]
//! max_parallel_entries = 4
//! verify_crc = false
//!
//! [http]
//! timeout_secs = 10
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub decoder: DecoderConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Upper bound on entries decoded at once within one request.
    /// 0 = number of CPUs.
    pub max_parallel_entries: usize,
    /// Capacity of the event channel between decoder and caller.
    pub channel_capacity: usize,
    /// Largest decompressed entry accepted, in bytes.
    pub max_entry_bytes: u64,
    /// Check each entry's CRC-32 after inflating.
    pub verify_crc: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retry: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_parallel_entries: 0,
            channel_capacity: 64,
            max_entry_bytes: 256 * 1024 * 1024,
            verify_crc: true,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retry: 10,
        }
    }
}

impl DecoderConfig {
    /// Effective parallelism, resolving 0 to the CPU count.
    pub fn parallelism(&self) -> usize {
        match self.max_parallel_entries {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Resolve configuration: env vars → file (if given) → defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply CHUNKZIP_<SECTION>__<FIELD> overrides, looked up through `var`.
    /// Every field can be overridden; unparsable values are ignored.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        fn parsed<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
            var(key).and_then(|v| v.parse().ok())
        }

        if let Some(n) = parsed(&var, "CHUNKZIP_DECODER__MAX_PARALLEL_ENTRIES") {
            self.decoder.max_parallel_entries = n;
        }
        if let Some(n) = parsed(&var, "CHUNKZIP_DECODER__CHANNEL_CAPACITY") {
            self.decoder.channel_capacity = n;
        }
        if let Some(n) = parsed(&var, "CHUNKZIP_DECODER__MAX_ENTRY_BYTES") {
            self.decoder.max_entry_bytes = n;
        }
        if let Some(v) = var("CHUNKZIP_DECODER__VERIFY_CRC") {
            self.decoder.verify_crc = v == "true" || v == "1";
        }
        if let Some(n) = parsed(&var, "CHUNKZIP_HTTP__TIMEOUT_SECS") {
            self.http.timeout_secs = n;
        }
        if let Some(n) = parsed(&var, "CHUNKZIP_HTTP__MAX_RETRY") {
            self.http.max_retry = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.decoder.channel_capacity, 64);
        assert!(config.decoder.verify_crc);
        assert_eq!(config.http.max_retry, 10);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = Config::from_toml(
            "[decoder]\nmax_parallel_entries = 3\n\n[http]\ntimeout_secs = 5\n",
        )
        .unwrap();
        assert_eq!(config.decoder.parallelism(), 3);
        assert_eq!(config.decoder.max_entry_bytes, 256 * 1024 * 1024);
        assert_eq!(config.http.timeout_secs, 5);
        assert_eq!(config.http.max_retry, 10);
    }

    #[test]
    fn zero_parallelism_resolves_to_cpu_count() {
        assert!(DecoderConfig::default().parallelism() >= 1);
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunkzip.toml");
        std::fs::write(&path, "[decoder]\nverify_crc = false\n").unwrap();
        assert!(!Config::load(&path).unwrap().decoder.verify_crc);
        assert!(Config::load(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let mut config = Config::from_toml("[decoder]\nmax_parallel_entries = 2\n").unwrap();
        config.apply_env_overrides(|key| match key {
            "CHUNKZIP_DECODER__MAX_PARALLEL_ENTRIES" => Some("7".into()),
            "CHUNKZIP_DECODER__VERIFY_CRC" => Some("0".into()),
            "CHUNKZIP_HTTP__TIMEOUT_SECS" => Some("not a number".into()),
            _ => None,
        });
        assert_eq!(config.decoder.max_parallel_entries, 7);
        assert!(!config.decoder.verify_crc);
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(Config::from_toml("[decoder]\nchannel_capacity = \"lots\"\n").is_err());
    }

    #[test]
    fn every_field_has_an_env_override() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| {
            let value = match key {
                "CHUNKZIP_DECODER__MAX_PARALLEL_ENTRIES" => "3",
                "CHUNKZIP_DECODER__CHANNEL_CAPACITY" => "8",
                "CHUNKZIP_DECODER__MAX_ENTRY_BYTES" => "1048576",
                "CHUNKZIP_DECODER__VERIFY_CRC" => "false",
                "CHUNKZIP_HTTP__TIMEOUT_SECS" => "4",
                "CHUNKZIP_HTTP__MAX_RETRY" => "2",
                _ => return None,
            };
            Some(value.to_string())
        });
        assert_eq!(config.decoder.max_parallel_entries, 3);
        assert_eq!(config.decoder.channel_capacity, 8);
        assert_eq!(config.decoder.max_entry_bytes, 1 << 20);
        assert!(!config.decoder.verify_crc);
        assert_eq!(config.http.timeout_secs, 4);
        assert_eq!(config.http.max_retry, 2);
    }
}
