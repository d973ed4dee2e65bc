//! Configuration resolution for menulens-scan
//!
//! Every setting resolves ENV → TOML → compiled default. Resolution is done
//! once at startup; the resulting [`ScanConfig`] is immutable.

use crate::providers::{EnrichmentKind, ExtractionKind};
use menulens_common::config::TomlConfig;
use std::time::Duration;
use tracing::{info, warn};

pub const ENV_PHASE1_PROVIDER: &str = "SCAN_PHASE1_PROVIDER";
pub const ENV_ENRICHMENT_PROVIDER: &str = "SCAN_ENRICHMENT_PROVIDER";
pub const ENV_LAZY_ENRICHMENT: &str = "SCAN_LAZY_ENRICHMENT";
pub const ENV_BATCH_SIZE: &str = "SCAN_BATCH_SIZE";
pub const ENV_STAGGER_MS: &str = "SCAN_STAGGER_MS";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_GROQ_API_KEY: &str = "GROQ_API_KEY";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_CLOUD_VISION_API_KEY: &str = "GOOGLE_CLOUD_VISION_API_KEY";
pub const ENV_CACHE_URL: &str = "MENULENS_CACHE_URL";
pub const ENV_ROOT_FOLDER: &str = "MENULENS_ROOT_FOLDER";

pub const DEFAULT_BATCH_SIZE: usize = 4;
pub const DEFAULT_STAGGER_MS: u64 = 150;
pub const DEFAULT_CACHE_TTL_DAYS: u32 = 7;

/// Backend credentials; `None` means the backend is unavailable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderCredentials {
    pub openai: Option<String>,
    pub groq: Option<String>,
    pub gemini: Option<String>,
    pub cloud_vision: Option<String>,
}

/// Offline cache settings
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Base URL of per-cuisine snapshots; `None` disables refresh
    pub snapshot_base_url: Option<String>,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_base_url: None,
            ttl: days(DEFAULT_CACHE_TTL_DAYS),
        }
    }
}

/// Resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub extraction: ExtractionKind,
    pub enrichment: EnrichmentKind,
    /// Card-tier streaming with on-demand detail
    pub lazy_enrichment: bool,
    pub batch_size: usize,
    pub stagger: Duration,
    pub credentials: ProviderCredentials,
    pub cache: CacheConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionKind::DEFAULT,
            enrichment: EnrichmentKind::DEFAULT,
            lazy_enrichment: true,
            batch_size: DEFAULT_BATCH_SIZE,
            stagger: Duration::from_millis(DEFAULT_STAGGER_MS),
            credentials: ProviderCredentials::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Resolve from the process environment and TOML config
    pub fn resolve(toml_config: &TomlConfig) -> Self {
        Self::resolve_with(toml_config, |name| std::env::var(name).ok())
    }

    /// Resolve with an explicit environment lookup
    pub fn resolve_with<F>(toml_config: &TomlConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|v| is_valid_key(v));
        let scan = &toml_config.scan;
        let keys = &toml_config.providers;

        let extraction = ExtractionKind::resolve(
            env(ENV_PHASE1_PROVIDER)
                .or_else(|| scan.extraction_provider.clone())
                .as_deref(),
        );
        let enrichment = EnrichmentKind::resolve(
            env(ENV_ENRICHMENT_PROVIDER)
                .or_else(|| scan.enrichment_provider.clone())
                .as_deref(),
        );

        // Only the literal "false" turns lazy enrichment off
        let lazy_enrichment = match env(ENV_LAZY_ENRICHMENT) {
            Some(value) => value.trim() != "false",
            None => scan.lazy_enrichment.unwrap_or(true),
        };

        let batch_size = parse_setting::<usize>(ENV_BATCH_SIZE, env(ENV_BATCH_SIZE))
            .or(scan.batch_size)
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_BATCH_SIZE);

        let stagger_ms = parse_setting::<u64>(ENV_STAGGER_MS, env(ENV_STAGGER_MS))
            .or(scan.stagger_ms)
            .unwrap_or(DEFAULT_STAGGER_MS);

        let credentials = ProviderCredentials {
            openai: env(ENV_OPENAI_API_KEY).or_else(|| valid(&keys.openai_api_key)),
            groq: env(ENV_GROQ_API_KEY).or_else(|| valid(&keys.groq_api_key)),
            gemini: env(ENV_GEMINI_API_KEY).or_else(|| valid(&keys.gemini_api_key)),
            cloud_vision: env(ENV_CLOUD_VISION_API_KEY)
                .or_else(|| valid(&keys.cloud_vision_api_key)),
        };

        let cache = CacheConfig {
            snapshot_base_url: env(ENV_CACHE_URL)
                .or_else(|| valid(&toml_config.cache.snapshot_base_url))
                .map(|url| url.trim_end_matches('/').to_string()),
            ttl: days(toml_config.cache.ttl_days.unwrap_or(DEFAULT_CACHE_TTL_DAYS)),
        };

        let config = Self {
            extraction,
            enrichment,
            lazy_enrichment,
            batch_size,
            stagger: Duration::from_millis(stagger_ms),
            credentials,
            cache,
        };
        config.log_summary();
        config
    }

    fn log_summary(&self) {
        info!(
            extraction = %self.extraction,
            enrichment = %self.enrichment,
            lazy_enrichment = self.lazy_enrichment,
            batch_size = self.batch_size,
            stagger_ms = self.stagger.as_millis() as u64,
            "Scan configuration resolved"
        );

        let creds = &self.credentials;
        let missing: Vec<&str> = [
            ("openai", creds.openai.is_none()),
            ("groq", creds.groq.is_none()),
            ("gemini", creds.gemini.is_none()),
            ("cloud-vision", creds.cloud_vision.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect();
        if !missing.is_empty() {
            warn!(
                "No API key for: {}. Those providers will be skipped by the fallback chains.",
                missing.join(", ")
            );
        }
    }
}

/// Non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn valid(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| is_valid_key(v)).cloned()
}

fn parse_setting<T: std::str::FromStr>(name: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a number", name, raw);
            None
        }
    }
}

fn days(n: u32) -> Duration {
    Duration::from_secs(u64::from(n) * 24 * 60 * 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use menulens_common::config::{CacheSection, ProviderKeys, ScanSection};
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_configured() {
        let config = ScanConfig::resolve_with(&TomlConfig::default(), env_from(&[]));
        assert_eq!(config, ScanConfig::default());
    }

    #[test]
    fn test_env_beats_toml() {
        let toml = TomlConfig {
            scan: ScanSection {
                extraction_provider: Some("gpt-vision".into()),
                batch_size: Some(6),
                stagger_ms: Some(40),
                ..Default::default()
            },
            providers: ProviderKeys {
                groq_api_key: Some("toml-groq".into()),
                openai_api_key: Some("toml-openai".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let env = env_from(&[
            (ENV_PHASE1_PROVIDER, "cloud-vision-groq"),
            (ENV_BATCH_SIZE, "3"),
            (ENV_GROQ_API_KEY, "env-groq"),
        ]);

        let config = ScanConfig::resolve_with(&toml, env);

        assert_eq!(config.extraction, ExtractionKind::CloudVisionGroq);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.stagger, Duration::from_millis(40));
        assert_eq!(config.credentials.groq.as_deref(), Some("env-groq"));
        assert_eq!(config.credentials.openai.as_deref(), Some("toml-openai"));
    }

    #[test]
    fn test_lazy_flag_only_disabled_by_false() {
        let toml = TomlConfig::default();
        let lazy = |value: &str| {
            ScanConfig::resolve_with(&toml, env_from(&[(ENV_LAZY_ENRICHMENT, value)]))
                .lazy_enrichment
        };

        assert!(!lazy("false"));
        assert!(lazy("0"));
        assert!(lazy("true"));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let env = env_from(&[
            (ENV_BATCH_SIZE, "many"),
            (ENV_STAGGER_MS, "-5"),
            (ENV_ENRICHMENT_PROVIDER, "claude"),
            (ENV_GEMINI_API_KEY, "   "),
        ]);

        let config = ScanConfig::resolve_with(&TomlConfig::default(), env);

        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.stagger, Duration::from_millis(DEFAULT_STAGGER_MS));
        assert_eq!(config.enrichment, EnrichmentKind::Groq);
        assert!(config.credentials.gemini.is_none());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let toml = TomlConfig {
            scan: ScanSection {
                batch_size: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = ScanConfig::resolve_with(&toml, env_from(&[]));
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_cache_settings() {
        let toml = TomlConfig {
            cache: CacheSection {
                snapshot_base_url: Some("http://localhost:3000/cache/".into()),
                ttl_days: Some(1),
            },
            ..Default::default()
        };

        let config = ScanConfig::resolve_with(&toml, env_from(&[]));

        assert_eq!(
            config.cache.snapshot_base_url.as_deref(),
            Some("http://localhost:3000/cache")
        );
        assert_eq!(config.cache.ttl, Duration::from_secs(86_400));
    }
}
