use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Preset generation volumes mapping to fixed per-entity counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Volume {
    Small,
    Medium,
    Large,
}

impl Volume {
    pub fn as_str(&self) -> &'static str {
        match self {
            Volume::Small => "small",
            Volume::Medium => "medium",
            Volume::Large => "large",
        }
    }

    pub fn counts(&self) -> VolumeCounts {
        match self {
            Volume::Small => VolumeCounts {
                organizations: 1,
                ledgers_per_org: 2,
                assets_per_ledger: 3,
                portfolios_per_ledger: 2,
                segments_per_ledger: 2,
                accounts_per_ledger: 10,
                transfers_per_account: 2,
            },
            Volume::Medium => VolumeCounts {
                organizations: 2,
                ledgers_per_org: 3,
                assets_per_ledger: 5,
                portfolios_per_ledger: 4,
                segments_per_ledger: 4,
                accounts_per_ledger: 30,
                transfers_per_account: 3,
            },
            Volume::Large => VolumeCounts {
                organizations: 3,
                ledgers_per_org: 5,
                assets_per_ledger: 8,
                portfolios_per_ledger: 6,
                segments_per_ledger: 6,
                accounts_per_ledger: 100,
                transfers_per_account: 5,
            },
        }
    }
}

/// Per-entity counts for one generation run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VolumeCounts {
    pub organizations: usize,
    pub ledgers_per_org: usize,
    pub assets_per_ledger: usize,
    pub portfolios_per_ledger: usize,
    pub segments_per_ledger: usize,
    pub accounts_per_ledger: usize,
    pub transfers_per_account: usize,
}

/// Configuration consumed by the generation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Generation volume preset.
    pub volume: Volume,
    /// Base URL of the onboarding service (organizations through accounts).
    pub onboarding_url: String,
    /// Base URL of the transaction service.
    pub transaction_url: String,
    /// Upper bound on in-flight remote calls.
    pub max_concurrency: usize,
    /// Verbose logging.
    pub debug: bool,
    /// Optional bearer token forwarded to the remote API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Seed for deterministic randomized data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            volume: Volume::Small,
            onboarding_url: "http://localhost:3000".to_string(),
            transaction_url: "http://localhost:3001".to_string(),
            max_concurrency: 10,
            debug: false,
            auth_token: None,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::InvalidConfig(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        for (name, url) in [
            ("onboarding_url", &self.onboarding_url),
            ("transaction_url", &self.transaction_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be an http(s) URL, got '{url}'"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_counts_scale_up() {
        let small = Volume::Small.counts();
        let large = Volume::Large.counts();
        assert!(large.accounts_per_ledger > small.accounts_per_ledger);
        assert!(large.organizations >= small.organizations);
    }

    #[test]
    fn config_rejects_zero_concurrency() {
        let config = GeneratorConfig {
            max_concurrency: 0,
            ..GeneratorConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn config_rejects_non_http_url() {
        let config = GeneratorConfig {
            onboarding_url: "ftp://nope".to_string(),
            ..GeneratorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
