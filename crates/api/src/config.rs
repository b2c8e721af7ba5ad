use anyhow::{Context, Result};
use auth::GuardrailPolicies;
use cloud::CloudConfig;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use safety::ModerationConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::demos::classifier::RaceGroup;

pub const DEFAULT_CONFIG_FILE: &str = "dashboards.toml";
pub const ENV_PREFIX: &str = "DASHBOARDS_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cloud: CloudConfig,
    pub underwriting: UnderwritingConfig,
    pub healthcare: GuardedDemoConfig,
    pub investment: GuardedDemoConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderwritingConfig {
    /// The workflow runs in its own region
    pub region: Option<String>,
    pub bucket: String,
    pub prefix: Option<String>,
    pub state_machine_arn: String,
    pub poll_interval_ms: u64,
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardedDemoConfig {
    /// Word used in the grounding prompt ("Based on the following {domain} data")
    pub domain: String,
    pub bucket: String,
    pub dataset_key: String,
    pub model_id: String,
    pub max_tokens: u32,
    pub guardrails: GuardrailPolicies,
    /// Show every toxicity category instead of the default four
    pub all_toxicity_categories: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub endpoint_arn: String,
    pub enrichment_function: Option<String>,
    pub privileged_race_group: RaceGroup,
    pub moderation: ModerationConfig,
}

const HAIKU: &str = "anthropic.claude-3-haiku-20240307-v1:0";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind: "0.0.0.0:3000".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
            cloud: CloudConfig::default(),
            underwriting: UnderwritingConfig {
                region: Some("us-east-1".to_string()),
                bucket: "underwriting-document-bucket-101".to_string(),
                prefix: None,
                state_machine_arn:
                    "arn:aws:states:us-east-1:913524913171:stateMachine:UnderwritingValidationStateMachine"
                        .to_string(),
                poll_interval_ms: 2000,
                allowed_extensions: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            },
            healthcare: GuardedDemoConfig {
                domain: "healthcare".to_string(),
                bucket: "healthcare-guardrail-data".to_string(),
                dataset_key: "Unique_Healthcare_Data_200.txt".to_string(),
                model_id: HAIKU.to_string(),
                max_tokens: extract::DEFAULT_MAX_TOKENS,
                guardrails: GuardrailPolicies::new("DRAFT")
                    .with_group("Doctor", "p3lgqv4onhcc")
                    .with_group("Admin", "yi3w386mp288")
                    .with_group("Nurse", "wdc8660lsw70"),
                all_toxicity_categories: false,
            },
            investment: GuardedDemoConfig {
                domain: "financial".to_string(),
                bucket: "finance-guardrail-data".to_string(),
                dataset_key: "Investment_Data.txt".to_string(),
                model_id: HAIKU.to_string(),
                max_tokens: extract::DEFAULT_MAX_TOKENS,
                guardrails: GuardrailPolicies::new("DRAFT"),
                all_toxicity_categories: false,
            },
            classifier: ClassifierConfig {
                endpoint_arn: "arn:aws:comprehend:us-west-2:913524913171:document-classifier-endpoint/medical-specialty-classifier-endpoint".to_string(),
                enrichment_function: Some(
                    "Enriched-Comprehend-Medical-CallCMandCustomCode-CTKtvFTHo2KT".to_string(),
                ),
                privileged_race_group: RaceGroup::White,
                moderation: ModerationConfig::default(),
            },
        }
    }
}

impl AppConfig {
    /// Defaults, then the TOML file (if present), then `DASHBOARDS_*` env vars
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let path = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        if path.exists() {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            anyhow::ensure!(path.exists(), "config file {} not found", path.display());
        }
        Self::figment(path)
            .extract()
            .context("Failed to load configuration")
    }

    /// Cloud settings for the underwriting workflow's region
    pub fn underwriting_cloud(&self) -> CloudConfig {
        let mut cloud = self.cloud.clone();
        if let Some(region) = &self.underwriting.region {
            cloud.region = region.clone();
        }
        cloud
    }
}
