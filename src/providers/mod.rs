/*!
 * Translation backends: descriptors, families and the transport seam.
 *
 * This module describes the interchangeable language-model backends the
 * router can send a translation to:
 * - `BackendFamily`: closed set of capability classes, each with its own
 *   prompt/response strategy (see `strategy`)
 * - `BackendDescriptor`: one concrete backend, owned by the catalog
 * - `BackendTransport`: the network seam, implemented outside the core
 * - `catalog`: the read-only Provider Catalog
 * - `mock`: scripted transport for tests and dry runs
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Debug};
use std::str::FromStr;

use crate::errors::{ConfigurationError, ProviderError};
use crate::language_utils::canonical_code;

pub mod catalog;
pub mod mock;
pub mod strategy;

pub use catalog::ProviderCatalog;
pub use strategy::{FamilyStrategy, PromptInput};

/// Capability class of a translation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendFamily {
    /// Anthropic Claude models
    Claude,
    /// Amazon Titan text models
    Titan,
    /// Meta Llama models
    Llama,
    /// Mistral models
    Mistral,
    /// Offline terminology dictionary
    Glossary,
}

/// Static per-family properties, indexed by the enum discriminant
struct FamilyProfile {
    name: &'static str,
    baseline_confidence: f64,
    handles_complex_domains: bool,
    strategy: &'static dyn FamilyStrategy,
}

static FAMILY_PROFILES: [FamilyProfile; 5] = [
    FamilyProfile {
        name: "claude",
        baseline_confidence: 0.95,
        handles_complex_domains: true,
        strategy: &strategy::ClaudeStrategy,
    },
    FamilyProfile {
        name: "titan",
        baseline_confidence: 0.85,
        handles_complex_domains: true,
        strategy: &strategy::TitanStrategy,
    },
    FamilyProfile {
        name: "llama",
        baseline_confidence: 0.85,
        handles_complex_domains: false,
        strategy: &strategy::LlamaStrategy,
    },
    FamilyProfile {
        name: "mistral",
        baseline_confidence: 0.80,
        handles_complex_domains: false,
        strategy: &strategy::MistralStrategy,
    },
    FamilyProfile {
        name: "glossary",
        baseline_confidence: 0.70,
        handles_complex_domains: false,
        strategy: &strategy::GlossaryStrategy,
    },
];

impl BackendFamily {
    /// Every family, in default preference order
    pub const ALL: [BackendFamily; 5] = [
        BackendFamily::Claude,
        BackendFamily::Titan,
        BackendFamily::Llama,
        BackendFamily::Mistral,
        BackendFamily::Glossary,
    ];

    fn profile(&self) -> &'static FamilyProfile {
        &FAMILY_PROFILES[*self as usize]
    }

    /// Lowercase identifier used in configuration
    pub fn as_str(&self) -> &'static str {
        self.profile().name
    }

    /// Prior confidence in this family's output before any signal is applied
    pub fn baseline_confidence(&self) -> f64 {
        self.profile().baseline_confidence
    }

    /// Whether the family keeps its accuracy on high-complexity domains
    pub fn handles_complex_domains(&self) -> bool {
        self.profile().handles_complex_domains
    }

    /// Prompt construction and response parsing for this family
    pub fn strategy(&self) -> &'static dyn FamilyStrategy {
        self.profile().strategy
    }
}

impl fmt::Display for BackendFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendFamily {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        BackendFamily::ALL
            .into_iter()
            .find(|family| family.as_str() == wanted)
            .ok_or_else(|| ConfigurationError::UnknownFamily(s.to_string()))
    }
}

/// Relative price class of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CostTier {
    Economy,
    #[default]
    Standard,
    Premium,
}

impl CostTier {
    /// Nominal cost units per thousand source characters
    pub fn relative_cost(&self) -> f64 {
        match self {
            CostTier::Economy => 0.2,
            CostTier::Standard => 1.0,
            CostTier::Premium => 3.0,
        }
    }
}

/// Immutable description of one translation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    /// Unique backend identifier (e.g. "claude-3-sonnet")
    pub id: String,

    /// Capability class
    pub family: BackendFamily,

    /// Supported language codes
    #[serde(default)]
    pub languages: BTreeSet<String>,

    /// Maximum prompt tokens accepted
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: u32,

    /// Maximum tokens generated per call
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Price class
    #[serde(default)]
    pub cost_tier: CostTier,
}

fn default_max_input_tokens() -> u32 {
    8192
}

fn default_max_output_tokens() -> u32 {
    2048
}

impl BackendDescriptor {
    /// Create a descriptor with default token limits
    pub fn new(id: &str, family: BackendFamily, languages: &[&str], cost_tier: CostTier) -> Self {
        Self {
            id: id.to_string(),
            family,
            languages: languages.iter().map(|code| canonical_code(code)).collect(),
            max_input_tokens: default_max_input_tokens(),
            max_output_tokens: default_max_output_tokens(),
            cost_tier,
        }
    }

    /// Override the token limits
    pub fn with_token_limits(mut self, max_input_tokens: u32, max_output_tokens: u32) -> Self {
        self.max_input_tokens = max_input_tokens;
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Rewrite every language code into canonical form
    pub(crate) fn canonicalized(mut self) -> Self {
        self.languages = self.languages.iter().map(|code| canonical_code(code)).collect();
        self
    }

    /// Whether the backend covers this language
    pub fn supports_language(&self, code: &str) -> bool {
        self.languages.contains(&canonical_code(code))
    }

    /// Whether the backend covers both sides of a language pair
    pub fn supports_pair(&self, source_language: &str, target_language: &str) -> bool {
        self.supports_language(source_language) && self.supports_language(target_language)
    }
}

/// Network seam to the actual backends.
///
/// The router never opens connections itself; the request-handling layer
/// injects an implementation that posts the family-specific body and
/// returns the decoded JSON response.
#[async_trait]
pub trait BackendTransport: Send + Sync + Debug {
    /// Send one request body to a backend
    ///
    /// # Arguments
    /// * `backend` - The backend to call
    /// * `body` - The request body built by the backend's family strategy
    ///
    /// # Returns
    /// * `Result<serde_json::Value, ProviderError>` - The raw response body or an error
    async fn send(
        &self,
        backend: &BackendDescriptor,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backendFamily_fromStr_shouldRoundTripNames() {
        for family in BackendFamily::ALL {
            assert_eq!(family.as_str().parse::<BackendFamily>().unwrap(), family);
        }
        assert_eq!(" Claude ".parse::<BackendFamily>().unwrap(), BackendFamily::Claude);
    }

    #[test]
    fn test_backendFamily_fromStr_withUnknown_shouldFail() {
        let result = "gpt".parse::<BackendFamily>();
        assert_eq!(result, Err(ConfigurationError::UnknownFamily("gpt".to_string())));
    }

    #[test]
    fn test_backendFamily_priors_shouldRankClaudeHighestAndGlossaryLowest() {
        assert_eq!(BackendFamily::Claude.baseline_confidence(), 0.95);
        assert_eq!(BackendFamily::Glossary.baseline_confidence(), 0.70);
        assert!(BackendFamily::Claude.handles_complex_domains());
        assert!(!BackendFamily::Mistral.handles_complex_domains());
    }

    #[test]
    fn test_descriptor_supportsPair_shouldCompareCanonicalCodes() {
        let backend = BackendDescriptor::new("glossary-offline", BackendFamily::Glossary, &["eng", "spa"], CostTier::Economy);
        assert!(backend.supports_pair("en", "es"));
        assert!(backend.supports_pair("ENG", "spa"));
        assert!(!backend.supports_pair("en", "fr"));
    }

    #[test]
    fn test_descriptor_deserialize_shouldApplyDefaults() {
        let json = r#"{"id": "llama-3-70b", "family": "llama", "languages": ["en", "ru"]}"#;
        let backend: BackendDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(backend.max_input_tokens, 8192);
        assert_eq!(backend.max_output_tokens, 2048);
        assert_eq!(backend.cost_tier, CostTier::Standard);
    }

    #[test]
    fn test_costTier_ordering_shouldPutEconomyFirst() {
        assert!(CostTier::Economy < CostTier::Standard);
        assert!(CostTier::Standard < CostTier::Premium);
        assert!(CostTier::Economy.relative_cost() < CostTier::Premium.relative_cost());
    }
}
