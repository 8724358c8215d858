use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::language_utils::{canonical_code, pair_key, validate_language_code};
use crate::providers::{BackendDescriptor, BackendFamily, CostTier};
use crate::thresholds::ThresholdSet;

/// Application configuration module
/// This module handles the router configuration including loading,
/// validating and saving configuration settings.
/// Represents the router configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Every translation backend the router may use
    #[serde(default = "default_catalog")]
    pub catalog: Vec<BackendDescriptor>,

    /// Fallback chain policy
    #[serde(default)]
    pub routing: RoutingPolicy,

    /// Per-domain routing and scoring profile, keyed by lowercase domain tag
    #[serde(default = "default_domains")]
    pub domains: HashMap<String, DomainProfile>,

    /// Language groups that route to a family known to perform well for them
    #[serde(default = "default_language_groups")]
    pub language_groups: Vec<LanguageGroupRule>,

    /// Confidence threshold defaults
    #[serde(default)]
    pub thresholds: ThresholdPolicy,

    /// Translation invoker settings
    #[serde(default)]
    pub invoker: InvokerConfig,

    /// Persistence settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// How the fallback chain is built
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoutingPolicy {
    /// Whether fallbacks are appended after the primary backend
    #[serde(default = "default_true")]
    pub enable_fallback: bool,

    /// Maximum number of backends attempted per request
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Order fallbacks by cost tier, cheapest first
    #[serde(default)]
    pub cost_optimization: bool,

    /// Order fallbacks by observed performance rating
    #[serde(default)]
    pub performance_optimization: bool,

    /// Samples needed before performance ordering kicks in
    #[serde(default = "default_min_performance_samples")]
    pub min_performance_samples: usize,

    /// Primary family when no domain or language rule applies
    #[serde(default = "default_family")]
    pub default_family: BackendFamily,

    /// Fallback order when no override applies
    #[serde(default = "default_fallback_order")]
    pub default_fallback_order: Vec<BackendFamily>,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            enable_fallback: true,
            max_attempts: default_max_attempts(),
            cost_optimization: false,
            performance_optimization: false,
            min_performance_samples: default_min_performance_samples(),
            default_family: default_family(),
            default_fallback_order: default_fallback_order(),
        }
    }
}

/// Routing and scoring profile of one domain
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DomainProfile {
    /// Complexity multiplier (1.0 baseline, up to ~1.7 for the riskiest domains)
    #[serde(default = "default_complexity")]
    pub complexity: f64,

    /// Family that always takes the primary slot for this domain
    #[serde(default)]
    pub preferred_family: Option<BackendFamily>,

    /// Fallback order override
    #[serde(default)]
    pub fallback_order: Option<Vec<BackendFamily>>,

    /// Source-language terms whose loss is unacceptable
    #[serde(default)]
    pub critical_terms: Vec<String>,

    /// Base thresholds seeded for this domain
    #[serde(default)]
    pub thresholds: Option<ThresholdSet>,
}

impl DomainProfile {
    fn new(complexity: f64, preferred_family: Option<BackendFamily>) -> Self {
        Self {
            complexity,
            preferred_family,
            fallback_order: None,
            critical_terms: Vec::new(),
            thresholds: None,
        }
    }

    fn with_fallback(mut self, order: &[BackendFamily]) -> Self {
        self.fallback_order = Some(order.to_vec());
        self
    }

    fn with_critical_terms(mut self, terms: &[&str]) -> Self {
        self.critical_terms = terms.iter().map(|t| t.to_string()).collect();
        self
    }

    fn with_thresholds(mut self, high: f64, medium: f64, low: f64) -> Self {
        self.thresholds = Some(ThresholdSet::new(high, medium, low));
        self
    }
}

/// Languages sharing a script or family, routed together
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LanguageGroupRule {
    /// Group name for logging
    pub name: String,

    /// Member language codes
    pub languages: Vec<String>,

    /// Family that performs well for the group
    #[serde(default)]
    pub preferred_family: Option<BackendFamily>,

    /// Fallback order override
    #[serde(default)]
    pub fallback_order: Option<Vec<BackendFamily>>,
}

impl LanguageGroupRule {
    fn new(name: &str, languages: &[&str], preferred_family: BackendFamily, fallback_order: &[BackendFamily]) -> Self {
        Self {
            name: name.to_string(),
            languages: languages.iter().map(|l| l.to_string()).collect(),
            preferred_family: Some(preferred_family),
            fallback_order: Some(fallback_order.to_vec()),
        }
    }

    /// Whether the group contains this language
    pub fn contains(&self, code: &str) -> bool {
        let wanted = canonical_code(code);
        self.languages.iter().any(|l| canonical_code(l) == wanted)
    }
}

/// Threshold defaults
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ThresholdPolicy {
    /// Thresholds used when neither the domain nor the pair has a record
    #[serde(default = "default_global_thresholds")]
    pub global_default: ThresholdSet,

    /// Historically hard language pairs (`en-zh` form)
    #[serde(default = "default_complex_language_pairs")]
    pub complex_language_pairs: Vec<String>,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            global_default: default_global_thresholds(),
            complex_language_pairs: default_complex_language_pairs(),
        }
    }
}

/// Translation invoker configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InvokerConfig {
    /// Timeout of a single backend attempt in seconds
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: default_attempt_timeout_secs(),
        }
    }
}

/// Persistence configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// SQLite database file; the user data directory when unset
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> usize {
    3
}

fn default_min_performance_samples() -> usize {
    20
}

fn default_family() -> BackendFamily {
    BackendFamily::Claude
}

fn default_fallback_order() -> Vec<BackendFamily> {
    BackendFamily::ALL.to_vec()
}

fn default_complexity() -> f64 {
    1.0
}

fn default_attempt_timeout_secs() -> u64 {
    30
}

fn default_global_thresholds() -> ThresholdSet {
    ThresholdSet::new(0.90, 0.75, 0.60)
}

fn default_complex_language_pairs() -> Vec<String> {
    ["zh", "ja", "ko", "ar", "ru", "hi"]
        .iter()
        .flat_map(|other| [format!("en-{}", other), format!("{}-en", other)])
        .collect()
}

fn default_catalog() -> Vec<BackendDescriptor> {
    use BackendFamily::*;

    const BROAD: &[&str] = &[
        "en", "es", "fr", "de", "it", "pt", "nl", "ro", "sv", "da", "ru", "pl", "uk", "zh", "ja", "ko", "ar", "he",
        "fa", "hi", "bn", "ur", "ta",
    ];

    vec![
        BackendDescriptor::new("claude-3-sonnet", Claude, BROAD, CostTier::Premium).with_token_limits(200_000, 4096),
        BackendDescriptor::new("claude-3-haiku", Claude, BROAD, CostTier::Standard).with_token_limits(200_000, 4096),
        BackendDescriptor::new(
            "titan-text-express",
            Titan,
            &["en", "es", "fr", "de", "it", "pt", "nl", "ru", "zh", "ja", "ar", "hi"],
            CostTier::Standard,
        )
        .with_token_limits(8192, 4096),
        BackendDescriptor::new(
            "llama-3-70b",
            Llama,
            &["en", "es", "fr", "de", "it", "pt", "hi", "ru", "pl", "uk", "cs"],
            CostTier::Standard,
        ),
        BackendDescriptor::new(
            "mistral-large",
            Mistral,
            &["en", "es", "fr", "de", "it", "pt", "nl", "ro", "ca"],
            CostTier::Premium,
        )
        .with_token_limits(32_000, 4096),
        BackendDescriptor::new("mistral-7b", Mistral, &["en", "es", "fr", "de", "it"], CostTier::Economy),
        BackendDescriptor::new("glossary-offline", Glossary, &["en", "es", "fr"], CostTier::Economy)
            .with_token_limits(100_000, 100_000),
    ]
}

fn default_domains() -> HashMap<String, DomainProfile> {
    use BackendFamily::*;

    let mut domains = HashMap::new();

    domains.insert("general".to_string(), DomainProfile::new(1.0, None));
    domains.insert(
        "cardiology".to_string(),
        DomainProfile::new(1.5, Some(Claude))
            .with_fallback(&[Claude, Titan, Llama, Mistral])
            .with_critical_terms(&["heart attack", "myocardial infarction", "arrhythmia", "blood pressure"])
            .with_thresholds(0.92, 0.80, 0.65),
    );
    domains.insert(
        "neurology".to_string(),
        DomainProfile::new(1.6, Some(Claude))
            .with_critical_terms(&["stroke", "seizure", "aneurysm"])
            .with_thresholds(0.92, 0.80, 0.66),
    );
    domains.insert(
        "oncology".to_string(),
        DomainProfile::new(1.7, Some(Claude))
            .with_fallback(&[Claude, Titan, Llama])
            .with_critical_terms(&["cancer", "metastasis", "chemotherapy", "tumor"])
            .with_thresholds(0.93, 0.82, 0.68),
    );
    domains.insert(
        "emergency".to_string(),
        DomainProfile::new(1.5, Some(Claude))
            .with_fallback(&[Claude, Llama, Titan, Mistral, Glossary])
            .with_critical_terms(&["allergy", "anaphylaxis", "overdose", "cardiac arrest"])
            .with_thresholds(0.91, 0.78, 0.64),
    );
    domains.insert(
        "pharmacology".to_string(),
        DomainProfile::new(1.6, Some(Claude)).with_critical_terms(&["dosage", "contraindication", "overdose"]),
    );
    domains.insert(
        "pediatrics".to_string(),
        DomainProfile::new(1.3, Some(Titan))
            .with_critical_terms(&["dosage", "fever"])
            .with_thresholds(0.91, 0.78, 0.63),
    );
    domains.insert(
        "radiology".to_string(),
        DomainProfile::new(1.3, Some(Titan)).with_fallback(&[Titan, Claude, Llama]),
    );
    domains.insert(
        "psychiatry".to_string(),
        DomainProfile::new(1.4, Some(Claude)).with_critical_terms(&["suicide", "overdose"]),
    );
    domains.insert(
        "surgery".to_string(),
        DomainProfile::new(1.5, Some(Claude)).with_critical_terms(&["anesthesia", "hemorrhage"]),
    );
    domains.insert("dermatology".to_string(), DomainProfile::new(1.2, None));

    domains
}

fn default_language_groups() -> Vec<LanguageGroupRule> {
    use BackendFamily::*;

    vec![
        LanguageGroupRule::new("romance", &["es", "fr", "it", "pt", "ro", "ca"], Mistral, &[Mistral, Claude, Llama, Titan, Glossary]),
        LanguageGroupRule::new("germanic", &["de", "nl", "sv", "da", "no"], Titan, &[Titan, Claude, Mistral, Llama]),
        LanguageGroupRule::new("cjk", &["zh", "ja", "ko"], Claude, &[Claude, Titan, Llama]),
        LanguageGroupRule::new("slavic", &["ru", "pl", "uk", "cs", "bg", "sr"], Llama, &[Llama, Claude, Titan]),
        LanguageGroupRule::new("indic", &["hi", "bn", "ta", "te", "ur", "mr"], Claude, &[Claude, Llama, Titan]),
        LanguageGroupRule::new("middle_eastern", &["ar", "he", "fa"], Claude, &[Claude, Titan, Llama]),
    ]
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open config file: {:?}", path))?;
        let reader = BufReader::new(file);
        let mut config: Config =
            serde_json::from_reader(reader).with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config.normalize_domain_keys()?;
        Ok(config)
    }

    /// Lowercase and trim domain names so lookups match them
    pub fn normalize_domain_keys(&mut self) -> Result<()> {
        let mut normalized = HashMap::with_capacity(self.domains.len());
        for (domain, profile) in self.domains.drain() {
            let key = domain.trim().to_lowercase();
            if normalized.insert(key.clone(), profile).is_some() {
                return Err(anyhow!("Domain {} is configured more than once", key));
            }
        }
        self.domains = normalized;
        Ok(())
    }

    /// Write configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.catalog.is_empty() {
            return Err(anyhow!("Provider catalog must contain at least one backend"));
        }

        let mut ids = HashSet::new();
        for backend in &self.catalog {
            if !ids.insert(backend.id.as_str()) {
                return Err(anyhow!("Duplicate backend id in catalog: {}", backend.id));
            }
            for code in &backend.languages {
                validate_language_code(code).with_context(|| format!("Backend {} lists an invalid language", backend.id))?;
            }
        }

        if self.routing.max_attempts == 0 {
            return Err(anyhow!("routing.max_attempts must be at least 1"));
        }

        for (domain, profile) in &self.domains {
            if *domain != domain.trim().to_lowercase() {
                return Err(anyhow!("Domain name {:?} must be lowercase without surrounding spaces", domain));
            }
            if !(1.0..=2.0).contains(&profile.complexity) {
                return Err(anyhow!(
                    "Domain {} has complexity {} outside [1.0, 2.0]",
                    domain,
                    profile.complexity
                ));
            }
            if let Some(seed) = &profile.thresholds {
                if !seed.is_ordered() {
                    return Err(anyhow!("Domain {} has unordered thresholds: {}", domain, seed));
                }
            }
        }

        if !self.thresholds.global_default.is_ordered() {
            return Err(anyhow!("Global default thresholds are unordered: {}", self.thresholds.global_default));
        }

        Ok(())
    }

    /// Profile of a domain, matched case-insensitively
    pub fn domain_profile(&self, domain: &str) -> Option<&DomainProfile> {
        self.domains.get(&domain.trim().to_lowercase())
    }

    /// Complexity multiplier of a domain (1.0 when unknown)
    pub fn domain_complexity(&self, domain: &str) -> f64 {
        self.domain_profile(domain).map(|p| p.complexity).unwrap_or(1.0)
    }

    /// Language-group rule for a request, checking the target language first
    pub fn language_group_for(&self, source_language: &str, target_language: &str) -> Option<&LanguageGroupRule> {
        self.language_groups
            .iter()
            .find(|group| group.contains(target_language))
            .or_else(|| self.language_groups.iter().find(|group| group.contains(source_language)))
    }

    /// Whether the pair is on the historically-hard list
    pub fn is_complex_pair(&self, source_language: &str, target_language: &str) -> bool {
        let key = pair_key(source_language, target_language);
        self.thresholds
            .complex_language_pairs
            .iter()
            .any(|pair| normalize_pair(pair) == key)
    }

    /// SQLite database location
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => crate::database::DatabaseConnection::default_database_path(),
        }
    }
}

fn normalize_pair(pair: &str) -> String {
    match pair.split_once('-') {
        Some((source, target)) => pair_key(source, target),
        None => pair.trim().to_lowercase(),
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            catalog: default_catalog(),
            routing: RoutingPolicy::default(),
            domains: default_domains(),
            language_groups: default_language_groups(),
            thresholds: ThresholdPolicy::default(),
            invoker: InvokerConfig::default(),
            storage: StorageConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
