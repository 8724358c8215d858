/*!
 * Medical term extraction.
 *
 * `GlossaryTermExtractor` recognizes a fixed multilingual lexicon of
 * medical concepts with word-boundary regexes. Terms are reported by
 * concept (the English headword), so the terms of a source text and of its
 * translation can be compared across languages. Domain critical terms come
 * from configuration.
 */

use log::debug;
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Debug;

use crate::app_config::Config;
use crate::errors::AnalysisError;
use crate::language_utils::canonical_code;

/// Statistics about the domain terms found in one text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermStats {
    /// Total term occurrences
    pub count: usize,
    /// Mean length of the matched surface forms, in characters
    pub avg_length: f64,
    /// Term occurrences per word
    pub density: f64,
    /// Distinct critical concepts present
    pub critical_terms: BTreeSet<String>,
    /// Distinct concepts present
    pub concepts: BTreeSet<String>,
}

impl TermStats {
    pub fn critical_count(&self) -> usize {
        self.critical_terms.len()
    }
}

/// Source of terminology statistics for the confidence analyzer
pub trait TermExtractor: Send + Sync + Debug {
    /// Whether the extractor has a vocabulary for the language
    fn supports_language(&self, language: &str) -> bool;

    /// Count the domain terms of a text
    fn extract_terms(&self, text: &str, language: &str, domain: &str) -> Result<TermStats, AnalysisError>;
}

/// (concept, [(language, surface forms)])
type LexiconEntry = (&'static str, &'static [(&'static str, &'static [&'static str])]);

static MEDICAL_LEXICON: &[LexiconEntry] = &[
    ("heart attack", &[("en", &["heart attack"]), ("es", &["ataque cardíaco", "ataque al corazón"]), ("fr", &["crise cardiaque"])]),
    ("myocardial infarction", &[("en", &["myocardial infarction"]), ("es", &["infarto de miocardio", "infarto agudo de miocardio"]), ("fr", &["infarctus du myocarde"])]),
    ("cardiac arrest", &[("en", &["cardiac arrest"]), ("es", &["paro cardíaco", "parada cardíaca"]), ("fr", &["arrêt cardiaque"])]),
    ("arrhythmia", &[("en", &["arrhythmia"]), ("es", &["arritmia"]), ("fr", &["arythmie"])]),
    ("blood pressure", &[("en", &["blood pressure"]), ("es", &["presión arterial"]), ("fr", &["tension artérielle", "pression artérielle"])]),
    ("hypertension", &[("en", &["hypertension"]), ("es", &["hipertensión"]), ("fr", &["hypertension"])]),
    ("diabetes", &[("en", &["diabetes"]), ("es", &["diabetes"]), ("fr", &["diabète"])]),
    ("insulin", &[("en", &["insulin"]), ("es", &["insulina"]), ("fr", &["insuline"])]),
    ("stroke", &[("en", &["stroke"]), ("es", &["accidente cerebrovascular", "ictus"]), ("fr", &["accident vasculaire cérébral", "AVC"])]),
    ("seizure", &[("en", &["seizure"]), ("es", &["convulsión", "convulsiones"]), ("fr", &["crise convulsive", "convulsion"])]),
    ("aneurysm", &[("en", &["aneurysm"]), ("es", &["aneurisma"]), ("fr", &["anévrisme"])]),
    ("cancer", &[("en", &["cancer"]), ("es", &["cáncer"]), ("fr", &["cancer"])]),
    ("tumor", &[("en", &["tumor", "tumour"]), ("es", &["tumor", "tumores"]), ("fr", &["tumeur"])]),
    ("metastasis", &[("en", &["metastasis", "metastases"]), ("es", &["metástasis"]), ("fr", &["métastase"])]),
    ("chemotherapy", &[("en", &["chemotherapy"]), ("es", &["quimioterapia"]), ("fr", &["chimiothérapie"])]),
    ("asthma", &[("en", &["asthma"]), ("es", &["asma"]), ("fr", &["asthme"])]),
    ("pneumonia", &[("en", &["pneumonia"]), ("es", &["neumonía"]), ("fr", &["pneumonie"])]),
    ("allergy", &[("en", &["allergy", "allergies"]), ("es", &["alergia"]), ("fr", &["allergie"])]),
    ("anaphylaxis", &[("en", &["anaphylaxis"]), ("es", &["anafilaxia"]), ("fr", &["anaphylaxie"])]),
    ("overdose", &[("en", &["overdose"]), ("es", &["sobredosis"]), ("fr", &["surdose", "overdose"])]),
    ("dosage", &[("en", &["dosage", "dose"]), ("es", &["dosis", "posología"]), ("fr", &["posologie", "dose"])]),
    ("contraindication", &[("en", &["contraindication"]), ("es", &["contraindicación", "contraindicaciones"]), ("fr", &["contre-indication"])]),
    ("antibiotic", &[("en", &["antibiotic"]), ("es", &["antibiótico"]), ("fr", &["antibiotique"])]),
    ("fever", &[("en", &["fever"]), ("es", &["fiebre"]), ("fr", &["fièvre"])]),
    ("anesthesia", &[("en", &["anesthesia", "anaesthesia"]), ("es", &["anestesia"]), ("fr", &["anesthésie"])]),
    ("hemorrhage", &[("en", &["hemorrhage", "haemorrhage"]), ("es", &["hemorragia"]), ("fr", &["hémorragie"])]),
    ("suicide", &[("en", &["suicide"]), ("es", &["suicidio"]), ("fr", &["suicide"])]),
];

#[derive(Debug)]
struct CompiledTerm {
    concept: String,
    /// Language -> one alternation regex over every surface form
    patterns: HashMap<String, Regex>,
}

/// Regex-based extractor over a built-in multilingual lexicon
#[derive(Debug)]
pub struct GlossaryTermExtractor {
    terms: Vec<CompiledTerm>,
    /// Domain -> critical concepts
    critical: HashMap<String, HashSet<String>>,
    languages: HashSet<String>,
}

fn compile(forms: &[&str]) -> Result<Regex, AnalysisError> {
    let alternation = forms
        .iter()
        .map(|form| regex::escape(form))
        .collect::<Vec<_>>()
        .join("|");
    // optional plural suffix for the alphabetic languages in the lexicon
    Regex::new(&format!(r"(?i)\b(?:{})(?:s|es)?\b", alternation))
        .map_err(|e| AnalysisError::ExtractorUnavailable(e.to_string()))
}

impl GlossaryTermExtractor {
    /// Built-in lexicon without domain critical terms
    pub fn new() -> Result<Self, AnalysisError> {
        let mut terms = Vec::with_capacity(MEDICAL_LEXICON.len());
        let mut languages = HashSet::new();

        for (concept, forms_by_language) in MEDICAL_LEXICON {
            let mut patterns = HashMap::new();
            for (language, forms) in forms_by_language.iter() {
                patterns.insert(language.to_string(), compile(forms)?);
                languages.insert(language.to_string());
            }
            terms.push(CompiledTerm {
                concept: concept.to_string(),
                patterns,
            });
        }

        Ok(Self {
            terms,
            critical: HashMap::new(),
            languages,
        })
    }

    /// Built-in lexicon plus the critical terms of every configured domain.
    ///
    /// A configured critical term that is not in the lexicon becomes a
    /// concept of its own, matched by its literal form in every lexicon
    /// language (drug names and device names are usually kept verbatim).
    pub fn from_config(config: &Config) -> Result<Self, AnalysisError> {
        let mut extractor = Self::new()?;

        for (domain, profile) in &config.domains {
            for term in &profile.critical_terms {
                let concept = extractor.concept_for(term)?;
                extractor
                    .critical
                    .entry(domain.to_lowercase())
                    .or_default()
                    .insert(concept);
            }
        }

        debug!(
            "Term extractor ready: {} concepts, critical terms for {} domains",
            extractor.terms.len(),
            extractor.critical.len()
        );
        Ok(extractor)
    }

    /// Concept whose headword or any surface form equals `term`
    fn concept_for(&mut self, term: &str) -> Result<String, AnalysisError> {
        let wanted = term.trim().to_lowercase();
        let known = MEDICAL_LEXICON.iter().find(|(concept, forms_by_language)| {
            *concept == wanted
                || forms_by_language
                    .iter()
                    .any(|(_, forms)| forms.iter().any(|form| form.to_lowercase() == wanted))
        });

        if let Some((concept, _)) = known {
            return Ok(concept.to_string());
        }
        if self.terms.iter().any(|t| t.concept == wanted) {
            return Ok(wanted);
        }

        let pattern = compile(&[wanted.as_str()])?;
        let patterns = self
            .languages
            .iter()
            .map(|language| (language.clone(), pattern.clone()))
            .collect();
        self.terms.push(CompiledTerm {
            concept: wanted.clone(),
            patterns,
        });
        Ok(wanted)
    }

    /// Critical concepts configured for a domain
    pub fn critical_terms(&self, domain: &str) -> Vec<String> {
        let mut terms: Vec<String> = self
            .critical
            .get(&domain.trim().to_lowercase())
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        terms.sort();
        terms
    }
}

impl TermExtractor for GlossaryTermExtractor {
    fn supports_language(&self, language: &str) -> bool {
        self.languages.contains(&canonical_code(language))
    }

    fn extract_terms(&self, text: &str, language: &str, domain: &str) -> Result<TermStats, AnalysisError> {
        let language = canonical_code(language);
        if !self.languages.contains(&language) {
            return Err(AnalysisError::ExtractorUnavailable(format!(
                "no vocabulary for language {}",
                language
            )));
        }

        let critical = self.critical.get(&domain.trim().to_lowercase());
        let mut stats = TermStats::default();
        let mut total_length = 0usize;

        for term in &self.terms {
            let Some(pattern) = term.patterns.get(&language) else {
                continue;
            };
            for found in pattern.find_iter(text) {
                stats.count += 1;
                total_length += found.as_str().chars().count();
                stats.concepts.insert(term.concept.clone());
                if critical.is_some_and(|set| set.contains(&term.concept)) {
                    stats.critical_terms.insert(term.concept.clone());
                }
            }
        }

        let words = text.split_whitespace().count();
        if stats.count > 0 {
            stats.avg_length = total_length as f64 / stats.count as f64;
        }
        if words > 0 {
            stats.density = stats.count as f64 / words as f64;
        }

        Ok(stats)
    }
}
