/*!
 * Backend routing.
 *
 * - `resolver`: builds the ordered candidate list for a request
 * - `invoker`: walks that list against a transport until one backend succeeds
 */

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::language_utils::canonical_code;
use crate::providers::BackendDescriptor;

pub mod invoker;
pub mod resolver;

pub use invoker::{TranslationInvoker, TranslationOutcome};
pub use resolver::FallbackChainResolver;

/// What a caller wants translated, without the text itself
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionRequest {
    pub source_language: String,
    pub target_language: String,
    /// Subject-matter domain, e.g. "cardiology"
    pub domain: String,
    /// Family name to try first, if any
    pub preferred_family: Option<String>,
    /// Terms the translation must render consistently
    pub term_hints: Vec<String>,
}

impl ResolutionRequest {
    pub fn new(source_language: &str, target_language: &str, domain: &str) -> Self {
        Self {
            source_language: canonical_code(source_language),
            target_language: canonical_code(target_language),
            domain: domain.trim().to_lowercase(),
            preferred_family: None,
            term_hints: Vec::new(),
        }
    }

    pub fn with_preferred_family(mut self, family: &str) -> Self {
        self.preferred_family = Some(family.to_string());
        self
    }

    pub fn with_term_hints(mut self, hints: &[&str]) -> Self {
        self.term_hints = hints.iter().map(|hint| hint.to_string()).collect();
        self
    }
}

/// Position of a candidate in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateRole {
    Primary,
    Fallback,
}

/// One backend to attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub backend: Arc<BackendDescriptor>,
    pub role: CandidateRole,
}

impl Candidate {
    pub fn is_primary(&self) -> bool {
        self.role == CandidateRole::Primary
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self.role {
            CandidateRole::Primary => "primary",
            CandidateRole::Fallback => "fallback",
        };
        write!(f, "{} ({}, {})", self.backend.id, self.backend.family, role)
    }
}

/// Ordered, never-empty list of candidates; the first entry is the primary
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateList {
    candidates: Vec<Candidate>,
}

impl CandidateList {
    pub(crate) fn new(primary: Arc<BackendDescriptor>) -> Self {
        Self {
            candidates: vec![Candidate {
                backend: primary,
                role: CandidateRole::Primary,
            }],
        }
    }

    pub(crate) fn push_fallback(&mut self, backend: Arc<BackendDescriptor>) {
        self.candidates.push(Candidate {
            backend,
            role: CandidateRole::Fallback,
        });
    }

    pub(crate) fn truncate(&mut self, max_len: usize) {
        self.candidates.truncate(max_len.max(1));
    }

    pub fn primary(&self) -> &Candidate {
        &self.candidates[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Always false
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Backend ids in attempt order
    pub fn backend_ids(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.backend.id.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a CandidateList {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}
