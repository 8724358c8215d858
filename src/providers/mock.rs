/*!
 * Mock transport for testing.
 *
 * This module provides a scripted `BackendTransport` that answers in each
 * family's response shape without any network access:
 * - `MockTransport::working(text)` - Always succeeds with the given translation
 * - `MockTransport::failing()` - Always fails with an error
 * - `.with_backend(id, behavior)` - Overrides the behavior of one backend
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{BackendDescriptor, BackendFamily, BackendTransport};

/// Behavior mode for one backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with the configured translation
    Working,
    /// Fails every Nth request to this backend
    Intermittent { fail_every: usize },
    /// Always fails with a request error
    Failing,
    /// Succeeds with a body that does not match the family's shape
    Malformed,
    /// Succeeds with an empty translation
    Empty,
    /// Succeeds after a delay (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Scripted transport shared between the invoker and the test
#[derive(Debug, Clone)]
pub struct MockTransport {
    /// Behavior for backends without an override
    default_behavior: MockBehavior,
    /// Per-backend overrides
    overrides: HashMap<String, MockBehavior>,
    /// Translation returned on success
    output: String,
    /// Backend ids in the order they were called
    calls: Arc<Mutex<Vec<String>>>,
    /// Total number of requests across clones
    request_count: Arc<AtomicUsize>,
}

impl MockTransport {
    /// Create a transport with the given default behavior and translation
    pub fn new(default_behavior: MockBehavior, output: &str) -> Self {
        Self {
            default_behavior,
            overrides: HashMap::new(),
            output: output.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every backend succeeds with `output`
    pub fn working(output: &str) -> Self {
        Self::new(MockBehavior::Working, output)
    }

    /// Every backend fails
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing, "")
    }

    /// Override the behavior of one backend
    pub fn with_backend(mut self, backend_id: &str, behavior: MockBehavior) -> Self {
        self.overrides.insert(backend_id.to_string(), behavior);
        self
    }

    /// Backend ids in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of requests made so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn behavior_for(&self, backend_id: &str) -> MockBehavior {
        self.overrides.get(backend_id).copied().unwrap_or(self.default_behavior)
    }

    fn calls_to(&self, backend_id: &str) -> usize {
        self.calls.lock().iter().filter(|id| id.as_str() == backend_id).count()
    }

    /// Wrap a translation in the response shape of a family
    pub fn response_body(family: BackendFamily, text: &str) -> Value {
        match family {
            BackendFamily::Claude => json!({"content": [{"type": "text", "text": text}]}),
            BackendFamily::Titan => json!({"results": [{"outputText": text}]}),
            BackendFamily::Llama => json!({"generation": text}),
            BackendFamily::Mistral => json!({"outputs": [{"text": text}]}),
            BackendFamily::Glossary => json!({"translated_text": text}),
        }
    }
}

#[async_trait]
impl BackendTransport for MockTransport {
    async fn send(&self, backend: &BackendDescriptor, _body: Value) -> Result<Value, ProviderError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(backend.id.clone());
        let nth = self.calls_to(&backend.id);

        match self.behavior_for(&backend.id) {
            MockBehavior::Working => Ok(Self::response_body(backend.family, &self.output)),

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && nth % fail_every == 0 {
                    Err(ProviderError::RequestFailed(format!(
                        "Simulated intermittent failure (request #{} to {})",
                        nth, backend.id
                    )))
                } else {
                    Ok(Self::response_body(backend.family, &self.output))
                }
            }

            MockBehavior::Failing => Err(ProviderError::RequestFailed(format!(
                "Simulated failure of {}",
                backend.id
            ))),

            MockBehavior::Malformed => Ok(json!({"unexpected": true})),

            MockBehavior::Empty => Ok(Self::response_body(backend.family, "")),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(Self::response_body(backend.family, &self.output))
            }
        }
    }
}
