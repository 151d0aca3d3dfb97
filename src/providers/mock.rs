/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds with a canned report
 * - `MockProvider::intermittent(n)` - Fails every nth request with a 503
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::empty()` - Succeeds with blank output
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{Completion, CompletionRequest, Provider};

/// Report text returned by a working mock unless overridden
pub const CANNED_REPORT: &str = "### Event Overview
The event is on track with **all suppliers confirmed**.

### Budget
Allocated spend stays **within budget**.

### Risks
None reported.";

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with the configured text
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with a server error
    Failing,
    /// Rejects credentials
    Unauthorized,
    /// Returns whitespace only
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing report generation
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    text: String,
    /// Shared between clones
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            text: CANNED_REPORT.to_string(),
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn unauthorized() -> Self {
        Self::new(MockBehavior::Unauthorized)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Replace the canned report text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Number of `complete` calls so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copies of every request received, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    fn completion(&self, request: &CompletionRequest, text: String) -> Completion {
        Completion {
            prompt_tokens: Some(request.prompt.len() as u64),
            completion_tokens: Some(text.len() as u64 / 4),
            text,
            model: "mock".to_string(),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        match self.behavior {
            MockBehavior::Working => Ok(self.completion(&request, self.text.clone())),

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.completion(&request, self.text.clone()))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Unauthorized => Err(ProviderError::AuthenticationError(
                "Simulated invalid API key".to_string(),
            )),

            MockBehavior::Empty => Ok(self.completion(&request, "  \n".to_string())),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.completion(&request, self.text.clone()))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError(
                "Simulated unreachable provider".to_string(),
            )),
            MockBehavior::Unauthorized => Err(ProviderError::AuthenticationError(
                "Simulated invalid API key".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "Mock"
    }
}
