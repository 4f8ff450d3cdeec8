pub mod web;

use crate::engines::{Candidate, Engine};
use crate::error::DriverError;
use crate::session::AbortHandle;
use crate::utils;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// One results page to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub query: String,
    pub engine: Engine,
    /// Zero-based page number
    pub page_index: usize,
}

impl PageRequest {
    pub fn new(query: impl Into<String>, engine: Engine, page_index: usize) -> Self {
        Self {
            query: query.into(),
            engine,
            page_index,
        }
    }
}

/// Source of candidate links for a results page.
///
/// One call is one attempt; retries are layered on top by [`fetch_page`].
pub trait SearchDriver: Send {
    /// Fetches a single results page and returns the links found on it
    fn search(
        &mut self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<Vec<Candidate>, DriverError>> + Send;

    /// Releases the underlying backend
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Bounded retry with a growing, jittered delay between attempts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per page, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt; scaled by the attempt number after that
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound of the random extra delay added to every wait
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_jitter_ms() -> u64 {
    1000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

impl RetryPolicy {
    /// Policy that retries without waiting
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            jitter_ms: 0,
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms.saturating_mul(u64::from(attempt));
        utils::random_delay(base, base.saturating_add(self.jitter_ms))
    }
}

/// What a page fetch finally produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page loaded; the list may be empty if the engine had no more results
    Success(Vec<Candidate>),
    /// A verification challenge did not clear in time
    Blocked,
    /// Every attempt failed
    Failed { attempts: u32 },
    /// An abort was requested before the page could be fetched
    Aborted { attempts: u32 },
}

impl PageOutcome {
    /// Links produced by the page; empty unless the fetch succeeded
    pub fn into_candidates(self) -> Vec<Candidate> {
        match self {
            PageOutcome::Success(candidates) => candidates,
            PageOutcome::Blocked
            | PageOutcome::Failed { .. }
            | PageOutcome::Aborted { .. } => Vec::new(),
        }
    }
}

/// Fetches a page, retrying transient failures according to the policy.
///
/// Never fails: exhausted retries and challenge timeouts turn into
/// [`PageOutcome::Failed`] and [`PageOutcome::Blocked`], so the caller can
/// move on to the next page. The abort flag is checked before every
/// attempt and during the backoff between attempts.
pub async fn fetch_page<D: SearchDriver>(
    driver: &mut D,
    request: &PageRequest,
    policy: &RetryPolicy,
    abort: &AbortHandle,
) -> PageOutcome {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        if abort.is_aborted() {
            ::log::info!(
                "Not retrying {} page {}: search interrupted",
                request.engine,
                request.page_index + 1
            );
            return PageOutcome::Aborted {
                attempts: attempt - 1,
            };
        }

        match driver.search(request).await {
            Ok(candidates) => {
                ::log::debug!(
                    "{} page {} returned {} candidates on attempt {}",
                    request.engine,
                    request.page_index + 1,
                    candidates.len(),
                    attempt
                );
                return PageOutcome::Success(candidates);
            }
            Err(DriverError::Blocked(url)) => {
                ::log::warn!(
                    "{} page {} blocked by verification challenge at {}",
                    request.engine,
                    request.page_index + 1,
                    url
                );
                return PageOutcome::Blocked;
            }
            Err(e) => {
                ::log::warn!(
                    "{} page {} attempt {}/{} failed: {}",
                    request.engine,
                    request.page_index + 1,
                    attempt,
                    max_attempts,
                    e
                );
                if attempt < max_attempts {
                    abort.sleep(policy.delay_after(attempt)).await;
                }
            }
        }
    }

    ::log::error!(
        "Giving up on {} page {} after {} attempts",
        request.engine,
        request.page_index + 1,
        max_attempts
    );
    PageOutcome::Failed {
        attempts: max_attempts,
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedDriver;
    use super::*;

    fn timeout() -> DriverError {
        DriverError::Navigation {
            url: "https://www.google.com/search?q=x".to_string(),
            message: "timeout".to_string(),
        }
    }

    #[tokio::test]
    async fn test_exhausted_retries_yield_empty_page() {
        let mut driver = ScriptedDriver::new()
            .respond(Engine::Google, 0, Err(timeout()))
            .respond(Engine::Google, 0, Err(timeout()))
            .respond(Engine::Google, 0, Err(timeout()));
        let request = PageRequest::new("q", Engine::Google, 0);

        let outcome = fetch_page(&mut driver, &request, &RetryPolicy::immediate(3), &AbortHandle::new()).await;

        assert_eq!(outcome, PageOutcome::Failed { attempts: 3 });
        assert_eq!(driver.calls.len(), 3);
        assert!(outcome.into_candidates().is_empty());
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let mut driver = ScriptedDriver::new()
            .respond(Engine::Bing, 1, Err(DriverError::SessionLost("gone".into())))
            .links(Engine::Bing, 1, &["https://a.com/x.pdf"]);
        let request = PageRequest::new("q", Engine::Bing, 1);

        let outcome = fetch_page(&mut driver, &request, &RetryPolicy::immediate(3), &AbortHandle::new()).await;

        assert_eq!(
            outcome,
            PageOutcome::Success(vec![Candidate::new("https://a.com/x.pdf", Engine::Bing)])
        );
        assert_eq!(driver.calls.len(), 2);
    }

    #[tokio::test]
    async fn test_challenge_is_not_retried() {
        let mut driver = ScriptedDriver::new()
            .respond(Engine::Google, 0, Err(DriverError::Blocked("sorry".into())))
            .links(Engine::Google, 0, &["https://a.com/x.pdf"]);
        let request = PageRequest::new("q", Engine::Google, 0);

        let outcome = fetch_page(&mut driver, &request, &RetryPolicy::immediate(3), &AbortHandle::new()).await;

        assert_eq!(outcome, PageOutcome::Blocked);
        assert_eq!(driver.calls.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let mut driver = ScriptedDriver::new();
        let request = PageRequest::new("q", Engine::Google, 0);
        let outcome = fetch_page(&mut driver, &request, &RetryPolicy::immediate(0), &AbortHandle::new()).await;
        assert_eq!(outcome, PageOutcome::Success(Vec::new()));
        assert_eq!(driver.calls.len(), 1);
    }

    /// Fails every request and raises the abort flag on the first one
    struct InterruptedDriver {
        abort: AbortHandle,
        calls: usize,
    }

    impl SearchDriver for InterruptedDriver {
        async fn search(&mut self, _request: &PageRequest) -> Result<Vec<Candidate>, DriverError> {
            self.calls += 1;
            self.abort.abort();
            Err(DriverError::Source("connection reset".to_string()))
        }

        async fn close(self) {}
    }

    #[tokio::test]
    async fn test_abort_during_attempt_stops_retries() {
        let abort = AbortHandle::new();
        let mut driver = InterruptedDriver {
            abort: abort.clone(),
            calls: 0,
        };
        let request = PageRequest::new("q", Engine::Google, 0);
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 60_000,
            jitter_ms: 0,
        };

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            fetch_page(&mut driver, &request, &policy, &abort),
        )
        .await
        .expect("backoff should end as soon as the search is aborted");

        assert_eq!(outcome, PageOutcome::Aborted { attempts: 1 });
        assert_eq!(driver.calls, 1);
    }

    #[tokio::test]
    async fn test_aborted_before_first_attempt() {
        let mut driver = ScriptedDriver::new().links(Engine::Bing, 0, &["https://a.com/x.pdf"]);
        let abort = AbortHandle::new();
        abort.abort();
        let request = PageRequest::new("q", Engine::Bing, 0);

        let outcome = fetch_page(&mut driver, &request, &RetryPolicy::immediate(3), &abort).await;

        assert_eq!(outcome, PageOutcome::Aborted { attempts: 0 });
        assert!(driver.calls.is_empty());
    }

    #[test]
    fn test_delay_grows_with_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 100,
            jitter_ms: 50,
        };
        for _ in 0..20 {
            let first = policy.delay_after(1).as_millis();
            let second = policy.delay_after(2).as_millis();
            assert!((100..=150).contains(&first));
            assert!((200..=250).contains(&second));
        }
    }
}
