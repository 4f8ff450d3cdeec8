//! Sequential search session: engines one at a time, pages one at a time,
//! each discovered link validated, classified and stored before the next.

use crate::category::Category;
use crate::config::ScavengerConfig;
use crate::drivers::{self, PageOutcome, PageRequest, RetryPolicy, SearchDriver};
use crate::engines::{Candidate, Engine};
use crate::error::ScavengerError;
use crate::filter::{LinkFilter, LinkFilterConfig, Rejection};
use crate::results::{CategorizedLink, ResultAggregator, ResultSet};
use crate::utils;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Longest uninterrupted sleep while pacing, so an abort is noticed quickly
const ABORT_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Inputs of one session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub query: String,
    pub pages_per_engine: usize,
    pub engines: Vec<Engine>,
    pub retry: RetryPolicy,
    /// Pause range (ms) between pages of one engine
    pub page_delay_ms: (u64, u64),
    /// Pause range (ms) between engines
    pub engine_delay_ms: (u64, u64),
    pub filter: LinkFilterConfig,
}

impl SessionOptions {
    /// Options for a query with everything else taken from the config
    pub fn from_config(query: impl Into<String>, config: &ScavengerConfig) -> Self {
        Self {
            query: query.into(),
            pages_per_engine: config.pages_per_engine,
            engines: config.engines.clone(),
            retry: config.retry.clone(),
            page_delay_ms: (config.page_delay_min_ms, config.page_delay_max_ms),
            engine_delay_ms: (config.engine_delay_min_ms, config.engine_delay_max_ms),
            filter: config.filter.clone(),
        }
    }

    /// Checks the inputs and trims the query
    pub fn validate(mut self) -> Result<Self, ScavengerError> {
        self.query = self.query.trim().to_string();
        if self.query.is_empty() {
            return Err(ScavengerError::InvalidOptions(
                "search query cannot be empty".to_string(),
            ));
        }
        if self.pages_per_engine == 0 {
            return Err(ScavengerError::InvalidOptions(
                "number of pages must be at least 1".to_string(),
            ));
        }
        if self.engines.is_empty() {
            return Err(ScavengerError::InvalidOptions(
                "at least one search engine is required".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Progress notifications emitted while a session runs
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    EngineStarted {
        engine: Engine,
    },
    PageStarted {
        engine: Engine,
        page_index: usize,
    },
    PageCompleted {
        engine: Engine,
        page_index: usize,
        candidates: usize,
        accepted: usize,
    },
    PageBlocked {
        engine: Engine,
        page_index: usize,
    },
    PageFailed {
        engine: Engine,
        page_index: usize,
        attempts: u32,
    },
    LinkAccepted(CategorizedLink),
    LinkRejected {
        url: String,
        reason: Rejection,
    },
    LinkDuplicate {
        url: String,
    },
    /// An abort was requested; the results gathered so far are kept
    Aborted,
    Finished(SessionSummary),
}

/// Receives session progress. Implemented for closures.
pub trait ProgressObserver: Send {
    fn on_event(&mut self, event: &SessionEvent);
}

impl<F> ProgressObserver for F
where
    F: FnMut(&SessionEvent) + Send,
{
    fn on_event(&mut self, event: &SessionEvent) {
        self(event)
    }
}

/// Writes progress to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::EngineStarted { engine } => {
                ::log::info!("Searching {}", engine);
            }
            SessionEvent::PageStarted { engine, page_index } => {
                ::log::debug!("Requesting {} page {}", engine, page_index + 1);
            }
            SessionEvent::PageCompleted {
                engine,
                page_index,
                candidates,
                accepted,
            } => {
                ::log::info!(
                    "{} page {}: {} candidates, {} new links",
                    engine,
                    page_index + 1,
                    candidates,
                    accepted
                );
            }
            SessionEvent::PageBlocked { engine, page_index } => {
                ::log::warn!("{} page {} skipped: verification challenge", engine, page_index + 1);
            }
            SessionEvent::PageFailed {
                engine,
                page_index,
                attempts,
            } => {
                ::log::warn!(
                    "{} page {} skipped after {} attempts",
                    engine,
                    page_index + 1,
                    attempts
                );
            }
            SessionEvent::LinkAccepted(link) => {
                ::log::info!("Found {} link: {}", link.category, link.url);
            }
            SessionEvent::LinkRejected { url, reason } => {
                ::log::debug!("Rejected {}: {}", url, reason);
            }
            SessionEvent::LinkDuplicate { url } => {
                ::log::trace!("Already have {}", url);
            }
            SessionEvent::Aborted => {
                ::log::warn!("Search interrupted, keeping partial results");
            }
            SessionEvent::Finished(summary) => {
                ::log::info!(
                    "Session finished: {} links from {} candidates ({} pages ok, {} blocked, {} failed)",
                    summary.links_accepted,
                    summary.candidates_seen,
                    summary.pages_succeeded,
                    summary.pages_blocked,
                    summary.pages_failed
                );
            }
        }
    }
}

/// Forwards every event to a channel. A closed receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_event(&mut self, event: &SessionEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// Cooperative abort flag shared between a session and its controller
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the session to stop before its next search request
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleeps for the given duration, waking early once aborted
    pub async fn sleep(&self, duration: Duration) {
        let mut remaining = duration;
        while !remaining.is_zero() && !self.is_aborted() {
            let step = remaining.min(ABORT_CHECK_INTERVAL);
            tokio::time::sleep(step).await;
            remaining -= step;
        }
    }
}

/// Counters collected over a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub pages_succeeded: usize,
    pub pages_blocked: usize,
    pub pages_failed: usize,
    pub candidates_seen: usize,
    pub links_accepted: usize,
    pub links_rejected: usize,
    pub duplicates: usize,
    pub per_category: BTreeMap<Category, usize>,
}

impl SessionSummary {
    /// True if any page was skipped
    pub fn has_page_failures(&self) -> bool {
        self.pages_blocked + self.pages_failed > 0
    }
}

/// Everything a session produced
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub results: ResultSet,
    pub summary: SessionSummary,
    pub aborted: bool,
}

impl SessionReport {
    /// True if the session ran to the end with every page fetched
    pub fn is_complete(&self) -> bool {
        !self.aborted && !self.summary.has_page_failures()
    }
}

/// Runs a search session against any driver.
///
/// Page and link failures are absorbed and counted; the only error is
/// invalid options, reported before the driver is touched. An abort stops
/// further driver calls and returns what has been gathered.
pub async fn run_session<D, O>(
    driver: &mut D,
    options: &SessionOptions,
    observer: &mut O,
    abort: &AbortHandle,
) -> Result<SessionReport, ScavengerError>
where
    D: SearchDriver,
    O: ProgressObserver,
{
    let options = options.clone().validate()?;
    let filter = LinkFilter::new(options.filter.clone())
        .map_err(|e| ScavengerError::InvalidOptions(format!("invalid link filter: {e}")))?;

    ::log::info!(
        "Starting session for {:?}: {} pages on {} engines",
        options.query,
        options.pages_per_engine,
        options.engines.len()
    );

    let mut aggregator = ResultAggregator::new();
    let mut summary = SessionSummary::default();

    'engines: for (engine_number, engine) in options.engines.iter().copied().enumerate() {
        if engine_number > 0 {
            pause(options.engine_delay_ms, abort).await;
        }
        if abort.is_aborted() {
            break;
        }
        observer.on_event(&SessionEvent::EngineStarted { engine });

        for page_index in 0..options.pages_per_engine {
            if page_index > 0 {
                pause(options.page_delay_ms, abort).await;
            }
            if abort.is_aborted() {
                break 'engines;
            }
            observer.on_event(&SessionEvent::PageStarted { engine, page_index });

            let request = PageRequest::new(options.query.as_str(), engine, page_index);
            match drivers::fetch_page(driver, &request, &options.retry, abort).await {
                PageOutcome::Success(candidates) => {
                    summary.pages_succeeded += 1;
                    let found = candidates.len();
                    let accepted = process_candidates(
                        candidates,
                        &filter,
                        &mut aggregator,
                        &mut summary,
                        observer,
                    );
                    observer.on_event(&SessionEvent::PageCompleted {
                        engine,
                        page_index,
                        candidates: found,
                        accepted,
                    });
                    if found == 0 {
                        ::log::info!("No more results from {}", engine);
                        break;
                    }
                }
                PageOutcome::Blocked => {
                    summary.pages_blocked += 1;
                    observer.on_event(&SessionEvent::PageBlocked { engine, page_index });
                }
                PageOutcome::Aborted { attempts } => {
                    ::log::debug!(
                        "{} page {} abandoned after {} attempts",
                        engine,
                        page_index + 1,
                        attempts
                    );
                    break 'engines;
                }
                PageOutcome::Failed { attempts } => {
                    summary.pages_failed += 1;
                    observer.on_event(&SessionEvent::PageFailed {
                        engine,
                        page_index,
                        attempts,
                    });
                }
            }
        }
    }

    let aborted = abort.is_aborted();
    if aborted {
        observer.on_event(&SessionEvent::Aborted);
    }

    let results = aggregator.into_results();
    summary.per_category = results.counts();
    observer.on_event(&SessionEvent::Finished(summary.clone()));

    Ok(SessionReport {
        results,
        summary,
        aborted,
    })
}

/// Validates, classifies and stores the links of one page.
/// Returns how many were new.
fn process_candidates<O: ProgressObserver>(
    candidates: Vec<Candidate>,
    filter: &LinkFilter,
    aggregator: &mut ResultAggregator,
    summary: &mut SessionSummary,
    observer: &mut O,
) -> usize {
    let mut accepted = 0;

    for candidate in candidates {
        summary.candidates_seen += 1;

        if let Err(reason) = filter.check(&candidate.url) {
            summary.links_rejected += 1;
            observer.on_event(&SessionEvent::LinkRejected {
                url: candidate.url,
                reason,
            });
            continue;
        }

        let link = CategorizedLink::from_candidate(candidate);
        if !aggregator.insert(link.clone()) {
            summary.duplicates += 1;
            observer.on_event(&SessionEvent::LinkDuplicate { url: link.url });
            continue;
        }

        observer.on_event(&SessionEvent::LinkAccepted(link));
        summary.links_accepted += 1;
        accepted += 1;
    }

    accepted
}

/// Sleeps for a random duration in the range, waking early on abort
async fn pause(range_ms: (u64, u64), abort: &AbortHandle) {
    abort
        .sleep(utils::random_delay(range_ms.0, range_ms.1))
        .await;
}
