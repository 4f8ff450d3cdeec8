// Re-export modules
pub mod category;
pub mod config;
pub mod drivers;
pub mod engines;
pub mod error;
pub mod filter;
pub mod persistence;
pub mod results;
pub mod session;
pub mod utils;

// Re-export commonly used types for convenience
pub use category::{Category, classify};
pub use engines::{Candidate, Engine};
pub use error::{DriverError, PersistError, ScavengerError};
pub use filter::is_valid;
pub use results::{CategorizedLink, ResultAggregator, ResultSet};
pub use session::{AbortHandle, SessionEvent, SessionReport, SessionSummary};

use config::ScavengerConfig;
use drivers::SearchDriver;
use drivers::web::WebDriverSearch;
use session::{ChannelObserver, LogObserver, ProgressObserver, SessionOptions};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Main builder for a search session
pub struct Scavenger {
    query: String,
    config: ScavengerConfig,
}

impl Scavenger {
    /// Create a new builder for the given query, with default configuration
    /// and `WEBDRIVER_URL` applied
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            config: ScavengerConfig::default().apply_env_overrides(),
        }
    }

    /// Set the number of results pages requested from each engine
    pub fn with_pages(mut self, pages: usize) -> Self {
        self.config.pages_per_engine = pages;
        self
    }

    /// Set the engines to query, in order
    pub fn with_engines(mut self, engines: Vec<Engine>) -> Self {
        self.config.engines = engines;
        self
    }

    /// Replace the whole configuration, used as is
    pub fn with_config(mut self, config: ScavengerConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a file
    pub fn with_config_file(
        self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<Self, ScavengerError> {
        let config = ScavengerConfig::from_file(path)?.apply_env_overrides();
        Ok(self.with_config(config))
    }

    pub fn config(&self) -> &ScavengerConfig {
        &self.config
    }

    /// Validated session options for this builder
    pub fn options(&self) -> Result<SessionOptions, ScavengerError> {
        SessionOptions::from_config(self.query.as_str(), &self.config).validate()
    }

    /// Connects the browser and starts the session in the background.
    ///
    /// Invalid options and an unreachable WebDriver are reported here,
    /// before any search is issued.
    pub async fn start(self) -> Result<ScavengerHandle, ScavengerError> {
        let options = self.options()?;

        ::log::info!("Connecting to WebDriver at {}", self.config.webdriver_url);
        let driver = WebDriverSearch::connect(&self.config)
            .await
            .map_err(ScavengerError::DriverInit)?;

        Ok(spawn_session(driver, options))
    }
}

/// Control surface of a session running in the background
pub struct ScavengerHandle {
    events: mpsc::UnboundedReceiver<SessionEvent>,
    abort: AbortHandle,
    task: JoinHandle<Result<SessionReport, ScavengerError>>,
}

impl ScavengerHandle {
    /// Next progress event, or None once the session has finished
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Handle that can stop the session from elsewhere
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Requests the session to stop after the current page
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Waits for the session and returns its report
    pub async fn join(self) -> Result<SessionReport, ScavengerError> {
        self.task
            .await
            .map_err(|e| ScavengerError::Task(e.to_string()))?
    }
}

/// Runs a session for any driver on a background task. Progress is both
/// logged and streamed through the handle; the driver is closed when the
/// session ends.
pub fn spawn_session<D>(mut driver: D, options: SessionOptions) -> ScavengerHandle
where
    D: SearchDriver + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let abort = AbortHandle::new();
    let task_abort = abort.clone();

    let task = tokio::spawn(async move {
        let mut log = LogObserver;
        let mut channel = ChannelObserver::new(tx);
        let mut observer = move |event: &SessionEvent| {
            log.on_event(event);
            channel.on_event(event);
        };

        let report = session::run_session(&mut driver, &options, &mut observer, &task_abort).await;
        driver.close().await;
        report
    });

    ScavengerHandle {
        events: rx,
        abort,
        task,
    }
}
