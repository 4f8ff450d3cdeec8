use super::{PageRequest, SearchDriver};
use crate::config::ScavengerConfig;
use crate::engines::{Candidate, Engine};
use crate::error::DriverError;
use fantoccini::error::CmdError;
use fantoccini::wd::{Capabilities, TimeoutConfiguration};
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Upper bound for a single navigation, on top of the browser's own page load timeout
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(45);

/// Well-known local WebDriver endpoints tried when the configured one is unreachable
const FALLBACK_WEBDRIVER_URLS: &[&str] = &[
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4444", // Selenium / geckodriver default
    "http://127.0.0.1:4444",
];

/// Search driver backed by a WebDriver browser session
pub struct WebDriverSearch {
    client: Client,
    webdriver_url: String,
    capabilities: Capabilities,
    page_load_timeout: Duration,
    challenge_timeout: Duration,
    challenge_poll: Duration,
}

impl WebDriverSearch {
    /// Opens a browser session.
    ///
    /// Tries the configured WebDriver URL first, then the usual local
    /// endpoints. Failing all of them is fatal for the session.
    pub async fn connect(config: &ScavengerConfig) -> Result<Self, DriverError> {
        let capabilities = browser_capabilities(config.headless);
        let (client, webdriver_url) =
            connect_to_webdriver(&config.webdriver_url, &capabilities).await?;

        let driver = Self {
            client,
            webdriver_url,
            capabilities,
            page_load_timeout: Duration::from_secs(config.page_load_timeout_secs),
            challenge_timeout: Duration::from_secs(config.challenge_timeout_secs),
            challenge_poll: Duration::from_millis(config.challenge_poll_ms.max(1)),
        };
        driver.apply_timeouts().await;
        Ok(driver)
    }

    /// WebDriver endpoint the session is connected to
    pub fn webdriver_url(&self) -> &str {
        &self.webdriver_url
    }

    async fn apply_timeouts(&self) {
        let timeouts = TimeoutConfiguration::new(None, Some(self.page_load_timeout), None);
        if let Err(e) = self.client.update_timeouts(timeouts).await {
            ::log::warn!("Could not set page load timeout: {}", e);
        }
    }

    /// Navigates to a results page and returns its source once no challenge is showing
    async fn load_results_page(&self, engine: Engine, url: &str) -> Result<String, DriverError> {
        match timeout(NAVIGATION_TIMEOUT, self.client.goto(url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(command_error(e, "navigating to", url)),
            Err(_) => {
                return Err(DriverError::Navigation {
                    url: url.to_string(),
                    message: format!("timed out after {}s", NAVIGATION_TIMEOUT.as_secs()),
                });
            }
        }

        self.wait_for_results(engine, url).await
    }

    /// Polls the page until the engine's challenge markers are gone or the
    /// challenge timeout passes
    async fn wait_for_results(&self, engine: Engine, url: &str) -> Result<String, DriverError> {
        let started = Instant::now();
        let mut warned = false;

        loop {
            let html = self
                .client
                .source()
                .await
                .map_err(|e| command_error(e, "getting source for", url))?;
            let current_url = match self.client.current_url().await {
                Ok(current) => current.to_string(),
                Err(_) => url.to_string(),
            };

            if !engine.is_challenge(&current_url, &html) {
                if warned {
                    ::log::info!("Verification challenge cleared on {}", engine);
                }
                return Ok(html);
            }

            if started.elapsed() >= self.challenge_timeout {
                return Err(DriverError::Blocked(current_url));
            }

            if !warned {
                ::log::warn!(
                    "{} is showing a verification challenge, waiting up to {}s",
                    engine,
                    self.challenge_timeout.as_secs()
                );
                warned = true;
            }
            tokio::time::sleep(self.challenge_poll).await;
        }
    }

    /// Replaces a dead session with a fresh one
    async fn attempt_reconnect(&mut self) -> bool {
        ::log::warn!("Attempting to reconnect WebDriver session");
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities.clone());
        match builder.connect(&self.webdriver_url).await {
            Ok(new_client) => {
                self.client = new_client;
                self.apply_timeouts().await;
                ::log::info!("Successfully reconnected to WebDriver");
                true
            }
            Err(e) => {
                ::log::error!("Failed to reconnect to WebDriver: {}", e);
                false
            }
        }
    }
}

impl SearchDriver for WebDriverSearch {
    async fn search(&mut self, request: &PageRequest) -> Result<Vec<Candidate>, DriverError> {
        let url = request
            .engine
            .search_url(&request.query, request.page_index)
            .map_err(|e| DriverError::Navigation {
                url: request.engine.name().to_string(),
                message: e.to_string(),
            })?;
        ::log::info!("Searching {}: {}", request.engine, url);

        let started = Instant::now();
        let result = self.load_results_page(request.engine, url.as_str()).await;

        let html = match result {
            Ok(html) => html,
            Err(DriverError::SessionLost(message)) => {
                self.attempt_reconnect().await;
                return Err(DriverError::SessionLost(message));
            }
            Err(e) => return Err(e),
        };

        let candidates = request.engine.parse_results(&html)?;
        ::log::debug!(
            "Processed {} page {} in {:.2} seconds",
            request.engine,
            request.page_index + 1,
            started.elapsed().as_secs_f64()
        );
        Ok(candidates)
    }

    async fn close(self) {
        if let Err(e) = self.client.close().await {
            ::log::warn!("Failed to close WebDriver session: {}", e);
        }
    }
}

/// Capabilities for a headless-capable Chrome or Firefox session
fn browser_capabilities(headless: bool) -> Capabilities {
    let mut chrome_args = vec![
        "--disable-gpu",
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--disable-extensions",
        "--log-level=3",
    ];
    let mut firefox_args = Vec::new();
    if headless {
        chrome_args.insert(0, "--headless=new");
        firefox_args.push("-headless");
    }

    let mut capabilities = Capabilities::new();
    capabilities.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": chrome_args }),
    );
    capabilities.insert(
        "moz:firefoxOptions".to_string(),
        json!({ "args": firefox_args }),
    );
    capabilities
}

/// Connects to the configured WebDriver URL, falling back to common local endpoints
async fn connect_to_webdriver(
    webdriver_url: &str,
    capabilities: &Capabilities,
) -> Result<(Client, String), DriverError> {
    let mut builder = ClientBuilder::native();
    builder.capabilities(capabilities.clone());

    let last_error = match builder.connect(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Ok((client, webdriver_url.to_string()));
        }
        Err(e) => {
            ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
            e.to_string()
        }
    };

    for url in FALLBACK_WEBDRIVER_URLS {
        if *url == webdriver_url {
            continue;
        }

        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = builder.connect(url).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Ok((client, url.to_string()));
        }
    }

    ::log::error!(
        "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
    );
    Err(DriverError::Connect(format!(
        "{}: {}",
        webdriver_url, last_error
    )))
}

/// True if the error means the browser session is gone
fn is_session_lost(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("unable to find session")
        || message.contains("invalid session id")
        || message.contains("no such window")
        || message.contains("session deleted")
}

fn command_error(error: CmdError, context: &str, url: &str) -> DriverError {
    let message = error.to_string();
    if is_session_lost(&message) {
        ::log::warn!("Lost session while {} {}", context, url);
        DriverError::SessionLost(message)
    } else if context.starts_with("getting source") {
        DriverError::Source(message)
    } else {
        DriverError::Navigation {
            url: url.to_string(),
            message,
        }
    }
}
