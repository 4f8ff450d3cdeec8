use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use web_scavenger::Engine;
use web_scavenger::config::ScavengerConfig;

#[derive(Parser, Debug)]
#[command(name = "web-scavenger")]
#[command(about = "Searches Google and Bing and collects links to downloadable files")]
#[command(version)]
pub struct Args {
    /// Search query (asked for interactively when omitted)
    pub query: Option<String>,

    /// Number of results pages to request from each engine
    #[arg(short, long, value_parser = parse_pages)]
    pub pages: Option<usize>,

    /// Search engine to query; repeat to query several, in order
    #[arg(short, long = "engine", value_enum)]
    pub engines: Vec<EngineArg>,

    /// Path to a JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory to write the results file to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// WebDriver server URL (overrides WEBDRIVER_URL and the config file)
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Write log output to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub show_browser: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum EngineArg {
    Google,
    Bing,
}

/// Convert from CLI argument engine to internal engine
pub fn convert_engine(arg: EngineArg) -> Engine {
    match arg {
        EngineArg::Google => Engine::Google,
        EngineArg::Bing => Engine::Bing,
    }
}

/// Page count: a positive integer that fits the platform's `usize`
fn parse_pages(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(pages) => Ok(pages),
        Err(e) => Err(format!("{e}")),
    }
}

impl Args {
    /// Applies command-line overrides on top of a loaded configuration
    pub fn apply_to(&self, mut config: ScavengerConfig) -> ScavengerConfig {
        if let Some(pages) = self.pages {
            config.pages_per_engine = pages;
        }
        if !self.engines.is_empty() {
            config.engines = self.engines.iter().copied().map(convert_engine).collect();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(url) = &self.webdriver_url {
            config.webdriver_url = url.clone();
        }
        if self.show_browser {
            config.headless = false;
        }
        config
    }
}
