use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;
use web_scavenger::config::{ScavengerConfig, WEBDRIVER_URL_ENV};
use web_scavenger::persistence::ResultWriter;
use web_scavenger::{AbortHandle, Category, Scavenger, ScavengerError, SessionEvent, SessionReport};

mod args;
use args::Args;

/// Invalid input or no browser backend
const EXIT_FATAL: u8 = 1;
/// Search finished but the results file could not be written
const EXIT_PERSIST_FAILED: u8 = 2;
/// Some pages were skipped or the user interrupted the search
const EXIT_PARTIAL: u8 = 3;
/// Conventional status for a process ended by SIGINT
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging
    if let Err(e) = init_logging(args.log_file.as_deref()) {
        eprintln!("Could not open log file: {}", e);
        return ExitCode::from(EXIT_FATAL);
    }

    println!("\nWeb Scavenger");

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("{}", e);
            eprintln!("{}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    let (query, config) = match args.query.clone() {
        Some(query) => (query, config),
        None => match prompt_for_search(config) {
            Ok(input) => input,
            Err(e) => {
                eprintln!("Could not read input: {}", e);
                return ExitCode::from(EXIT_FATAL);
            }
        },
    };

    println!("Note: searching requires a WebDriver server (e.g., ChromeDriver).");
    println!(
        "Set {} if not using the default {}",
        WEBDRIVER_URL_ENV,
        config.webdriver_url
    );
    println!("\nStarting search...");
    println!("This may take a few minutes...");

    let output_dir = config.output_dir.clone();
    let mut handle = match Scavenger::new(query).with_config(config).start().await {
        Ok(handle) => handle,
        Err(e) => {
            ::log::error!("Failed to start search: {}", e);
            eprintln!("\n{}", e);
            if let ScavengerError::DriverInit(_) = e {
                eprintln!("Make sure a WebDriver server is running.");
            }
            return ExitCode::from(EXIT_FATAL);
        }
    };

    // First Ctrl-C stops issuing searches and saves what was found; a second one exits
    let abort = handle.abort_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match handle_interrupt(&abort) {
                Interrupt::StopSearch => {
                    println!(
                        "\nSearch interrupted by user, finishing current page (Ctrl-C again to exit)"
                    );
                    ::log::info!("Search interrupted by user");
                }
                Interrupt::ForceExit => {
                    ::log::warn!("Second interrupt, exiting without saving results");
                    eprintln!("\nInterrupted again, exiting without saving results");
                    std::process::exit(EXIT_INTERRUPTED);
                }
            }
        }
    });

    while let Some(event) = handle.next_event().await {
        print_progress(&event);
    }

    let report = match handle.join().await {
        Ok(report) => report,
        Err(e) => {
            ::log::error!("Search session failed: {}", e);
            eprintln!("\nAn error occurred: {}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    print_summary(&report);

    let writer = ResultWriter::new(output_dir);
    match writer.write(&report.results) {
        Ok(path) => {
            println!("\nResults saved to {}", path.display());
        }
        Err(e) => {
            ::log::error!("Error saving results: {}", e);
            eprintln!("\nError saving results: {}", e);
            return ExitCode::from(EXIT_PERSIST_FAILED);
        }
    }

    if report.is_complete() {
        println!("\nSearch completed!");
        ExitCode::SUCCESS
    } else {
        println!("\nSearch finished with skipped pages or was interrupted.");
        ExitCode::from(EXIT_PARTIAL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// Stop issuing searches and save the partial results
    StopSearch,
    /// The session was already stopping; leave immediately
    ForceExit,
}

fn handle_interrupt(abort: &AbortHandle) -> Interrupt {
    if abort.is_aborted() {
        Interrupt::ForceExit
    } else {
        abort.abort();
        Interrupt::StopSearch
    }
}

fn init_logging(log_file: Option<&Path>) -> io::Result<()> {
    let default_level = if log_file.is_some() { "info" } else { "warn" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

/// Config file (or defaults), then WEBDRIVER_URL, then command-line flags
fn load_config(args: &Args) -> Result<ScavengerConfig, ScavengerError> {
    let config = match &args.config {
        Some(path) => ScavengerConfig::from_file(path)?,
        None => ScavengerConfig::default(),
    };
    Ok(args.apply_to(config.apply_env_overrides()))
}

/// Asks for the query and page count when no query was given on the command line
fn prompt_for_search(mut config: ScavengerConfig) -> io::Result<(String, ScavengerConfig)> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    print!("\nEnter your search query: ");
    io::stdout().flush()?;
    let query = lines.next().transpose()?.unwrap_or_default();

    print!(
        "Enter number of pages to search (default: {}): ",
        config.pages_per_engine
    );
    io::stdout().flush()?;
    let pages = lines.next().transpose()?.unwrap_or_default();
    if let Ok(pages) = pages.trim().parse::<usize>() {
        if pages > 0 {
            config.pages_per_engine = pages;
        }
    }

    Ok((query.trim().to_string(), config))
}

fn print_progress(event: &SessionEvent) {
    match event {
        SessionEvent::EngineStarted { engine } => println!("\nSearching {}...", engine),
        SessionEvent::LinkAccepted(link) => println!("  [{}] {}", link.category, link.url),
        SessionEvent::PageBlocked { engine, page_index } => println!(
            "  {} page {} skipped: verification challenge did not clear",
            engine,
            page_index + 1
        ),
        SessionEvent::PageFailed {
            engine,
            page_index,
            attempts,
        } => println!(
            "  {} page {} skipped after {} attempts",
            engine,
            page_index + 1,
            attempts
        ),
        _ => {}
    }
}

fn print_summary(report: &SessionReport) {
    let summary = &report.summary;
    println!("\nResults summary:");
    for category in Category::ALL {
        let count = summary.per_category.get(&category).copied().unwrap_or(0);
        println!("{}: {} links found", category.as_str().to_uppercase(), count);
    }
    println!(
        "\nPages: {} ok, {} blocked, {} failed",
        summary.pages_succeeded, summary.pages_blocked, summary.pages_failed
    );
    println!(
        "Links: {} kept, {} rejected, {} duplicates",
        summary.links_accepted, summary.links_rejected, summary.duplicates
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_interrupt_forces_exit() {
        let abort = AbortHandle::new();
        assert_eq!(handle_interrupt(&abort), Interrupt::StopSearch);
        assert!(abort.is_aborted());
        assert_eq!(handle_interrupt(&abort), Interrupt::ForceExit);
        assert_eq!(handle_interrupt(&abort), Interrupt::ForceExit);
    }
}
