//! Crawl coordinator - main crawl orchestration logic
//!
//! This module contains the page loop that drives a run:
//! fetch -> extract -> record -> resolve next -> delay -> repeat,
//! bounded by the page limit and a visited set that stops cyclic pagination.
//! It also holds the `Engine`, which allows one active run at a time and can
//! move a run onto a background task that reports over a channel.

use crate::config::{validate, CrawlConfig};
use crate::crawler::events::{CancelFlag, CrawlEvent, StatusReporter};
use crate::crawler::extractor::{compile_selector, extract_table, Extractor, Table};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::pagination::{find_next_in, resolve};
use crate::crawler::result::{CrawlResult, ExtractedRecord};
use crate::{CrawlError, FetchError, TrawlError};
use chrono::Utc;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use url::Url;

/// Values and next-page target found on one page
struct PageScan {
    values: Vec<String>,
    next_href: Option<String>,
}

/// Drives a single crawl run
///
/// Owns the run's HTTP session; consuming `run` releases it when the run ends.
pub struct Coordinator {
    config: Arc<CrawlConfig>,
    fetcher: Fetcher,
    extractor: Extractor,
    next_selector: Option<Selector>,
    reporter: StatusReporter,
    cancel: CancelFlag,
}

impl Coordinator {
    /// Creates a coordinator, compiling selectors and opening a fresh session
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(TrawlError::Extract)` - A selector is invalid
    /// * `Err(TrawlError::Config)` - Another setting is out of range (e.g. `max_pages == 0`)
    /// * `Err(TrawlError::Client)` - The HTTP client could not be built
    pub fn new(config: CrawlConfig) -> Result<Self, TrawlError> {
        let extractor = Extractor::new(&config.selector, config.attribute.as_deref())?;
        let next_selector = config
            .next_selector
            .as_deref()
            .map(compile_selector)
            .transpose()?;
        validate(&config)?;
        let fetcher = Fetcher::new(&config)?;

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            extractor,
            next_selector,
            reporter: StatusReporter::default(),
            cancel: CancelFlag::default(),
        })
    }

    /// Sends status events to `tx` during the run
    pub fn with_events(mut self, tx: Option<UnboundedSender<CrawlEvent>>) -> Self {
        self.reporter = StatusReporter::new(tx);
        self
    }

    /// Stops the run before the next fetch once `cancel` is set
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs the page loop to completion
    ///
    /// Stops without error when there is no next link, the page limit is
    /// reached, the next URL was already visited, or the run is cancelled.
    /// A fetch failure aborts the run; records gathered so far are dropped.
    pub async fn run(self) -> Result<CrawlResult, CrawlError> {
        let started_at = Utc::now();
        let mut visited: HashSet<String> = HashSet::new();
        let mut visited_order: Vec<String> = Vec::new();
        let mut records: Vec<ExtractedRecord> = Vec::new();
        let mut pages: u32 = 0;
        let mut next_url = Some(normalize_start_url(&self.config.start_url));

        tracing::info!(
            "Starting crawl at {} (max {} page(s), delay {}ms)",
            self.config.start_url,
            self.config.max_pages,
            self.config.delay_ms
        );

        while let Some(url) = next_url.take() {
            if !self.may_fetch(&url, pages, &visited) {
                break;
            }

            self.reporter.status(format!("Fetching {}...", url));
            let html = self
                .fetcher
                .fetch(&url)
                .await
                .map_err(|source| CrawlError::Fetch {
                    url: url.clone(),
                    page: pages + 1,
                    source,
                })?;
            visited.insert(url.clone());
            visited_order.push(url.clone());

            self.reporter.status("Extracting...");
            let scan = self.scan_page(&html);
            pages += 1;
            tracing::debug!("Page {} ({}): {} item(s)", pages, url, scan.values.len());

            records.extend(
                scan.values
                    .into_iter()
                    .map(|value| ExtractedRecord::new(url.as_str(), value)),
            );

            let Some(href) = scan.next_href else {
                tracing::debug!("No next page link on {}", url);
                break;
            };

            let next = resolve(&url, &href).map_err(|source| CrawlError::Resolve {
                url: url.clone(),
                page: pages,
                href: href.clone(),
                source,
            })?;

            if !self.may_fetch(&next, pages, &visited) {
                break;
            }

            self.pause().await;
            next_url = Some(next);
        }

        let result = CrawlResult {
            records,
            pages_fetched: pages,
            visited: visited_order,
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            "Crawl completed: {} item(s) from {} page(s) in {:.2}s",
            result.items_found(),
            result.pages_fetched,
            result.elapsed_seconds()
        );

        Ok(result)
    }

    /// The checks made before every fetch: cancellation, page limit, cycles
    fn may_fetch(&self, url: &str, pages: u32, visited: &HashSet<String>) -> bool {
        if self.cancel.is_cancelled() {
            tracing::info!("Crawl cancelled after {} page(s)", pages);
            return false;
        }
        if pages >= self.config.max_pages {
            tracing::debug!("Page limit of {} reached", self.config.max_pages);
            return false;
        }
        if visited.contains(url) {
            tracing::debug!("{} already visited, stopping", url);
            return false;
        }
        true
    }

    /// Parses the page once for both extraction and the next link
    fn scan_page(&self, html: &str) -> PageScan {
        let document = Html::parse_document(html);
        let values = self.extractor.extract_from(&document);
        let next_href = self
            .next_selector
            .as_ref()
            .and_then(|selector| find_next_in(&document, selector))
            .filter(|href| !href.trim().is_empty());

        PageScan { values, next_href }
    }

    /// Politeness delay between pages
    async fn pause(&self) {
        let delay = self.config.delay();
        if delay.is_zero() {
            return;
        }
        self.reporter
            .status(format!("Waiting {} ms...", delay.as_millis()));
        tokio::time::sleep(delay).await;
    }
}

/// Parses and re-serializes the start URL so it compares equal to resolved links
fn normalize_start_url(start_url: &str) -> String {
    Url::parse(start_url)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| start_url.to_string())
}

/// Runs a crawl to completion on the current task
///
/// # Example
///
/// ```no_run
/// use pagetrawl::config::CrawlConfig;
/// use pagetrawl::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut config = CrawlConfig::new("https://example.com/list", "li.item");
/// config.next_selector = Some("a.next".to_string());
/// config.max_pages = 5;
/// let result = run_crawl(config).await?;
/// println!("{}", result.status_line());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: CrawlConfig) -> Result<CrawlResult, TrawlError> {
    Engine::new().run(config).await
}

/// Fetches only the start page and returns its extracted values
///
/// No pagination and no delay; a fresh session is used.
pub async fn preview(config: &CrawlConfig) -> Result<Vec<String>, TrawlError> {
    let extractor = Extractor::new(&config.selector, config.attribute.as_deref())?;
    validate(config)?;
    let fetcher = Fetcher::new(config)?;
    let html = fetcher
        .fetch(&config.start_url)
        .await
        .map_err(|source| CrawlError::Fetch {
            url: config.start_url.clone(),
            page: 1,
            source,
        })?;

    let values = extractor.extract(&html);
    tracing::info!("Preview: {} items found on single page", values.len());
    Ok(values)
}

/// Fetches the start page (optionally by form post) and extracts a table
///
/// With `form` set, the session is primed with a GET of the start URL and
/// the fields are then posted to it.
pub async fn fetch_table(
    config: &CrawlConfig,
    table_selector: &str,
    form: Option<&[(String, String)]>,
) -> Result<Option<Table>, TrawlError> {
    validate(config)?;
    let fetcher = Fetcher::new(config)?;
    let url = config.start_url.as_str();
    let wrap = |source: FetchError| CrawlError::Fetch {
        url: url.to_string(),
        page: 1,
        source,
    };

    let html = match form {
        Some(fields) => {
            fetcher.prime(url).await.map_err(wrap)?;
            fetcher.submit_form(url, fields).await.map_err(wrap)?
        }
        None => fetcher.fetch(url).await.map_err(wrap)?,
    };

    let table = extract_table(&html, table_selector)?;
    match &table {
        None => tracing::warn!("No table matching '{}' on {}", table_selector, url),
        Some(t) if t.is_empty() => tracing::info!("Table found on {} but it holds no data", url),
        Some(t) => tracing::info!("Extracted {} row(s) from {}", t.rows.len(), url),
    }
    Ok(table)
}

/// Clears the engine's active flag when a run ends, however it ends
struct ActiveRun(Arc<AtomicBool>);

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Entry point for crawl runs; permits one active run at a time
#[derive(Debug, Clone, Default)]
pub struct Engine {
    active: Arc<AtomicBool>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a run started by this engine is in progress
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn acquire(&self) -> Result<ActiveRun, TrawlError> {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| TrawlError::Busy)?;
        Ok(ActiveRun(Arc::clone(&self.active)))
    }

    /// Runs a crawl on the current task
    ///
    /// Fails with `TrawlError::Busy`, without side effects, if another run
    /// is active on this engine.
    pub async fn run(&self, config: CrawlConfig) -> Result<CrawlResult, TrawlError> {
        let _active = self.acquire()?;
        execute(config, None, CancelFlag::new()).await
    }

    /// Starts a crawl on a background task
    ///
    /// The returned handle yields `Status` events followed by exactly one
    /// `Finished` or `Failed` event. Must be called within a tokio runtime.
    pub fn spawn(&self, config: CrawlConfig) -> Result<RunHandle, TrawlError> {
        let active = self.acquire()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancelFlag::new();

        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                let outcome = {
                    let _active = active;
                    execute(config, Some(tx.clone()), cancel).await
                };
                let event = match outcome {
                    Ok(result) => CrawlEvent::Finished(result),
                    Err(e) => CrawlEvent::Failed(e),
                };
                let _ = tx.send(event);
            }
        });

        Ok(RunHandle {
            events: rx,
            cancel,
            task,
        })
    }
}

async fn execute(
    config: CrawlConfig,
    events: Option<UnboundedSender<CrawlEvent>>,
    cancel: CancelFlag,
) -> Result<CrawlResult, TrawlError> {
    let reporter = StatusReporter::new(events.clone());
    reporter.status("Starting scrape...");

    let outcome = match Coordinator::new(config) {
        Ok(coordinator) => coordinator
            .with_events(events)
            .with_cancel(cancel)
            .run()
            .await
            .map_err(TrawlError::from),
        Err(e) => Err(e),
    };

    match &outcome {
        Ok(result) => reporter.status(result.status_line()),
        Err(e) => {
            tracing::warn!("Crawl failed: {}", e);
            reporter.status("Error occurred.");
        }
    }

    outcome
}

/// Handle to a run executing on a background task
#[derive(Debug)]
pub struct RunHandle {
    pub events: UnboundedReceiver<CrawlEvent>,
    cancel: CancelFlag,
    task: JoinHandle<()>,
}

impl RunHandle {
    /// Asks the run to stop before its next fetch
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the run's cancel flag, usable while `events` is borrowed
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the next event; None once the run has ended and all events were read
    pub async fn next_event(&mut self) -> Option<CrawlEvent> {
        self.events.recv().await
    }

    /// Discards status events and returns the run's outcome
    pub async fn wait(mut self) -> Result<CrawlResult, TrawlError> {
        while let Some(event) = self.events.recv().await {
            match event {
                CrawlEvent::Status(_) => continue,
                CrawlEvent::Finished(result) => return Ok(result),
                CrawlEvent::Failed(e) => return Err(e),
            }
        }
        Err(TrawlError::WorkerStopped)
    }
}
