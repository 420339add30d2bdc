//! Scrape command: expands, extracts and writes every selected page.

use crate::catalog::models::{PageOutcome, Record, ScrapeReport};
use crate::catalog::pages::Page;
use crate::catalog::parser::Parser;
use crate::catalog::session::{BrowserSession, ChromiumSession};
use crate::catalog::PageLoader;
use crate::config::{Config, FailurePolicy};
use crate::format::CsvWriter;
use anyhow::{Context, Result};
use tracing::{error, info, warn};

/// Runs the page loader, record extractor and CSV writer per page.
pub struct ScrapeCommand {
    config: Config,
    pages: Vec<Page>,
}

impl ScrapeCommand {
    /// Creates a scrape command over all pages.
    pub fn new(config: Config) -> Self {
        Self { config, pages: Page::all().to_vec() }
    }

    /// Restricts the run to `pages`. Processing order stays the canonical one.
    pub fn with_pages(mut self, pages: &[Page]) -> Self {
        if !pages.is_empty() {
            self.pages = Page::all().iter().copied().filter(|p| pages.contains(p)).collect();
        }
        self
    }

    /// Returns the pages this command will process, in order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Launches a browser, scrapes the pages, and always shuts the
    /// browser down before returning.
    pub async fn execute(&self) -> Result<ScrapeReport> {
        let session = ChromiumSession::launch(&self.config.browser)
            .await
            .context("Failed to start browser session")?;

        self.execute_and_close(&session).await
    }

    /// Scrapes the pages with `session`, then closes it exactly once
    /// whether or not the scrape succeeded. A close error is returned only
    /// when the scrape itself succeeded.
    pub async fn execute_and_close(&self, session: &dyn BrowserSession) -> Result<ScrapeReport> {
        let result = self.execute_with_session(session).await;

        if let Err(e) = session.close().await {
            if result.is_ok() {
                return Err(e);
            }
            warn!("Failed to close browser: {:#}", e);
        }

        result
    }

    /// Scrapes the pages with a provided session (for testing). The
    /// session is left open; closing it is the caller's job.
    pub async fn execute_with_session(&self, session: &dyn BrowserSession) -> Result<ScrapeReport> {
        let parser = Parser::new(&self.config.selectors).context("Invalid selector configuration")?;
        let loader = PageLoader::new(&self.config.selectors, &self.config.expansion);
        let writer = CsvWriter::new(&self.config.output_dir);

        let mut report = ScrapeReport::new();

        for &page in &self.pages {
            let url = page.url(&self.config.base_url);
            info!("Scraping {} ({})", page, url);

            let scraped = async {
                let summary = loader.load(session, &url).await?;
                let items = session.outer_html_all(&self.config.selectors.item).await?;
                let records = parser.parse_items(&items)?;
                Ok::<(usize, Vec<Record>), anyhow::Error>((summary.clicks, records))
            }
            .await
            .with_context(|| format!("Failed to scrape page '{}'", page));

            let outcome = match scraped.and_then(|(clicks, records)| {
                let path = writer.write(&page.file_name(), &records)?;
                Ok(PageOutcome::Written { records: records.len(), clicks, path })
            }) {
                Ok(outcome) => outcome,
                Err(e) => match self.config.on_error {
                    FailurePolicy::Abort => return Err(e),
                    FailurePolicy::Continue => {
                        error!("{:#}", e);
                        PageOutcome::Failed { error: e }
                    }
                },
            };

            if let PageOutcome::Written { records, path, .. } = &outcome {
                info!("Wrote {} records to {}", records, path.display());
            }
            report.push(page, outcome);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn item(title: &str, price: &str) -> String {
        format!(
            r#"<div class="product-wrapper">
                <h4 class="price">{price}</h4>
                <a class="title" title="{title}">{title}</a>
                <p class="description">about {title}</p>
                <p class="review-count">1 reviews</p>
                <span class="ws-icon ws-icon-star"></span>
            </div>"#
        )
    }

    /// Serves a fixed item list per URL; no load-more control anywhere.
    struct StaticSession {
        pages: HashMap<String, Vec<String>>,
        current: Mutex<Option<String>>,
        closes: AtomicUsize,
        fail_close: bool,
    }

    impl StaticSession {
        fn new(config: &Config, pages: Vec<(Page, Vec<String>)>) -> Self {
            let pages =
                pages.into_iter().map(|(p, items)| (p.url(&config.base_url), items)).collect();
            Self {
                pages,
                current: Mutex::new(None),
                closes: AtomicUsize::new(0),
                fail_close: false,
            }
        }

        fn failing_close(mut self) -> Self {
            self.fail_close = true;
            self
        }

        fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }

        fn items(&self) -> Vec<String> {
            let current = self.current.lock().unwrap();
            current.as_ref().and_then(|url| self.pages.get(url)).cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl BrowserSession for StaticSession {
        async fn navigate(&self, url: &str) -> Result<()> {
            *self.current.lock().unwrap() = Some(url.to_string());
            Ok(())
        }

        async fn display(&self, _selector: &str) -> Result<Option<String>> {
            Ok(None)
        }

        async fn click(&self, _selector: &str) -> Result<bool> {
            Ok(false)
        }

        async fn count(&self, _selector: &str) -> Result<usize> {
            Ok(self.items().len())
        }

        async fn outer_html_all(&self, _selector: &str) -> Result<Vec<String>> {
            Ok(self.items())
        }

        async fn close(&self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                anyhow::bail!("browser already gone");
            }
            Ok(())
        }
    }

    fn test_config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.base_url = "http://shop.test/more/".to_string();
        config.output_dir = dir.to_path_buf();
        config.expansion.poll_jitter_ms = 0;
        config
    }

    #[test]
    fn test_with_pages_keeps_canonical_order() {
        let cmd = ScrapeCommand::new(Config::default()).with_pages(&[Page::Touch, Page::Home]);
        assert_eq!(cmd.pages(), &[Page::Home, Page::Touch]);

        let cmd = ScrapeCommand::new(Config::default()).with_pages(&[]);
        assert_eq!(cmd.pages().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_one_file_per_page() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let session = StaticSession::new(
            &config,
            Page::all().iter().map(|&p| (p, vec![item(p.name(), "$1.00")])).collect(),
        );

        let report = ScrapeCommand::new(config).execute_with_session(&session).await.unwrap();

        assert_eq!(report.written(), 6);
        assert_eq!(report.total_records(), 6);
        for page in Page::all() {
            let content = std::fs::read_to_string(dir.path().join(page.file_name())).unwrap();
            assert!(content.contains(&format!("{0},about {0},1.0,1,1", page.name())));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_policy_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let session = StaticSession::new(
            &config,
            vec![
                (Page::Home, vec![item("A", "$1.00")]),
                (Page::Computers, vec![item("B", "$1.00"), item("C", "N/A")]),
                (Page::Laptops, vec![item("D", "$1.00")]),
            ],
        );

        let err = ScrapeCommand::new(config).execute_with_session(&session).await.unwrap_err();

        assert!(format!("{:#}", err).contains("computers"));
        assert!(dir.path().join("home.csv").exists());
        assert!(!dir.path().join("computers.csv").exists());
        assert!(!dir.path().join("laptops.csv").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_continue_policy_skips_failed_page() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.on_error = FailurePolicy::Continue;
        let session = StaticSession::new(
            &config,
            vec![
                (Page::Home, vec![item("A", "$1.00")]),
                (Page::Computers, vec![item("C", "N/A")]),
                (Page::Laptops, vec![item("D", "$1.00")]),
            ],
        );

        let report = ScrapeCommand::new(config).execute_with_session(&session).await.unwrap();

        assert_eq!(report.failed(), vec![Page::Computers]);
        assert!(report.has_failures());
        assert!(dir.path().join("laptops.csv").exists());
        assert!(!dir.path().join("computers.csv").exists());
        // Pages with no items still get a header-only file
        let tablets = std::fs::read_to_string(dir.path().join("tablets.csv")).unwrap();
        assert_eq!(tablets, "title,description,price,rating,num_of_reviews\n");
    }

    #[tokio::test]
    async fn test_invalid_selector_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.selectors.star = "<<".to_string();
        let session = StaticSession::new(&config, Vec::new());

        let err = ScrapeCommand::new(config).execute_with_session(&session).await.unwrap_err();
        assert!(err.to_string().contains("Invalid selector configuration"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_closed_once_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let session = StaticSession::new(&config, vec![(Page::Home, vec![item("A", "$1.00")])]);

        let report = ScrapeCommand::new(config)
            .with_pages(&[Page::Home])
            .execute_and_close(&session)
            .await
            .unwrap();

        assert_eq!(report.written(), 1);
        assert_eq!(session.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_closed_once_after_aborted_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let session = StaticSession::new(&config, vec![(Page::Home, vec![item("A", "N/A")])]);

        let err = ScrapeCommand::new(config).execute_and_close(&session).await.unwrap_err();

        assert!(format!("{:#}", err).contains("home"));
        assert_eq!(session.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_error_returned_after_successful_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let session = StaticSession::new(&config, vec![(Page::Home, vec![item("A", "$1.00")])])
            .failing_close();

        let err = ScrapeCommand::new(config)
            .with_pages(&[Page::Home])
            .execute_and_close(&session)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("browser already gone"));
        assert_eq!(session.closes(), 1);
        assert!(dir.path().join("home.csv").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scrape_error_wins_over_close_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let session = StaticSession::new(&config, vec![(Page::Home, vec![item("A", "N/A")])])
            .failing_close();

        let err = ScrapeCommand::new(config).execute_and_close(&session).await.unwrap_err();

        let msg = format!("{:#}", err);
        assert!(msg.contains("Failed to scrape page 'home'"));
        assert!(!msg.contains("browser already gone"));
        assert_eq!(session.closes(), 1);
    }
}
