//! Page loader: opens a catalog page and expands it until every item is
//! present in the document.

use crate::catalog::selectors::Selectors;
use crate::catalog::session::BrowserSession;
use crate::catalog::wait::{poll_until, Backoff, Poll};
use crate::config::ExpansionConfig;
use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const UNSEEN: usize = usize::MAX;

/// Expansion failures that abort the page.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("load-more control had no effect within {timeout_ms}ms (after {clicks} clicks)")]
    Stalled { clicks: usize, timeout_ms: u64 },

    #[error("load-more control still visible after {max_clicks} clicks")]
    TooManyClicks { max_clicks: usize },
}

/// What the loader observed while expanding a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    /// Whether a cookie banner was dismissed
    pub cookies_accepted: bool,
    /// Number of times the load-more control was activated
    pub clicks: usize,
    /// Items present once expansion finished
    pub items: usize,
}

/// Drives a [`BrowserSession`] to a fully expanded listing.
pub struct PageLoader<'a> {
    selectors: &'a Selectors,
    backoff: Backoff,
    max_clicks: usize,
}

impl<'a> PageLoader<'a> {
    /// Creates a loader using the given selectors and expansion settings.
    pub fn new(selectors: &'a Selectors, expansion: &ExpansionConfig) -> Self {
        let backoff = Backoff::new(
            Duration::from_millis(expansion.poll_initial_ms),
            Duration::from_millis(expansion.poll_max_ms),
            Duration::from_millis(expansion.settle_timeout_ms),
        )
        .with_jitter(Duration::from_millis(expansion.poll_jitter_ms));

        Self { selectors, backoff, max_clicks: expansion.max_clicks }
    }

    /// Navigates to `url`, dismisses the cookie banner if shown, then
    /// clicks "load more" until the control is gone or hidden.
    pub async fn load(&self, session: &dyn BrowserSession, url: &str) -> Result<LoadSummary> {
        session.navigate(url).await?;

        let cookies_accepted = self.accept_cookies(session).await?;

        let mut clicks = 0;
        while self.expand_visible(session).await? {
            if clicks >= self.max_clicks {
                return Err(LoadError::TooManyClicks { max_clicks: self.max_clicks }.into());
            }

            let before = session.count(&self.selectors.item).await?;
            if !session.click(&self.selectors.expand).await? {
                debug!("Load-more control vanished before it could be clicked");
                break;
            }
            clicks += 1;
            debug!("Clicked load-more ({} items before click #{})", before, clicks);

            self.wait_for_growth(session, before, clicks).await?;
        }

        let items = self.wait_for_stable_count(session).await?;

        info!("Expanded {} with {} clicks ({} items)", url, clicks, items);
        Ok(LoadSummary { cookies_accepted, clicks, items })
    }

    async fn accept_cookies(&self, session: &dyn BrowserSession) -> Result<bool> {
        let clicked = session.click(&self.selectors.cookie_accept).await?;
        if clicked {
            debug!("Accepted cookie banner");
        } else {
            debug!("No cookie banner");
        }
        Ok(clicked)
    }

    /// Absent and `display: none` both mean there is nothing left to load.
    async fn expand_visible(&self, session: &dyn BrowserSession) -> Result<bool> {
        Ok(match session.display(&self.selectors.expand).await? {
            None => {
                debug!("No load-more control");
                false
            }
            Some(display) if display == "none" => {
                debug!("Load-more control hidden");
                false
            }
            Some(_) => true,
        })
    }

    /// Waits until the click either added items or retired the control.
    async fn wait_for_growth(
        &self,
        session: &dyn BrowserSession,
        before: usize,
        clicks: usize,
    ) -> Result<()> {
        let outcome = poll_until(self.backoff, || async move {
            let now = session.count(&self.selectors.item).await?;
            if now > before {
                return Ok(Some(()));
            }
            Ok((!self.expand_visible(session).await?).then_some(()))
        })
        .await?;

        match outcome {
            Poll::Ready(()) => Ok(()),
            Poll::TimedOut => Err(LoadError::Stalled {
                clicks,
                timeout_ms: self.backoff.timeout.as_millis() as u64,
            }
            .into()),
        }
    }

    /// Waits for two consecutive equal item counts. A timeout here is
    /// tolerated: the control is already gone, so we take what is there.
    async fn wait_for_stable_count(&self, session: &dyn BrowserSession) -> Result<usize> {
        let last = AtomicUsize::new(UNSEEN);

        let outcome = poll_until(self.backoff, || {
            let last = &last;
            async move {
                let now = session.count(&self.selectors.item).await?;
                let previous = last.swap(now, Ordering::SeqCst);
                Ok((previous == now).then_some(now))
            }
        })
        .await?;

        match outcome {
            Poll::Ready(count) => Ok(count),
            Poll::TimedOut => {
                let count = last.load(Ordering::SeqCst);
                warn!("Item count still changing after expansion; using {} items", count);
                Ok(count)
            }
        }
    }
}
