//! Scan orchestration
//!
//! A run loads the seen set, authenticates, rebuilds the account directory,
//! walks every account's recent posts, reposts unseen matches, trims the seen
//! set, and writes it back.
//!
//! State is passed explicitly: [`Scanner::scan`] takes the seen set by value
//! and hands back the updated one together with a [`ScanReport`].
//!
//! # Examples
//!
//! ```no_run
//! use libpressbot::platforms::mock::MockClient;
//! use libpressbot::scan::{run_once, RunOptions};
//! use libpressbot::seen::SeenStore;
//! use libpressbot::{KeywordClassifier, ScanPolicy};
//!
//! # async fn example() -> libpressbot::error::Result<()> {
//! let mut client = MockClient::success();
//! let store = SeenStore::new("data/processed_posts.json");
//! let options = RunOptions {
//!     list_uri: "at://did:plc:owner/app.bsky.graph.list/presses".to_string(),
//!     classifier: KeywordClassifier::default(),
//!     policy: ScanPolicy::default(),
//! };
//!
//! let report = run_once(&mut client, &store, &options).await?;
//! println!("Reposted {} posts", report.reposted.len());
//! # Ok(())
//! # }
//! ```

use tokio::time::sleep;
use tracing::{error, info};

use crate::classifier::KeywordClassifier;
use crate::config::{Config, ScanPolicy};
use crate::directory::AccountDirectory;
use crate::error::Result;
use crate::platforms::SocialClient;
use crate::seen::{SeenSet, SeenStore};
use crate::types::{Account, AccountFailure, ScanReport};

/// Everything a run needs besides the client and the store
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub list_uri: String,
    pub classifier: KeywordClassifier,
    pub policy: ScanPolicy,
}

impl From<&Config> for RunOptions {
    fn from(config: &Config) -> Self {
        Self {
            list_uri: config.list_uri.clone(),
            classifier: KeywordClassifier::new(&config.keywords),
            policy: config.policy.clone(),
        }
    }
}

/// Walks monitored accounts and reposts unseen matching posts
pub struct Scanner<'a> {
    client: &'a dyn SocialClient,
    classifier: &'a KeywordClassifier,
    policy: &'a ScanPolicy,
}

impl<'a> Scanner<'a> {
    pub fn new(
        client: &'a dyn SocialClient,
        classifier: &'a KeywordClassifier,
        policy: &'a ScanPolicy,
    ) -> Self {
        Self {
            client,
            classifier,
            policy,
        }
    }

    /// Scan every account in directory order
    ///
    /// A failure on one account is logged and recorded in the report; the
    /// remaining accounts are still scanned. `accounts_scanned` counts the
    /// accounts whose posts were all processed.
    pub async fn scan(
        &self,
        directory: &AccountDirectory,
        mut seen: SeenSet,
    ) -> (SeenSet, ScanReport) {
        info!("Checking for sales posts...");

        let mut report = ScanReport::default();
        let total = directory.len();

        for (position, account) in directory.iter().enumerate() {
            match self.scan_account(account, &mut seen, &mut report).await {
                Ok(()) => {
                    report.accounts_scanned += 1;

                    let is_last = position + 1 == total;
                    if !is_last && !self.policy.account_delay.is_zero() {
                        sleep(self.policy.account_delay).await;
                    }
                }
                Err(e) => {
                    error!("Error checking {}: {}", account.handle, e);
                    report.failures.push(AccountFailure {
                        handle: account.handle.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        (seen, report)
    }

    /// Process one account's recent posts
    ///
    /// Every unseen post is marked seen before any repost attempt, so a failed
    /// repost is not retried by later runs. A repost error stops the rest of
    /// this account's posts.
    async fn scan_account(
        &self,
        account: &Account,
        seen: &mut SeenSet,
        report: &mut ScanReport,
    ) -> Result<()> {
        let posts = self
            .client
            .fetch_recent_posts(&account.handle, self.policy.posts_per_account)
            .await?;
        tracing::debug!("Fetched {} posts from {}", posts.len(), account.handle);

        for post in posts {
            report.posts_examined += 1;

            if !seen.insert(post.uri.as_str()) {
                report.posts_already_seen += 1;
                continue;
            }

            if self.classifier.matches(&post.text) {
                info!("Found sales post from {}", account.display_name);
                self.client.repost(&post.uri, &post.cid).await?;
                report.reposted.push(post.uri);
            }
        }

        Ok(())
    }

    /// Trim the seen set according to policy, recording the count in the report
    pub fn evict(&self, mut seen: SeenSet, report: &mut ScanReport) -> SeenSet {
        let evicted = seen.evict(self.policy.high_water_mark, self.policy.evict_batch_size);
        if evicted > 0 {
            info!("Cleaned up {} old processed posts", evicted);
        }
        report.evicted = evicted;
        seen
    }
}

/// Perform one complete run
///
/// # Errors
///
/// Authentication and directory fetch failures abort the run. Per-account
/// failures and a failed save do not; they are logged and reflected in the
/// returned report.
pub async fn run_once(
    client: &mut dyn SocialClient,
    store: &SeenStore,
    options: &RunOptions,
) -> Result<ScanReport> {
    let seen = store.load();

    client.authenticate().await?;

    let client: &dyn SocialClient = client;
    let directory =
        AccountDirectory::refresh(client, &options.list_uri, options.policy.list_page_limit)
            .await?;

    let scanner = Scanner::new(client, &options.classifier, &options.policy);
    let (seen, mut report) = scanner.scan(&directory, seen).await;
    let seen = scanner.evict(seen, &mut report);

    match store.save(&seen) {
        Ok(()) => report.persisted = true,
        Err(e) => error!("Error saving data to {}: {}", store.path().display(), e),
    }

    info!(
        "Bot run completed successfully: {} accounts scanned, {} failed, {} reposted",
        report.accounts_scanned,
        report.accounts_failed(),
        report.reposted.len()
    );

    Ok(report)
}
