//! Mock client implementation for testing
//!
//! This module provides a configurable mock client that can simulate list
//! membership, per-account feeds, and failures at every step. It records the
//! calls it receives so integration tests can verify scan behavior without
//! network access.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::error::{PlatformError, Result};
use crate::platforms::SocialClient;
use crate::types::{ListMember, PostRecord};

/// Configuration for mock client behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Client name
    pub name: String,

    /// Error to return on authentication (succeeds when `None`)
    pub auth_error: Option<String>,

    /// Error to return when fetching list members (succeeds when `None`)
    pub list_error: Option<String>,

    /// Members of the monitored list, in list order
    pub members: Vec<ListMember>,

    /// Feed per handle, newest first
    pub feeds: HashMap<String, Vec<PostRecord>>,

    /// Handles whose feed fetch fails
    pub failing_feeds: HashSet<String>,

    /// Post URIs whose repost call fails
    pub failing_reposts: HashSet<String>,

    /// Handles whose feed was requested, in call order
    pub fetched_handles: Arc<Mutex<Vec<String>>>,

    /// `(uri, cid)` pairs passed to repost, in call order
    pub repost_calls: Arc<Mutex<Vec<(String, String)>>>,

    /// Limits passed to list and feed fetches, in call order
    pub requested_limits: Arc<Mutex<Vec<usize>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            auth_error: None,
            list_error: None,
            members: Vec::new(),
            feeds: HashMap::new(),
            failing_feeds: HashSet::new(),
            failing_reposts: HashSet::new(),
            fetched_handles: Arc::new(Mutex::new(Vec::new())),
            repost_calls: Arc::new(Mutex::new(Vec::new())),
            requested_limits: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock client for testing
///
/// Cloning shares the call records, so a test can keep a handle for
/// assertions after passing the client to a scan.
#[derive(Debug, Clone)]
pub struct MockClient {
    config: MockConfig,
    authenticated: bool,
}

impl MockClient {
    /// Create a new mock client with the given configuration
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            authenticated: false,
        }
    }

    /// Create a mock client with no accounts that always succeeds
    pub fn success() -> Self {
        Self::new(MockConfig::default())
    }

    /// Create a mock client that fails authentication
    pub fn auth_failure(error: &str) -> Self {
        Self::new(MockConfig {
            auth_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Create a mock client whose list fetch fails
    pub fn list_failure(error: &str) -> Self {
        Self::new(MockConfig {
            list_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Add a list member with a feed
    pub fn with_account(
        mut self,
        handle: &str,
        display_name: Option<&str>,
        feed: Vec<PostRecord>,
    ) -> Self {
        self.config.members.push(ListMember {
            handle: handle.to_string(),
            display_name: display_name.map(str::to_string),
        });
        self.config.feeds.insert(handle.to_string(), feed);
        self
    }

    /// Add a list member whose feed fetch fails
    pub fn with_failing_account(mut self, handle: &str) -> Self {
        self.config.members.push(ListMember {
            handle: handle.to_string(),
            display_name: None,
        });
        self.config.failing_feeds.insert(handle.to_string());
        self
    }

    /// Make the repost call fail for `uri`
    pub fn with_failing_repost(mut self, uri: &str) -> Self {
        self.config.failing_reposts.insert(uri.to_string());
        self
    }

    /// Create a mock client that is already authenticated
    pub fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    /// Handles whose feed was requested
    pub fn fetched_handles(&self) -> Vec<String> {
        self.config.fetched_handles.lock().unwrap().clone()
    }

    /// URIs passed to repost
    pub fn reposted_uris(&self) -> Vec<String> {
        self.repost_calls().into_iter().map(|(uri, _)| uri).collect()
    }

    /// `(uri, cid)` pairs passed to repost
    pub fn repost_calls(&self) -> Vec<(String, String)> {
        self.config.repost_calls.lock().unwrap().clone()
    }

    /// Limits passed to list and feed fetches
    pub fn requested_limits(&self) -> Vec<usize> {
        self.config.requested_limits.lock().unwrap().clone()
    }

    fn ensure_authenticated(&self) -> Result<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(PlatformError::Authentication("Not authenticated".to_string()).into())
        }
    }
}

#[async_trait]
impl SocialClient for MockClient {
    async fn authenticate(&mut self) -> Result<()> {
        match &self.config.auth_error {
            Some(error) => Err(PlatformError::Authentication(error.clone()).into()),
            None => {
                self.authenticated = true;
                Ok(())
            }
        }
    }

    async fn fetch_list_members(&self, _list_uri: &str, limit: usize) -> Result<Vec<ListMember>> {
        self.ensure_authenticated()?;
        self.config.requested_limits.lock().unwrap().push(limit);

        if let Some(error) = &self.config.list_error {
            return Err(PlatformError::Api(error.clone()).into());
        }

        Ok(self.config.members.iter().take(limit).cloned().collect())
    }

    async fn fetch_recent_posts(&self, handle: &str, limit: usize) -> Result<Vec<PostRecord>> {
        self.ensure_authenticated()?;
        self.config.fetched_handles.lock().unwrap().push(handle.to_string());
        self.config.requested_limits.lock().unwrap().push(limit);

        if self.config.failing_feeds.contains(handle) {
            return Err(
                PlatformError::Network(format!("Mock feed fetch failed for {}", handle)).into(),
            );
        }

        let feed = self.config.feeds.get(handle).cloned().unwrap_or_default();
        Ok(feed.into_iter().take(limit).collect())
    }

    async fn repost(&self, uri: &str, cid: &str) -> Result<String> {
        self.ensure_authenticated()?;
        self.config
            .repost_calls
            .lock()
            .unwrap()
            .push((uri.to_string(), cid.to_string()));

        if self.config.failing_reposts.contains(uri) {
            return Err(PlatformError::Api(format!("Mock repost failed for {}", uri)).into());
        }

        Ok(format!("at://did:plc:mock/app.bsky.feed.repost/{}", cid))
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let mut client = MockClient::success().with_account(
            "a.press.edu",
            Some("A Press"),
            vec![PostRecord::new("at://a/1", "cid1", "Sale!")],
        );

        client.authenticate().await.unwrap();
        assert_eq!(client.name(), "mock");

        let members = client.fetch_list_members("at://list", 100).await.unwrap();
        assert_eq!(members.len(), 1);

        let posts = client.fetch_recent_posts("a.press.edu", 20).await.unwrap();
        assert_eq!(posts.len(), 1);

        let repost_uri = client.repost("at://a/1", "cid1").await.unwrap();
        assert!(repost_uri.ends_with("cid1"));
        assert_eq!(client.reposted_uris(), vec!["at://a/1".to_string()]);
        assert_eq!(client.requested_limits(), vec![100, 20]);
    }

    #[tokio::test]
    async fn test_mock_auth_failure() {
        let mut client = MockClient::auth_failure("Invalid credentials");

        let result = client.authenticate().await;
        assert!(result.unwrap_err().to_string().contains("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_mock_requires_authentication() {
        let client = MockClient::success();

        let result = client.fetch_recent_posts("a.press.edu", 20).await;
        assert!(result.unwrap_err().to_string().contains("Not authenticated"));
    }

    #[tokio::test]
    async fn test_mock_failing_feed_and_repost() {
        let client = MockClient::success()
            .with_failing_account("broken.press.edu")
            .with_failing_repost("at://a/1")
            .authenticated();

        assert!(client.fetch_recent_posts("broken.press.edu", 20).await.is_err());
        assert!(client.repost("at://a/1", "cid1").await.is_err());
        assert_eq!(client.fetched_handles(), vec!["broken.press.edu".to_string()]);
        assert_eq!(client.repost_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_feed_respects_limit() {
        let feed = (0..5)
            .map(|i| PostRecord::new(format!("at://a/{}", i), format!("cid{}", i), "text"))
            .collect();
        let client = MockClient::success()
            .with_account("a.press.edu", None, feed)
            .authenticated();

        let posts = client.fetch_recent_posts("a.press.edu", 3).await.unwrap();
        assert_eq!(posts.len(), 3);
        assert_eq!(posts[0].uri, "at://a/0");
    }
}
