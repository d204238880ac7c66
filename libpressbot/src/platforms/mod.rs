//! Social network client abstraction and implementations
//!
//! The scanner talks to the network only through [`SocialClient`]. The Bluesky
//! implementation speaks XRPC over HTTPS; the mock implementation backs the
//! integration tests.
//!
//! # Examples
//!
//! ```no_run
//! use libpressbot::platforms::{bluesky::BlueskyClient, SocialClient};
//!
//! # async fn example() -> libpressbot::error::Result<()> {
//! let mut client = BlueskyClient::new(
//!     "https://bsky.social",
//!     "pressbot.bsky.social".to_string(),
//!     "app-password".to_string().into(),
//! )?;
//!
//! client.authenticate().await?;
//!
//! for post in client.fetch_recent_posts("press.example.edu", 20).await? {
//!     println!("{}: {}", post.uri, post.text);
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ListMember, PostRecord};

pub mod bluesky;

// Mock client is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Narrow interface to the social network used by a scan run
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Authenticate with the service
    ///
    /// Must be called before any other operation.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` if the credentials are rejected.
    async fn authenticate(&mut self) -> Result<()>;

    /// Fetch the members of a list
    ///
    /// Only the first page of at most `limit` members is returned.
    async fn fetch_list_members(&self, list_uri: &str, limit: usize) -> Result<Vec<ListMember>>;

    /// Fetch up to `limit` of the most recent posts by `handle`, newest first
    async fn fetch_recent_posts(&self, handle: &str, limit: usize) -> Result<Vec<PostRecord>>;

    /// Repost the post identified by `uri` and `cid`
    ///
    /// Returns the identifier of the created repost record.
    async fn repost(&self, uri: &str, cid: &str) -> Result<String>;

    /// Lowercase client identifier (e.g. "bluesky")
    fn name(&self) -> &str;
}
