//! Core types for Pressbot

use serde::{Deserialize, Serialize};

/// A post fetched from an account feed
///
/// Fetched fresh every run; only its `uri` outlives the run (in the seen set).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostRecord {
    /// Stable identifier (AT URI)
    pub uri: String,
    /// Content reference passed to the repost call
    pub cid: String,
    pub text: String,
}

impl PostRecord {
    pub fn new(uri: impl Into<String>, cid: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            cid: cid.into(),
            text: text.into(),
        }
    }
}

/// A member of the monitored list, as returned by the list endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListMember {
    pub handle: String,
    pub display_name: Option<String>,
}

/// A monitored account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub handle: String,
    pub display_name: String,
}

impl From<ListMember> for Account {
    fn from(member: ListMember) -> Self {
        let display_name = member
            .display_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| member.handle.clone());

        Self {
            handle: member.handle,
            display_name,
        }
    }
}

/// An account whose processing stopped early during a scan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountFailure {
    pub handle: String,
    pub error: String,
}

/// Summary of a single scan run
///
/// `reposted` is the action record; the seen set is the observation record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanReport {
    pub accounts_scanned: usize,
    pub failures: Vec<AccountFailure>,
    pub posts_examined: usize,
    pub posts_already_seen: usize,
    pub reposted: Vec<String>,
    pub evicted: usize,
    pub persisted: bool,
}

impl ScanReport {
    pub fn accounts_failed(&self) -> usize {
        self.failures.len()
    }
}
