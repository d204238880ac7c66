//! Directory of monitored accounts
//!
//! Rebuilt from the monitored list at the start of every run; nothing is
//! carried over between runs.

use std::collections::HashMap;

use crate::error::Result;
use crate::platforms::SocialClient;
use crate::types::{Account, ListMember};

/// Default number of list members fetched (first page only)
pub const DEFAULT_LIST_PAGE_LIMIT: usize = 100;

/// Mapping of handle to account, iterated in list order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountDirectory {
    accounts: Vec<Account>,
    index: HashMap<String, usize>,
}

impl AccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the first page of `list_uri` and build a fresh directory from it
    ///
    /// # Errors
    ///
    /// Propagates the fetch error; without accounts there is no work to do.
    pub async fn refresh(
        client: &dyn SocialClient,
        list_uri: &str,
        page_limit: usize,
    ) -> Result<Self> {
        tracing::info!("Loading monitored accounts from list...");

        let members = client.fetch_list_members(list_uri, page_limit).await?;
        let directory: Self = members.into_iter().collect();

        tracing::info!("Monitoring {} accounts", directory.len());
        Ok(directory)
    }

    /// Insert or replace an account keyed by its handle
    ///
    /// A replaced account keeps the position of the first insertion.
    pub fn insert(&mut self, account: Account) {
        match self.index.get(&account.handle) {
            Some(&position) => self.accounts[position] = account,
            None => {
                self.index.insert(account.handle.clone(), self.accounts.len());
                self.accounts.push(account);
            }
        }
    }

    pub fn get(&self, handle: &str) -> Option<&Account> {
        self.index.get(handle).map(|&position| &self.accounts[position])
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }
}

impl FromIterator<ListMember> for AccountDirectory {
    fn from_iter<I: IntoIterator<Item = ListMember>>(iter: I) -> Self {
        let mut directory = AccountDirectory::new();
        for member in iter {
            directory.insert(member.into());
        }
        directory
    }
}
