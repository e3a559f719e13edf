//! Provider adapters.
//!
//! Each module provides a struct implementing [`crate::provider::SearchProvider`]
//! against one external search API. Adapters are constructed uninitialized
//! and receive credentials through [`SearchProvider::init`](crate::provider::SearchProvider::init).

pub mod github;
pub mod jira;

pub use github::{GitHubCredentials, GitHubProvider};
pub use jira::{JiraCredentials, JiraProvider};
