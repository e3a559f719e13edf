//! metasearch: one query, many providers.
//!
//! Front ends over [`metasearch_core`]:
//! - **HTTP server** ([`server`]): JSON API and a server-sent event stream of
//!   result groups for browser front ends
//! - **Terminal** ([`cli`], [`render`]): prints each provider's group the
//!   moment it arrives
//!
//! Configuration lives in `config.toml` ([`config`]); per-user view settings
//! in `preferences.json` ([`preferences`]).

pub mod cli;
pub mod config;
pub mod error;
pub mod metasearch_dirs;
pub mod preferences;
pub mod render;
pub mod server;
pub mod stream;

pub use config::MetasearchConfig;
pub use error::{MetasearchError, Result};
pub use preferences::{PreferenceStore, Preferences};
pub use server::{SearchServer, ServerState};
