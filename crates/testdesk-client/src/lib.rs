//! testdesk-client: HTTP access to the LMS backend.
//!
//! Implements the `TestsApi` trait over reqwest, persists the token pair
//! between runs, and loads client configuration.

pub mod config;
pub mod http;
pub mod mock;
pub mod token_store;

pub use config::{create_client, load_config_from, ClientConfig};
pub use http::HttpClient;
pub use mock::{Endpoint, MockTestsApi};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
