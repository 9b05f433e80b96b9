//! Federation clients: peer export fetching and external catalog adapters.

mod anthropic;
mod asor;
mod peer_client;

pub use anthropic::AnthropicCatalogAdapter;
pub use asor::AsorCatalogAdapter;
pub use peer_client::HttpPeerCatalogClient;
