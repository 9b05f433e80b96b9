//! Embedding providers.
//!
//! Resolved by name from the domain registry: `fastembed` (local dense
//! model, 384 dims), `hosted` (HTTP embedding API, 1024 dims), `null`
//! (deterministic projection for tests and no-ML deployments).

#[cfg(feature = "embedding-fastembed")]
mod fastembed_provider;
#[cfg(feature = "embedding-hosted")]
mod hosted;
#[cfg(feature = "embedding-null")]
mod null;

#[cfg(feature = "embedding-fastembed")]
pub use fastembed_provider::FastEmbedProvider;
#[cfg(feature = "embedding-hosted")]
pub use hosted::HostedEmbeddingProvider;
#[cfg(feature = "embedding-null")]
pub use null::NullEmbeddingProvider;
