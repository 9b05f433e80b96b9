//! Hybrid search tuning constants.

/// Default lexical weight in hybrid score fusion.
pub const DEFAULT_BM25_WEIGHT: f32 = 0.4;

/// Default semantic weight in hybrid score fusion.
pub const DEFAULT_KNN_WEIGHT: f32 = 0.6;

/// Denominator that maps a raw text boost onto `[0, 1]` in lexical-only mode.
pub const MAX_LEXICAL_BOOST: f32 = 12.5;

/// Text-boost weight for a match on the entity path.
pub const BOOST_PATH: f32 = 5.0;

/// Text-boost weight for a match on the entity name.
pub const BOOST_NAME: f32 = 3.0;

/// Text-boost weight for a match on the description.
pub const BOOST_DESCRIPTION: f32 = 2.0;

/// Text-boost weight for a match on a tag.
pub const BOOST_TAG: f32 = 1.5;

/// Text-boost weight for a match on a tool or skill name/description.
pub const BOOST_TOOL_OR_SKILL: f32 = 1.0;

/// Default number of hits returned per entity type.
pub const DEFAULT_PER_TYPE_LIMIT: usize = 3;

/// Default overall result cap for a search call.
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Wall-clock cap for one search call, in seconds.
pub const SEARCH_TIMEOUT_SECS: u64 = 5;

/// HNSW `ef_search` used for k-NN sub-queries.
pub const KNN_EF_SEARCH: usize = 100;

/// HNSW `ef_construction` used at index creation.
pub const KNN_EF_CONSTRUCTION: usize = 128;

/// HNSW `m` used at index creation.
pub const KNN_M: usize = 16;

/// Embedding dimensions produced by the local dense model.
pub const LOCAL_EMBEDDING_DIMENSIONS: usize = 384;

/// Embedding dimensions produced by the hosted embedding API.
pub const HOSTED_EMBEDDING_DIMENSIONS: usize = 1024;
