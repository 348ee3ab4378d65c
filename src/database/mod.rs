// Database module
// LanceDB-backed vector collections with embedded similarity search

pub mod lancedb;

pub use lancedb::{ChunkRecord, Collection, SearchResult, VectorDb};
