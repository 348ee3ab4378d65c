// LanceDB vector database module
// Stores embedded chunks and answers nearest-neighbor queries


pub mod vector_store;

use serde::{Deserialize, Serialize};

pub use vector_store::{Collection, SearchResult, VectorDb};

/// Row stored for one indexed chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique identifier, `chunk_<position>` within the indexed document
    pub id: String,
    /// The embedding vector for `text`
    pub vector: Vec<f32>,
    /// The chunk text itself
    pub text: String,
    /// Timestamp when this chunk was indexed
    pub created_at: String,
}
