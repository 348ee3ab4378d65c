// Embeddings module
// Token-aware text chunking and Ollama embedding generation

pub mod chunking;
pub mod ollama;

pub use chunking::TextSplitter;
pub use ollama::{DEFAULT_EMBEDDING_DIMENSION, OllamaClient};
