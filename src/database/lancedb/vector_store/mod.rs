#[cfg(test)]
mod tests;

use super::ChunkRecord;
use crate::RagError;
use crate::config::{Config, DistanceMetric};
use crate::embeddings::ollama::OllamaClient;
use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType,
    query::{ExecutableQuery, QueryBase},
};
use std::sync::Arc;
use tracing::{debug, info};

/// Handle to the vector database, hands out [`Collection`]s
pub struct VectorDb {
    connection: Connection,
    metric: DistanceMetric,
    dimension: usize,
    embedder: OllamaClient,
}

/// A named table of embedded chunks. Embeds text on insert and search, so
/// callers only ever exchange ids and text with it.
#[derive(Clone)]
pub struct Collection {
    connection: Connection,
    name: String,
    metric: DistanceMetric,
    dimension: usize,
    embedder: OllamaClient,
}

/// Search hit from vector similarity search, nearest first
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    pub similarity_score: f32,
    pub distance: f32,
}

impl From<DistanceMetric> for DistanceType {
    #[inline]
    fn from(metric: DistanceMetric) -> Self {
        match metric {
            DistanceMetric::Cosine => Self::Cosine,
            DistanceMetric::L2 => Self::L2,
            DistanceMetric::Dot => Self::Dot,
        }
    }
}

impl VectorDb {
    /// Connect to the vector database under the configured base directory
    #[inline]
    pub async fn connect(config: &Config) -> Result<Self, RagError> {
        let db_path = config.vector_db_path();
        debug!("Initializing LanceDB at path: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RagError::Database(format!("Failed to create vector database directory: {}", e))
            })?;
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to connect to LanceDB: {}", e)))?;

        let embedder = OllamaClient::new(config).map_err(|e| {
            RagError::Config(format!("Failed to configure embedding client: {:#}", e))
        })?;

        info!("Vector database ready at {}", db_path.display());
        Ok(Self {
            connection,
            metric: config.collection.metric,
            dimension: config.ollama.embedding_dimension as usize,
            embedder,
        })
    }

    /// Open the named collection, creating its table if it does not exist.
    /// Metric and embedding dimension come from the configuration.
    #[inline]
    pub async fn create_or_get(&self, name: &str) -> Result<Collection, RagError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.iter().any(|t| t == name) {
            debug!("Opening existing collection {}", name);
        } else {
            info!(
                "Creating collection {} ({} dimensions, {} metric)",
                name, self.dimension, self.metric
            );
            let schema = chunk_schema(self.dimension);
            self.connection
                .create_empty_table(name, schema)
                .execute()
                .await
                .map_err(|e| {
                    RagError::Database(format!("Failed to create collection {}: {}", name, e))
                })?;
        }

        Ok(Collection {
            connection: self.connection.clone(),
            name: name.to_string(),
            metric: self.metric,
            dimension: self.dimension,
            embedder: self.embedder.clone(),
        })
    }

    /// Whether the named collection has a table on disk.
    #[inline]
    pub async fn exists(&self, name: &str) -> Result<bool, RagError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to list tables: {}", e)))?;

        Ok(table_names.iter().any(|t| t == name))
    }

    /// Drop the named collection. Succeeds when it does not exist.
    #[inline]
    pub async fn delete(&self, name: &str) -> Result<(), RagError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to list tables for drop: {}", e)))?;

        if table_names.iter().any(|t| t == name) {
            info!("Dropping collection {}", name);
            self.connection.drop_table(name).await.map_err(|e| {
                RagError::Database(format!("Failed to drop collection {}: {}", name, e))
            })?;
        } else {
            debug!("Collection {} does not exist, nothing to drop", name);
        }

        Ok(())
    }
}

impl Collection {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Embed `text` and store it under `id`. Ids must be unique within the
    /// collection, a reused id is rejected without writing.
    #[inline]
    pub async fn insert(&self, id: &str, text: &str) -> Result<(), RagError> {
        debug!("Inserting chunk {} into collection {}", id, self.name);

        if self.contains_id(id).await? {
            return Err(RagError::DuplicateId(id.to_string()));
        }

        let vector = self.embed(text).await?;
        let record = ChunkRecord {
            id: id.to_string(),
            vector,
            text: text.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };

        let record_batch = create_record_batch(&record, self.dimension)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);

        let table = self.open_table().await?;
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to insert chunk {}: {}", id, e)))?;

        debug!("Stored chunk {}", id);
        Ok(())
    }

    /// Embed the query text and return up to `top_k` nearest chunks,
    /// ordered nearest first. An empty collection yields no results.
    #[inline]
    pub async fn search(
        &self,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, RagError> {
        debug!("Searching collection {} (top_k {})", self.name, top_k);

        if top_k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embed(query_text).await?;

        let table = self.open_table().await?;
        let results = table
            .vector_search(query_vector.as_slice())
            .map_err(|e| RagError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(self.metric.into())
            .limit(top_k)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to execute search: {}", e)))?;

        parse_search_results_stream(results).await
    }

    /// Number of chunks stored in this collection
    #[inline]
    pub async fn count(&self) -> Result<u64, RagError> {
        let table = self.open_table().await?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    async fn contains_id(&self, id: &str) -> Result<bool, RagError> {
        let table = self.open_table().await?;

        let matches = table
            .count_rows(Some(format!("id = '{}'", id)))
            .await
            .map_err(|e| RagError::Database(format!("Failed to check id {}: {}", id, e)))?;

        Ok(matches > 0)
    }

    /// Run the synchronous embedding call on the blocking pool
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let embedder = self.embedder.clone();
        let text = text.to_string();

        let vector = tokio::task::spawn_blocking(move || embedder.generate_embedding(&text))
            .await
            .map_err(|e| RagError::Embedding(format!("Embedding task failed: {}", e)))?
            .map_err(|e| RagError::Embedding(format!("Failed to generate embedding: {:#}", e)))?;

        if vector.len() != self.dimension {
            return Err(RagError::Embedding(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                vector.len()
            )));
        }

        Ok(vector)
    }

    async fn open_table(&self) -> Result<lancedb::Table, RagError> {
        self.connection
            .open_table(&self.name)
            .execute()
            .await
            .map_err(|e| {
                RagError::Database(format!("Failed to open collection {}: {}", self.name, e))
            })
    }
}

/// Schema for a collection table with the given embedding dimension
fn chunk_schema(dimension: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                dimension as i32,
            ),
            false,
        ),
        Field::new("text", DataType::Utf8, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

/// Build a single-row RecordBatch for one chunk
fn create_record_batch(record: &ChunkRecord, dimension: usize) -> Result<RecordBatch, RagError> {
    let schema = chunk_schema(dimension);

    let values_array = Float32Array::from(record.vector.clone());
    let field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array =
        FixedSizeListArray::try_new(field, dimension as i32, Arc::new(values_array), None)
            .map_err(|e| RagError::Database(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(vec![record.id.as_str()])),
        Arc::new(vector_array),
        Arc::new(StringArray::from(vec![record.text.as_str()])),
        Arc::new(StringArray::from(vec![record.created_at.as_str()])),
    ];

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| RagError::Database(format!("Failed to create record batch: {}", e)))
}

async fn parse_search_results_stream(
    mut results: lancedb::arrow::SendableRecordBatchStream,
) -> Result<Vec<SearchResult>, RagError> {
    let mut search_results = Vec::new();

    while let Some(batch) = results
        .try_next()
        .await
        .map_err(|e| RagError::Database(format!("Failed to read result stream: {}", e)))?
    {
        search_results.extend(parse_search_batch(&batch)?);
    }

    debug!("Parsed {} search results from stream", search_results.len());
    Ok(search_results)
}

/// Parse one record batch of search hits
fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>, RagError> {
    let mut search_results = Vec::new();
    let num_rows = batch.num_rows();

    let ids = batch
        .column_by_name("id")
        .ok_or_else(|| RagError::Database("Missing id column".to_string()))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Database("Invalid id column type".to_string()))?;

    let texts = batch
        .column_by_name("text")
        .ok_or_else(|| RagError::Database("Missing text column".to_string()))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Database("Invalid text column type".to_string()))?;

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    for row in 0..num_rows {
        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        // Convert distance to similarity score (higher is better)
        let similarity_score = 1.0 - distance;

        search_results.push(SearchResult {
            id: ids.value(row).to_string(),
            text: texts.value(row).to_string(),
            similarity_score,
            distance,
        });
    }

    Ok(search_results)
}
