// Search module
// Retrieves the chunks nearest to a query from a collection


use tracing::debug;

use crate::database::Collection;
use crate::{RagError, Result};

/// Retrieve the `top_k` chunks nearest to `text`, nearest first.
///
/// Returns chunk texts only. An empty collection yields an empty list;
/// the query itself must carry at least one non-whitespace character.
#[inline]
pub async fn query(text: &str, collection: &Collection, top_k: usize) -> Result<Vec<String>> {
    if text.trim().is_empty() {
        return Err(RagError::Query("Query text is empty".to_string()));
    }

    let results = collection.search(text, top_k).await?;
    debug!(
        "Query matched {} of up to {} chunks in collection {}",
        results.len(),
        top_k,
        collection.name()
    );
    Ok(results.into_iter().map(|result| result.text).collect())
}
