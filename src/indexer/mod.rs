// Indexer module
// Assigns positional ids to chunks and stores them into a collection


use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::database::Collection;
use crate::{RagError, Result};

/// Positional chunk id, zero-based: `chunk_0` for the first chunk
#[inline]
#[must_use]
pub fn chunk_id(position: usize) -> String {
    format!("chunk_{}", position)
}

/// Store chunks into a collection under positional ids.
///
/// Chunks are inserted in order, each under the id of its position, so the
/// same chunk sequence always maps to the same ids. The collection must be
/// empty: positional ids are only unique against a reset collection.
/// Indexing stops at the first failed insert.
#[inline]
pub async fn index(chunks: &[String], collection: &Collection) -> Result<usize> {
    let existing = collection.count().await?;
    if existing > 0 {
        return Err(RagError::Index(format!(
            "Collection {} already holds {} chunks, reset it before indexing",
            collection.name(),
            existing
        )));
    }

    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding {msg}")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_position(0);
    bar.set_length(chunks.len() as u64);

    for (position, chunk) in chunks.iter().enumerate() {
        let id = chunk_id(position);
        debug!("Indexing {} ({} bytes)", id, chunk.len());
        bar.set_message(id.clone());
        collection.insert(&id, chunk).await?;
        bar.set_position((position + 1) as u64);
    }
    bar.finish_and_clear();

    info!(
        "Indexed {} chunks into collection {}",
        chunks.len(),
        collection.name()
    );
    Ok(chunks.len())
}
