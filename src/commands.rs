use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::database::VectorDb;
use crate::document::load_document;
use crate::embeddings::{OllamaClient, TextSplitter};
use crate::{indexer, server};

/// Ingest a document: load, chunk, reset the collection, index
#[inline]
pub async fn ingest(path: PathBuf) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    info!("Ingesting document from {}", path.display());
    println!("📄 Loading {}", path.display());

    let document = load_document(&path)?;
    println!("   Extracted {} characters", document.len());

    let splitter = TextSplitter::new(&config.chunking)?;
    let chunks = splitter.split(&document);
    println!(
        "✂️  Split into {} chunks (max {} tokens, overlap {})",
        chunks.len(),
        config.chunking.max_tokens,
        config.chunking.overlap_tokens
    );

    if chunks.is_empty() {
        println!("Document is empty, nothing to index.");
        return Ok(());
    }

    // Verify Ollama connectivity before embedding anything
    let client = OllamaClient::new(&config).context("Failed to create Ollama client")?;
    if let Err(e) = client.health_check() {
        error!("Ollama health check failed: {}", e);
        println!(
            "Error: Cannot reach Ollama at {}:{}",
            config.ollama.host, config.ollama.port
        );
        println!("Please ensure Ollama is running and the embedding model is pulled.");
        return Err(e);
    }

    let db = VectorDb::connect(&config)
        .await
        .context("Failed to open vector database")?;

    // Fresh collection for every ingestion run
    let name = &config.collection.name;
    db.delete(name).await.context("Failed to reset collection")?;
    let collection = db
        .create_or_get(name)
        .await
        .context("Failed to create collection")?;

    let indexed = indexer::index(&chunks, &collection).await?;

    println!("✅ Indexed {} chunks into collection {}", indexed, name);
    println!("   Vector store: {}", config.vector_db_path().display());
    println!("Use 'ragserve serve' to start the query endpoint.");

    Ok(())
}

/// Start the HTTP query service
#[inline]
pub async fn serve(port: Option<u16>) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(port) = port {
        config.server.port = port;
    }

    // Verify Ollama connectivity before accepting queries
    match OllamaClient::new(&config) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                info!(
                    "✅ Ollama connected at {}:{} with model {}",
                    config.ollama.host, config.ollama.port, config.ollama.model
                );
            }
            Err(e) => {
                warn!("⚠️  Ollama is reachable but unhealthy: {}", e);
                println!("Warning: Ollama may not be ready. Queries may fail.");
            }
        },
        Err(e) => {
            error!("❌ Failed to connect to Ollama: {}", e);
            println!(
                "Error: Cannot connect to Ollama at {}:{}",
                config.ollama.host, config.ollama.port
            );
            println!("Please ensure Ollama is running and accessible.");
            return Err(e);
        }
    }

    let db = VectorDb::connect(&config)
        .await
        .context("Failed to open vector database")?;
    let collection = db
        .create_or_get(&config.collection.name)
        .await
        .context("Failed to open collection")?;

    let count = collection.count().await?;
    if count == 0 {
        println!(
            "⚠️  Collection {} is empty. Run 'ragserve ingest <path>' first.",
            config.collection.name
        );
    } else {
        println!(
            "📚 Serving {} chunks from collection {}",
            count, config.collection.name
        );
    }

    println!("🌐 Query endpoint: http://{}/query", config.server.bind_addr());
    println!("Press Ctrl+C to stop the server");

    tokio::select! {
        result = server::serve(&config, collection) => {
            result.context("Query server failed")?;
            info!("Query server stopped normally");
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\n📴 Received interrupt signal, shutting down...");
        }
    }

    Ok(())
}

/// Delete the collection so the next ingest starts clean
#[inline]
pub async fn reset() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let db = VectorDb::connect(&config)
        .await
        .context("Failed to open vector database")?;

    db.delete(&config.collection.name)
        .await
        .context("Failed to delete collection")?;

    println!("🗑️  Collection {} deleted", config.collection.name);
    println!("Run 'ragserve ingest <path>' to rebuild the index.");

    Ok(())
}

/// Show the health of every pipeline dependency
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("📊 Ragserve Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("⚙️  Configuration:");
    println!("   File: {}", config.config_file_path().display());
    println!(
        "   Collection: {} ({} metric)",
        config.collection.name, config.collection.metric
    );
    println!(
        "   Chunking: max {} tokens, overlap {}",
        config.chunking.max_tokens, config.chunking.overlap_tokens
    );
    println!("   Results per query: {}", config.search.top_k);
    println!();

    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Model: {}", config.ollama.model);
                println!(
                    "   🔢 Embedding dimension: {}",
                    config.ollama.embedding_dimension
                );
            }
            Err(e) => {
                println!("   ⚠️  Ollama: Connected but unhealthy - {}", e);
            }
        },
        Err(e) => {
            println!("   ❌ Ollama: Failed to connect - {}", e);
        }
    }
    println!();

    println!("🔍 Vector Database Status:");
    match VectorDb::connect(&config).await {
        Ok(db) => {
            println!(
                "   ✅ LanceDB: Connected ({})",
                config.vector_db_path().display()
            );
            match db.exists(&config.collection.name).await {
                Ok(true) => {
                    let collection = db.create_or_get(&config.collection.name).await;
                    match collection {
                        Ok(collection) => match collection.count().await {
                            Ok(count) => println!("   📄 Indexed chunks: {}", count),
                            Err(e) => println!("   ⚠️  Count unavailable - {}", e),
                        },
                        Err(e) => println!("   ❌ Collection: Failed to open - {}", e),
                    }
                }
                Ok(false) => {
                    println!(
                        "   📭 Collection {} has not been created yet",
                        config.collection.name
                    );
                }
                Err(e) => println!("   ⚠️  Collection check failed - {}", e),
            }
        }
        Err(e) => {
            println!("   ❌ LanceDB: Failed to connect - {}", e);
        }
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'ragserve ingest <path>' to index a document");
    println!("   • Use 'ragserve serve' to start the query endpoint");
    println!("   • Use 'ragserve config' to review the configuration");

    Ok(())
}

/// Print the resolved configuration as TOML
#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    println!("# {}", config.config_file_path().display());
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    print!("{}", rendered);

    Ok(())
}
