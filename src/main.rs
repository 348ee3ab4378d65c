use clap::{Parser, Subcommand};
use ragserve::Result;
use ragserve::commands::{ingest, reset, serve, show_config, show_status};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ragserve")]
#[command(about = "Document chunking, vector indexing, and semantic search over HTTP")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a document into the vector index
    Ingest {
        /// File or directory to ingest (.pdf, .md, .txt)
        path: PathBuf,
    },
    /// Start the HTTP query server
    Serve {
        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Delete the indexed collection
    Reset,
    /// Show detailed status of the pipeline dependencies
    Status,
    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { path } => {
            ingest(path).await?;
        }
        Commands::Serve { port } => {
            serve(port).await?;
        }
        Commands::Reset => {
            reset().await?;
        }
        Commands::Status => {
            show_status().await?;
        }
        Commands::Config => {
            show_config()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["ragserve", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Status));
        }
    }

    #[test]
    fn ingest_command_with_path() {
        let cli = Cli::try_parse_from(["ragserve", "ingest", "docs/report.pdf"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest { path } = parsed.command {
                assert_eq!(path, PathBuf::from("docs/report.pdf"));
            }
        }
    }

    #[test]
    fn ingest_requires_a_path() {
        let cli = Cli::try_parse_from(["ragserve", "ingest"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn serve_command_default_port() {
        let cli = Cli::try_parse_from(["ragserve", "serve"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Serve { port } = parsed.command {
                assert_eq!(port, None);
            }
        }
    }

    #[test]
    fn serve_command_with_port() {
        let cli = Cli::try_parse_from(["ragserve", "serve", "--port", "9000"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Serve { port } = parsed.command {
                assert_eq!(port, Some(9000));
            }
        }
    }

    #[test]
    fn serve_rejects_a_bad_port() {
        let cli = Cli::try_parse_from(["ragserve", "serve", "--port", "not-a-port"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["ragserve", "crawl"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["ragserve", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
