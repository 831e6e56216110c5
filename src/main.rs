//! fsgate CLI - serve a directory over HTTP, or poke files through the
//! storage accessor from the command line.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fsgate::accessor::{StorageAccessor, WorkerConfig};
use fsgate::config::{expand_tilde, ServeConfig};

#[derive(Parser)]
#[command(name = "fsgate", version, about = "Serialized storage accessor")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve a directory over HTTP.
    Serve {
        /// Config file (TOML); flags override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Address to listen on.
        #[arg(long)]
        bind: Option<String>,

        /// Directory to serve.
        #[arg(long)]
        root: Option<PathBuf>,

        /// Body chunk size in bytes.
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Print a file (with gzip-path fallback) to stdout.
    Cat {
        path: PathBuf,

        /// Emit raw bytes instead of requiring UTF-8.
        #[arg(long)]
        binary: bool,
    },

    /// Write stdin into a file, creating or truncating it.
    Put { path: PathBuf },

    /// List directory entries, one per line, as the host yields them.
    Ls { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            bind,
            root,
            chunk_size,
        } => {
            let mut serve = match config {
                Some(path) => ServeConfig::load(&path)?,
                None => ServeConfig::default(),
            };
            if let Some(bind) = bind {
                serve.bind = bind;
            }
            if let Some(root) = root {
                serve.root = root;
            }
            if let Some(chunk_size) = chunk_size {
                serve.chunk_size = chunk_size;
            }
            serve.validate()?;
            serve.root = expand_tilde(&serve.root);

            let accessor = StorageAccessor::new(WorkerConfig {
                chunk_size: serve.chunk_size,
            });
            fsgate::server::run(serve, accessor).await
        }

        Command::Cat { path, binary } => {
            let accessor = StorageAccessor::default();
            if binary {
                let bytes = accessor.read_file_binary(&path).await?;
                std::io::stdout().write_all(&bytes)?;
            } else {
                print!("{}", accessor.read_file(&path).await?);
            }
            Ok(())
        }

        Command::Put { path } => {
            let mut body = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut body)?;
            let accessor = StorageAccessor::default();
            accessor.write_file(&path, body).await?;
            Ok(())
        }

        Command::Ls { path } => {
            let accessor = StorageAccessor::default();
            for name in accessor.list_files(&path).await? {
                println!("{name}");
            }
            Ok(())
        }
    }
}
