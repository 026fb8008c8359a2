//! Command-line interface

use crate::endpoint::CodeArtifactEndpoint;
use crate::error::Result;
use crate::fetcher::ResourceFetcher;
use crate::logging::Logger;
use crate::proxy::{ProxyResolver, SystemVarResolver};
use crate::resolver::{AwsCliTokenIssuer, DefaultTokenResolver, TokenResolver};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

#[derive(Parser)]
#[command(name = "codeartifact-fetch")]
#[command(version, about = "Resolve CodeArtifact tokens and fetch repository artifacts")]
pub struct Cli {
    /// Show detailed diagnostics
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all non-error output
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Token cache directory (default: ~/.cache/codeartifact-fetch)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve an authorization token for a repository URL
    Token {
        /// Repository URL (https:// or codeartifact:// form)
        url: String,
        /// Print the token value itself (kept out of output by default)
        #[arg(long)]
        show_value: bool,
    },
    /// Fetch a resource and write it to a file or stdout
    Get {
        url: String,
        /// Destination file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print resource metadata without fetching the body
    Head { url: String },
    /// List the entries of a repository directory path
    List { url: String },
}

impl Cli {
    pub fn logger(&self) -> Logger {
        if self.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(self.verbose)
        }
    }

    fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(PathBuf::from)
                .map(|home| home.join(".cache").join("codeartifact-fetch"))
                .unwrap_or_else(|| PathBuf::from(".codeartifact-fetch"))
        })
    }
}

/// Wire the standard component stack and run one command.
pub async fn run(cli: Cli) -> Result<()> {
    let logger = cli.logger();
    let vars = SystemVarResolver::from_env();
    let resolver: Arc<dyn TokenResolver> = Arc::new(DefaultTokenResolver::new(
        cli.cache_dir(),
        Arc::new(AwsCliTokenIssuer::new(vars.clone())),
        logger.clone(),
    ));
    let fetcher = ResourceFetcher::new(
        reqwest::Client::new(),
        ProxyResolver::new(vars),
        resolver.clone(),
        logger.clone(),
    );

    match cli.command {
        Commands::Token { url, show_value } => {
            let endpoint = CodeArtifactEndpoint::require(&url)?;
            let token = resolver.resolve(&endpoint).await?;
            logger.info(&format!(
                "Token for {} ({}) expires in {}m",
                endpoint.cache_key(),
                endpoint.display_name(),
                token.expires_in().num_minutes()
            ));
            if show_value {
                println!("{}", token.value);
            }
        }
        Commands::Get { url, output } => {
            let resource = fetcher.get(&url).await?;
            let metadata = resource.metadata.clone();
            match output {
                Some(path) => {
                    let mut file = tokio::fs::File::create(&path).await?;
                    let mut stream = resource.bytes_stream();
                    while let Some(chunk) = stream.next().await {
                        file.write_all(&chunk?).await?;
                    }
                    file.flush().await?;
                    logger.info(&format!(
                        "Wrote {} to {}",
                        metadata.filename.as_deref().unwrap_or("resource"),
                        path.display()
                    ));
                }
                None => {
                    let mut stdout = tokio::io::stdout();
                    let mut stream = resource.bytes_stream();
                    while let Some(chunk) = stream.next().await {
                        stdout.write_all(&chunk?).await?;
                    }
                    stdout.flush().await?;
                }
            }
        }
        Commands::Head { url } => match fetcher.head(&url).await? {
            Some(metadata) => {
                logger.info(&format!("location: {}", metadata.location));
                logger.info(&format!(
                    "content-type: {}",
                    metadata.content_type.as_deref().unwrap_or("-")
                ));
                logger.info(&format!("content-length: {}", metadata.content_length));
                logger.info(&format!("last-modified: {}", metadata.last_modified));
                logger.info(&format!("etag: {}", metadata.etag.as_deref().unwrap_or("-")));
            }
            None => logger.info("not found"),
        },
        Commands::List { url } => match fetcher.list(&url).await? {
            Some(entries) => {
                for entry in entries {
                    println!("{}", entry);
                }
            }
            None => logger.info("not found"),
        },
    }
    Ok(())
}
