//! Command-line front end for linktrack.
//!
//! Generates and decodes tracking links and adapts HTML documents using the
//! configuration read from the environment.
//!
//! # Usage
//!
//! ```bash
//! # Generate an encryption key
//! linktrack keygen
//!
//! # Open-tracking (pixel) link
//! linktrack open --metadata '{"customer_id": 1}'
//!
//! # Click-tracking link
//! linktrack click https://www.example.com/landing --metadata '{"customer_id": 1}'
//!
//! # Decode a link, a request path or a bare token
//! linktrack decode https://trackingdomain.com/path/eyJtZXRh...
//!
//! # Adapt an email (use - for stdin)
//! linktrack adapt email.html --metadata '{"customer_id": 1}' > tracked.html
//! ```
//!
//! # Environment Variables
//!
//! - `TRACKING_*`: see [`linktrack::config`]
//! - `RUST_LOG`: log filter (default: `info`)
//! - `LOG_FORMAT`: `text` or `json` (default: `text`)
//!
//! Logs go to stderr so that stdout only carries the command output.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;

use linktrack::codec::FernetCipher;
use linktrack::config::Configuration;
use linktrack::domain::{Metadata, metadata_from};
use linktrack::html::adapt_html;
use linktrack::tracking::{decode_token, get_click_tracking_url, get_open_tracking_url};
use linktrack::utils::{strip_base_url, token_from_path};

/// Tracking link generator and HTML adapter.
#[derive(Parser)]
#[command(name = "linktrack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an open-tracking (pixel) link
    Open {
        /// Metadata as a JSON object
        #[arg(short, long)]
        metadata: Option<String>,
    },

    /// Print a click-tracking link
    Click {
        /// Destination URL
        url: String,

        /// Metadata as a JSON object
        #[arg(short, long)]
        metadata: Option<String>,
    },

    /// Decode a tracking link, request path or token
    Decode {
        /// Full link, path or bare token
        encoded: String,

        /// Print the webhook body instead of the full result
        #[arg(long)]
        webhook: bool,
    },

    /// Rewrite an HTML document for tracking
    Adapt {
        /// HTML file, or - for stdin
        input: PathBuf,

        /// Leave links untouched
        #[arg(long)]
        no_click: bool,

        /// Do not insert the open-tracking pixel
        #[arg(long)]
        no_open: bool,

        /// Metadata as a JSON object
        #[arg(short, long)]
        metadata: Option<String>,
    },

    /// Generate a fresh encryption key
    Keygen,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Open { metadata } => {
            let config = load_config()?;
            let metadata = parse_metadata(metadata.as_deref())?;
            println!("{}", get_open_tracking_url(metadata.as_ref(), &config)?);
        }
        Commands::Click { url, metadata } => {
            let config = load_config()?;
            let metadata = parse_metadata(metadata.as_deref())?;
            println!("{}", get_click_tracking_url(&url, metadata.as_ref(), &config)?);
        }
        Commands::Decode { encoded, webhook } => decode(&encoded, webhook, &load_config()?)?,
        Commands::Adapt {
            input,
            no_click,
            no_open,
            metadata,
        } => {
            let config = load_config()?;
            let metadata = parse_metadata(metadata.as_deref())?;
            let html = read_input(&input)?;
            let adapted = adapt_html(&html, metadata.as_ref(), !no_click, !no_open, &config)
                .context("Failed to adapt HTML")?;
            print!("{adapted}");
        }
        Commands::Keygen => keygen()?,
    }

    Ok(())
}

fn load_config() -> Result<Configuration> {
    let config = Configuration::from_env()?;
    if tracing::enabled!(tracing::Level::DEBUG) {
        config.print_summary();
    }
    Ok(config)
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        Ok("text") | Err(_) => builder.init(),
        Ok(other) => bail!("LOG_FORMAT must be 'text' or 'json', got '{}'", other),
    }

    Ok(())
}

/// Decodes whatever the user pasted: the base URL of either kind is
/// stripped, then the last path segment is taken as the token.
fn decode(encoded: &str, webhook: bool, config: &Configuration) -> Result<()> {
    let path = [config.base_click_tracking_url(), config.base_open_tracking_url()]
        .into_iter()
        .flatten()
        .find_map(|base| strip_base_url(encoded, base))
        .unwrap_or(encoded);

    let result = decode_token(token_from_path(path), config).context("Failed to decode token")?;

    let kind = if result.is_click_tracking {
        "click".bright_cyan()
    } else {
        "open".bright_green()
    };
    eprintln!("{} {}", "Decoded".bright_white().bold(), kind);

    let json = if webhook {
        serde_json::to_string_pretty(&result.webhook_payload())?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    println!("{json}");

    Ok(())
}

fn keygen() -> Result<()> {
    let key = FernetCipher::generate_key()?;

    println!("{}", key.bright_yellow().bold());
    eprintln!();
    eprintln!(
        "{}",
        "Keep this key secret. Tokens sealed with it cannot be read without it."
            .red()
            .bold()
    );
    eprintln!("  {}={}", "TRACKING_ENCRYPTION_KEY".bright_cyan(), key);

    Ok(())
}

fn parse_metadata(raw: Option<&str>) -> Result<Option<Metadata>> {
    raw.map(|raw| {
        let value: serde_json::Value =
            serde_json::from_str(raw).context("--metadata must be valid JSON")?;
        metadata_from(&value).context("--metadata must be a JSON object")
    })
    .transpose()
}

fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut html = String::new();
        io::stdin()
            .read_to_string(&mut html)
            .context("Failed to read HTML from stdin")?;
        return Ok(html);
    }

    std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))
}
