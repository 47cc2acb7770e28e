//! # Portal CLI (`portal`)
//!
//! Operator interface for the media side of the marketing site: inspect the
//! content sources, list referenced uploads, mirror them from the legacy
//! origin, resolve stored values, and serve the local cache.
//!
//! ## Usage
//!
//! ```bash
//! portal --config ./config/portal.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `portal sources` | List configured content tables with row counts |
//! | `portal media paths` | Print every upload path referenced by content |
//! | `portal media sync` | Download missing uploads into local storage |
//! | `portal media resolve <path>` | Print the display URL for a stored value |
//! | `portal serve` | Start the HTTP server |
//! | `portal completions <shell>` | Print shell completions |

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use portal_media::config;
use portal_media::content::collect_media_paths;
use portal_media::db;
use portal_media::disk::LocalDisk;
use portal_media::logging;
use portal_media::progress::{NoProgress, ProgressMode};
use portal_media::server;
use portal_media::sources;
use portal_media::sync::{self, SyncOptions};
use portal_media_core::locate::MediaLocator;

/// Portal CLI — media mirroring and URL resolution for the marketing site.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file.
#[derive(Parser)]
#[command(
    name = "portal",
    about = "Media mirroring and URL resolution for a legacy-CMS-backed marketing site",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/portal.toml")]
    config: PathBuf,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured content tables and their row counts.
    Sources,

    /// Work with media referenced by CMS content.
    Media {
        #[command(subcommand)]
        action: MediaAction,
    },

    /// Start the HTTP server.
    ///
    /// Serves the local disk under `/storage` and the locator under
    /// `/media/resolve`, bound to `[server].bind`.
    Serve,

    /// Print shell completions.
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum MediaAction {
    /// Print every `/uploads/...` path referenced by the configured tables.
    Paths,

    /// Download referenced uploads from the origin into local storage.
    ///
    /// Files already present locally are skipped. Failed downloads are
    /// reported as warnings and do not stop the pass.
    Sync {
        /// Re-download files even if they already exist locally.
        #[arg(long)]
        force: bool,

        /// Show what would be downloaded without fetching or writing.
        #[arg(long)]
        dry_run: bool,

        /// Progress output on stderr (default: human on a TTY, otherwise off).
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Resolve a stored media value to the URL it should be displayed from.
    Resolve {
        /// Stored value: an upload path or an absolute URL.
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "portal", &mut io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Sources => {
            sources::list_sources(&cfg).await?;
        }
        Commands::Media { action } => match action {
            MediaAction::Paths => {
                let pool = db::connect(&cfg).await?;
                let paths = collect_media_paths(
                    &pool,
                    &cfg.sync.sources,
                    cfg.sync.page_size,
                    &NoProgress,
                )
                .await;
                pool.close().await;
                let paths = paths?;
                for path in &paths {
                    println!("{}", path);
                }
                eprintln!("{} references", paths.len());
            }
            MediaAction::Sync {
                force,
                dry_run,
                progress,
            } => {
                let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
                let reporter = mode.reporter();
                let report =
                    sync::run_sync(&cfg, SyncOptions { force, dry_run }, reporter.as_ref()).await?;
                sync::print_report(&report);
            }
            MediaAction::Resolve { path } => {
                let disk = LocalDisk::from_config(&cfg)?;
                let locator = MediaLocator::new(cfg.media_settings(), Arc::new(disk));
                match locator.locate(Some(&path)).await? {
                    Some(resolved) => println!("{}\t{}", resolved.kind(), resolved.as_str()),
                    None => println!("(none)"),
                }
            }
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
