//! # Doc Intake CLI (`intake`)
//!
//! The `intake` binary drives the document intake pipeline: database
//! setup, format detection, extraction, full ingestion runs, and review of
//! queued action requests.
//!
//! ## Usage
//!
//! ```bash
//! intake --config ./config/intake.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `intake init` | Create the SQLite database and run schema migrations |
//! | `intake detect <name>` | Print MIME type, extension and extraction branch |
//! | `intake extract <file>` | Extract text and tables without creating anything |
//! | `intake ingest <file>` | Run the full pipeline for a stored file |
//! | `intake fields <doctype>` | List fields a mapping may target |
//! | `intake blueprints` | List configured intake blueprints |
//! | `intake requests list` | List queued action requests |
//! | `intake requests show <id>` | Show one action request with its payload |
//!
//! Logs go to stderr; set `RUST_LOG` or pass `--log-json`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use doc_intake::ingest::IngestRequest;
use doc_intake::{catalog, config, extract_cmd, ingest, logging, migrate, requests};

/// Doc Intake CLI: turn uploaded documents into draft records.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/intake.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "intake",
    about = "Doc Intake: turn uploaded documents into draft records or review tasks",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/intake.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it again leaves existing data in place.
    Init,

    /// Detect the format of a file name without reading it.
    Detect {
        /// File name (only the extension is used).
        name: String,

        /// Declared content-type; overrides the extension.
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Extract text and tables from a stored file and print them.
    Extract {
        /// File name relative to the public (or private) store directory.
        file: String,

        /// Read from the private store.
        #[arg(long)]
        private: bool,

        /// Declared content-type; overrides the extension.
        #[arg(long)]
        content_type: Option<String>,

        /// OCR engine: `on-device` or `cloud`. Defaults to `[ocr].engine`.
        #[arg(long)]
        ocr_engine: Option<String>,

        /// Language hint (`auto`, `en`, `ar`). Defaults to `[ocr].language`.
        #[arg(long)]
        language: Option<String>,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run the full intake pipeline for a stored file.
    ///
    /// Creates the target record when the draft validates and creation is
    /// permitted; otherwise queues an action request for review.
    Ingest {
        /// File name relative to the public (or private) store directory.
        file: String,

        /// Target doctype. Required without a blueprint; with one it must
        /// match the blueprint's target.
        #[arg(long)]
        target: Option<String>,

        /// Blueprint supplying OCR settings and mapping rows.
        #[arg(long)]
        blueprint: Option<String>,

        /// Mapping template to apply when the blueprint names none.
        #[arg(long)]
        template: Option<String>,

        /// Read from the private store.
        #[arg(long)]
        private: bool,

        /// Declared content-type; overrides the extension.
        #[arg(long)]
        content_type: Option<String>,

        /// Stop after extraction; do not build a draft.
        #[arg(long)]
        no_draft: bool,
    },

    /// List the fields of a target doctype a mapping may target.
    Fields {
        doctype: String,
    },

    /// List configured intake blueprints.
    Blueprints,

    /// Inspect queued action requests.
    Requests {
        #[command(subcommand)]
        action: RequestsAction,
    },
}

#[derive(Subcommand)]
enum RequestsAction {
    /// List action requests, newest first.
    List {
        /// Filter by status: `pending`, `approved`, or `rejected`.
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one action request.
    Show {
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_json);

    // Commands that don't require config
    if let Commands::Detect { name, content_type } = &cli.command {
        extract_cmd::run_detect(name, content_type.as_deref());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Detect { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
        Commands::Extract {
            file,
            private,
            content_type,
            ocr_engine,
            language,
            json,
        } => {
            let opts = extract_cmd::ExtractOptions {
                is_private: private,
                content_type,
                ocr_engine,
                language,
                json,
            };
            extract_cmd::run_extract(&cfg, &file, &opts).await?;
        }
        Commands::Ingest {
            file,
            target,
            blueprint,
            template,
            private,
            content_type,
            no_draft,
        } => {
            let req = IngestRequest {
                file_name: file,
                is_private: private,
                content_type: content_type.unwrap_or_default(),
                target_doctype: target,
                blueprint,
                mapping_template: template,
                create_draft: !no_draft,
            };
            ingest::run_ingest(&cfg, &req).await?;
        }
        Commands::Fields { doctype } => {
            catalog::list_fields(&cfg, &doctype)?;
        }
        Commands::Blueprints => {
            catalog::list_blueprints(&cfg)?;
        }
        Commands::Requests { action } => match action {
            RequestsAction::List { status } => {
                requests::run_list(&cfg, status.as_deref()).await?;
            }
            RequestsAction::Show { id } => {
                requests::run_show(&cfg, &id).await?;
            }
        },
    }

    Ok(())
}
