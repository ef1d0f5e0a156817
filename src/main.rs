use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use slugsmith::{AppConfig, ConfigResolver, Document, MemoryStore, SlugService};

/// Slugsmith CLI: stable, unique slugs for stored records
#[derive(Parser, Debug)]
#[command(name = "slugsmith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the slug a piece of text would get
    #[command(name = "preview")]
    Preview {
        #[command(flatten)]
        args: PreviewArgs,
    },

    /// Slug every declared field of every record in a store file
    #[command(name = "resolve")]
    Resolve {
        #[command(flatten)]
        args: ResolveArgs,
    },
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Text to slug
    #[arg(short, long)]
    text: String,

    /// Store file to check uniqueness against
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Record type the slug is for
    #[arg(long = "type", default_value = "post")]
    record_type: String,

    /// Slug field name
    #[arg(short, long, default_value = "slug")]
    field: String,

    /// Override the separator
    #[arg(long)]
    separator: Option<String>,

    /// Override the maximum length
    #[arg(long)]
    max_length: Option<usize>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct ResolveArgs {
    /// Store file (JSON); created when missing
    #[arg(short, long)]
    store: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Regenerate every slug with a non-empty source
    #[arg(long)]
    force: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Preview { args }) => handle_preview_command(args),
        Some(Command::Resolve { args }) => handle_resolve_command(args),
        None => {
            // Default behavior: show help
            eprintln!("No command specified. Use --help for usage information.");
            eprintln!("Example: slugsmith preview --text \"Hello World\"");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn handle_preview_command(args: PreviewArgs) -> Result<()> {
    init_logging(args.verbose);

    let config = AppConfig::load_or_default(args.config.as_deref())?;
    let store = match &args.store {
        Some(path) => MemoryStore::load(path)?,
        None => MemoryStore::new(),
    };

    let fields = config.fields_for(&args.record_type);
    let mut overrides = fields.get(&args.field).cloned().unwrap_or_default();
    if let Some(separator) = args.separator {
        overrides = overrides.separator(separator);
    }
    if let Some(max_length) = args.max_length {
        overrides = overrides.max_length(max_length);
    }

    let service =
        SlugService::new(store).with_resolver(ConfigResolver::with_overrides(config.defaults));
    let record = Document::new(&args.record_type, fields);
    let slug = service
        .create_slug_from(&record, &args.field, &args.text, Some(&overrides))
        .context("Failed to create slug")?;

    println!("{}", slug);
    Ok(())
}

fn handle_resolve_command(args: ResolveArgs) -> Result<()> {
    init_logging(args.verbose);

    let config = AppConfig::load_or_default(args.config.as_deref())?;
    let store = MemoryStore::load(&args.store)?;
    info!("Loaded {} records from {:?}", store.len(), args.store);

    let resolver = ConfigResolver::with_overrides(config.defaults.clone());
    let mut service = SlugService::new(store).with_resolver(resolver);
    let mut changed = 0;

    for record_type in service.repository().record_types() {
        let fields = config.fields_for(&record_type);
        if fields.is_empty() {
            info!("No slug fields declared for {}, skipping", record_type);
            continue;
        }

        for key in service.repository().keys(&record_type) {
            let Some(mut document) = service
                .repository()
                .get(&record_type, &key, fields.clone())
            else {
                continue;
            };

            let touched = service
                .resolve_all(&mut document, args.force)
                .context(format!("Failed to resolve slugs for {} {}", record_type, key))?;
            if touched.is_empty() {
                continue;
            }

            for field in &touched {
                println!(
                    "{} {} {}={}",
                    record_type,
                    key,
                    field,
                    document.get_str(field).unwrap_or_default()
                );
            }
            service.repository_mut().save(&mut document);
            changed += 1;
        }
    }

    service.repository().persist(&args.store)?;
    info!("Updated {} records", changed);

    Ok(())
}
