//! IJB-A CLI
//!
//! Command-line access to the IJB-A protocol database:
//! - Listing protocols, clients and model ids
//! - Listing the files of a protocol/group/purpose selection
//! - Materializing file paths and checking originals on disk
//! - Printing the data-integrity reports of the manifests a query touched

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use ijba_db::{
    CacheKeyMode, Database, DatabaseConfig, FileRecord, LoadReport, ManifestLayout, ObjectQuery,
    TemplateId,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod files;

#[derive(Parser)]
#[command(name = "ijba")]
#[command(author, version, about = "IJB-A face recognition benchmark: protocol queries")]
struct Cli {
    #[command(flatten)]
    database: DatabaseArgs,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DatabaseArgs {
    /// Root of the protocol CSV tree
    #[arg(long, env = "IJBA_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// JSON configuration file (flags below override it)
    #[arg(long, env = "IJBA_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Split folders live directly under the data directory
    #[arg(long, global = true)]
    flat: bool,

    /// Master file manifest, relative to the data directory
    #[arg(long, global = true)]
    metadata: Option<PathBuf>,

    /// Manifest column layout
    #[arg(long, value_enum, global = true)]
    layout: Option<LayoutArg>,

    /// Directory holding the original images and frames
    #[arg(long, global = true)]
    original_dir: Option<PathBuf>,

    /// Extension of the original files (defaults to each record's own)
    #[arg(long, global = true)]
    original_ext: Option<String>,

    /// Fail when a comparison list references unknown templates
    #[arg(long, global = true)]
    strict: bool,

    /// Do not share parsed manifests between protocols
    #[arg(long, global = true)]
    per_protocol_cache: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum LayoutArg {
    /// 25 columns (with FACIAL_HAIR)
    Current,
    /// 24 columns
    Legacy,
}

impl From<LayoutArg> for ManifestLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Current => ManifestLayout::Current,
            LayoutArg::Legacy => ManifestLayout::Legacy,
        }
    }
}

/// Protocol/group/purpose/model selection shared by the file-level commands.
#[derive(Args, Clone)]
struct Selection {
    /// Protocol name (search_split1..10, compare_split1..10)
    #[arg(short, long, default_value = "search_split1")]
    protocol: String,

    /// Groups (world, dev); all when omitted
    #[arg(short, long = "group")]
    groups: Vec<String>,

    /// Purposes (enroll, probe); all when omitted
    #[arg(long = "purpose")]
    purposes: Vec<String>,

    /// Model (template) ids; required for compare probes
    #[arg(short, long = "model")]
    models: Vec<u64>,

    /// Keep only these media ids
    #[arg(long = "media")]
    media: Vec<u64>,

    /// Keep only these video frames
    #[arg(long = "frame")]
    frames: Vec<u32>,
}

impl Selection {
    fn to_query(&self) -> ObjectQuery {
        let mut query = ObjectQuery::new(&self.protocol)
            .groups(&self.groups)
            .purposes(&self.purposes);
        if !self.models.is_empty() {
            query = query.model_ids(self.models.iter().copied());
        }
        if !self.media.is_empty() {
            query = query.media_ids(self.media.iter().copied());
        }
        if !self.frames.is_empty() {
            query = query.frames(self.frames.iter().copied());
        }
        query
    }

    fn model_ids(&self) -> Option<Vec<TemplateId>> {
        (!self.models.is_empty()).then(|| self.models.iter().copied().map(TemplateId::from).collect())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the 20 protocol names
    Protocols,

    /// List client (subject) ids reachable for a protocol and groups
    Clients {
        #[arg(short, long, default_value = "search_split1")]
        protocol: String,
        #[arg(short, long = "group")]
        groups: Vec<String>,
    },

    /// List model ids of the dev group
    Models {
        #[command(flatten)]
        selection: Selection,
    },

    /// List the files selected by a query
    Objects {
        #[command(flatten)]
        selection: Selection,
        /// Print records (with annotations) as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print materialized file paths for a query
    Path {
        #[command(flatten)]
        selection: Selection,
        /// Directory prepended to every path
        #[arg(
            short,
            long,
            default_value = "",
            value_parser = clap::builder::TypedValueParser::map(clap::builder::OsStringValueParser::new(), PathBuf::from)
        )]
        directory: PathBuf,
        /// Extension of the materialized files (defaults to each record's own)
        #[arg(short, long)]
        extension: Option<String>,
        /// Leave the sighting id out of the file name
        #[arg(long)]
        no_sighting: bool,
    },

    /// Report original files of a query that are missing on disk
    Checkfiles {
        #[command(flatten)]
        selection: Selection,
    },

    /// Run a query and print the integrity reports of every manifest it loaded
    Diagnostics {
        #[command(flatten)]
        selection: Selection,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = build_config(&cli.database)?;
    let db = Database::new(config);

    match cli.command {
        Commands::Protocols => {
            for name in db.protocol_names() {
                println!("{name}");
            }
        }
        Commands::Clients { protocol, groups } => {
            let ids = db
                .client_ids(&protocol, &groups)
                .with_context(|| format!("listing clients of {protocol}"))?;
            for id in ids {
                println!("{id}");
            }
        }
        Commands::Models { selection } => {
            let models = selection.model_ids();
            let ids = db
                .model_ids(&selection.protocol, &selection.purposes, models.as_deref())
                .with_context(|| format!("listing models of {}", selection.protocol))?;
            for id in ids {
                println!("{id}");
            }
        }
        Commands::Objects { selection, json } => cmd_objects(&db, &selection, json)?,
        Commands::Path {
            selection,
            directory,
            extension,
            no_sighting,
        } => {
            let objects = query(&db, &selection)?;
            let paths = files::materialize(&objects, &directory, extension.as_deref(), !no_sighting);
            if paths.is_empty() {
                bail!("query selected no files");
            }
            for path in paths {
                println!("{}", path.display());
            }
        }
        Commands::Checkfiles { selection } => {
            let objects = query(&db, &selection)?;
            let report = files::check_originals(&db, &objects).context("checking original files")?;
            for path in &report.missing {
                println!("{}", path.display());
            }
            if !report.missing.is_empty() {
                bail!(
                    "{} of {} original files are missing",
                    report.missing.len(),
                    report.checked
                );
            }
            eprintln!("{} all {} original files exist", "ok".green().bold(), report.checked);
        }
        Commands::Diagnostics { selection, json } => {
            let objects = query(&db, &selection)?;
            eprintln!("{} {} files selected", "info:".yellow().bold(), objects.len());
            print_reports(&db.diagnostics(), json)?;
        }
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &DatabaseArgs) -> Result<DatabaseConfig> {
    let mut config = match (&args.config, &args.data_dir) {
        (Some(path), _) => DatabaseConfig::from_json_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        (None, Some(root)) => DatabaseConfig::new(root),
        (None, None) => bail!("no data directory: pass --data-dir or set IJBA_DATA_DIR"),
    };
    if let (Some(_), Some(root)) = (&args.config, &args.data_dir) {
        config.annotations_directory = root.clone();
    }
    if args.flat {
        config.search_sets = PathBuf::new();
        config.compare_sets = PathBuf::new();
    }
    if let Some(metadata) = &args.metadata {
        config = config.with_metadata(metadata);
    }
    if let Some(layout) = args.layout {
        config = config.with_layout(layout.into());
    }
    if let Some(dir) = &args.original_dir {
        let extension = args.original_ext.clone().or(config.original_extension.take());
        config = config.with_original_directory(dir, extension);
    } else if args.original_ext.is_some() {
        config.original_extension = args.original_ext.clone();
    }
    if args.strict {
        config = config.with_strict_comparisons(true);
    }
    if args.per_protocol_cache {
        config = config.with_cache_key(CacheKeyMode::Protocol);
    }
    tracing::debug!(root = %config.annotations_directory.display(), "database configured");
    Ok(config)
}

fn query(db: &Database, selection: &Selection) -> Result<Vec<Arc<FileRecord>>> {
    db.objects(&selection.to_query())
        .with_context(|| format!("querying {}", selection.protocol))
}

fn cmd_objects(db: &Database, selection: &Selection, json: bool) -> Result<()> {
    let objects = query(db, selection)?;
    if json {
        let records: Vec<&FileRecord> = objects.iter().map(|f| f.as_ref()).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    for file in &objects {
        let frame = file.frame.map(|f| f.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "{}\tclient={}\tmedia={}\tframe={}",
            file.path_id(),
            file.client_id,
            file.media_id,
            frame
        );
    }
    eprintln!("{} {} files", "ok".green().bold(), objects.len());
    Ok(())
}

fn print_reports(reports: &[LoadReport], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reports)?);
        return Ok(());
    }
    for report in reports {
        let status = if report.is_clean() {
            "clean".green().bold()
        } else {
            "issues".red().bold()
        };
        println!(
            "{} {} (rows={} templates={})",
            status,
            report.manifest.display(),
            report.rows,
            report.templates
        );
        for path_id in &report.files_not_found {
            println!("  file not found: {path_id}");
        }
        for row in &report.unresolved_clients {
            println!("  line {}: subject of {} unresolved ({})", row.line, row.template_id, row.path_id);
        }
        for mismatch in &report.client_mismatches {
            println!(
                "  line {}: template {} bound to subject {}, row says {}",
                mismatch.line, mismatch.template_id, mismatch.expected, mismatch.found
            );
        }
        for id in &report.unresolved_comparisons {
            println!("  comparison references unknown template {id}");
        }
        for duplicate in &report.duplicate_files {
            println!("  line {}: duplicate of {} ignored", duplicate.line, duplicate.path_id);
        }
    }
    Ok(())
}
