//! chmview - Inspect extracted compiled-help archives

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use chmview::{
    AdaptOptions, Container, DirectoryContainer, DocumentAdapter, TableOfContents, TocBuilder,
    parse_sitemap,
};

#[derive(Parser)]
#[command(name = "chmview")]
#[command(version, about = "Browse and preview extracted CHM archives", long_about = None)]
#[command(after_help = "EXAMPLES:
    chmview entries help/                     List archive entries
    chmview toc help/ --json                  Print the contents tree as JSON
    chmview adapt help/ html/intro.htm -o intro.html
                                              Write a standalone preview")]
struct Cli {
    /// Log format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List entries with their sizes
    Entries {
        /// Directory holding the extracted archive
        dir: PathBuf,
    },

    /// Print the table of contents
    Toc {
        dir: PathBuf,

        /// Sitemap entry to read (defaults to the first .hhc entry)
        #[arg(long)]
        sitemap: Option<String>,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Adapt one page into a self-contained HTML document
    Adapt {
        dir: PathBuf,

        /// Entry to adapt
        entry: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Archive file name used in links to other pages
        #[arg(long)]
        archive_name: Option<String>,

        /// Keep scripts and event-handler attributes
        #[arg(long)]
        keep_scripts: bool,

        /// Print metadata and diagnostics as JSON
        #[arg(long)]
        json_meta: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let result = match cli.command {
        Command::Entries { dir } => list_entries(&dir),
        Command::Toc { dir, sitemap, json } => show_toc(&dir, sitemap.as_deref(), json),
        Command::Adapt {
            dir,
            entry,
            output,
            archive_name,
            keep_scripts,
            json_meta,
        } => adapt_entry(
            &dir,
            &entry,
            output.as_deref(),
            archive_name,
            keep_scripts,
            json_meta,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "chmview=warn",
        1 => "chmview=info",
        2 => "chmview=debug",
        _ => "chmview=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(io::stderr)
            .init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .init(),
    }
}

fn open(dir: &Path) -> Result<DirectoryContainer, String> {
    DirectoryContainer::new(dir).map_err(|e| format!("{}: {e}", dir.display()))
}

fn list_entries(dir: &Path) -> Result<(), String> {
    let archive = open(dir)?;
    let entries = archive.list_entries().map_err(|e| e.to_string())?;

    let mut out = io::stdout().lock();
    for entry in &entries {
        let size = archive.entry_size(entry).map_err(|e| e.to_string())?;
        writeln!(out, "{size:>10}  {entry}").map_err(|e| e.to_string())?;
    }
    info!(count = entries.len(), "listed entries");

    Ok(())
}

fn show_toc(dir: &Path, sitemap: Option<&str>, json: bool) -> Result<(), String> {
    let archive = open(dir)?;
    let sitemap = match sitemap {
        Some(name) => name.to_string(),
        None => archive
            .list_entries()
            .map_err(|e| e.to_string())?
            .into_iter()
            .find(|e| e.to_ascii_lowercase().ends_with(".hhc"))
            .ok_or_else(|| format!("no .hhc sitemap in {}", dir.display()))?,
    };

    let bytes = archive.read_entry(&sitemap).map_err(|e| e.to_string())?;
    let toc = TocBuilder::new().build(&parse_sitemap(&bytes));
    info!(sitemap = %sitemap, topics = toc.len(), "built table of contents");

    if json {
        let text = serde_json::to_string_pretty(&toc).map_err(|e| e.to_string())?;
        println!("{text}");
    } else {
        print_tree(&toc).map_err(|e| e.to_string())?;
    }

    Ok(())
}

fn print_tree(toc: &TableOfContents) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for (id, level) in toc.iter_dfs() {
        let node = toc.node(id);
        let indent = "  ".repeat(level);
        match &node.entry {
            Some(entry) => writeln!(out, "{indent}{}  [{}]", node.title, entry.name)?,
            None => writeln!(out, "{indent}{}", node.title)?,
        }
    }
    Ok(())
}

fn adapt_entry(
    dir: &Path,
    entry: &str,
    output: Option<&Path>,
    archive_name: Option<String>,
    keep_scripts: bool,
    json_meta: bool,
) -> Result<(), String> {
    let archive = open(dir)?;

    let mut options = AdaptOptions::new().with_strip_scripts(!keep_scripts);
    if let Some(name) = archive_name {
        options = options.with_archive_name(name);
    }
    let doc = DocumentAdapter::new(options)
        .adapt(entry, &archive)
        .map_err(|e| e.to_string())?;

    match output {
        Some(path) => {
            fs::write(path, &doc.bytes).map_err(|e| format!("{}: {e}", path.display()))?
        }
        None => io::stdout()
            .lock()
            .write_all(&doc.bytes)
            .map_err(|e| e.to_string())?,
    }

    // Metadata goes to stderr so it never mixes with a document on stdout.
    if json_meta {
        let report = serde_json::json!({
            "metadata": doc.metadata,
            "diagnostics": doc.diagnostics,
        });
        let text = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        eprintln!("{text}");
    } else {
        for (key, value) in doc.metadata.to_map() {
            eprintln!("{key}: {value}");
        }
        for diagnostic in &doc.diagnostics {
            eprintln!("warning: {diagnostic}");
        }
    }

    Ok(())
}
