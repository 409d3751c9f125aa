use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use stylecache::{
    CacheConfig, CacheHandler, MemoryStyleSource, StyleCacheError, StyleFilter, StyleId,
    StyleSource as _,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stylecache", version)]
struct Cli {
    /// Cache configuration JSON. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Style document JSON.
    #[arg(long, global = true)]
    styles: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate an action file, or every style in the style document.
    Validate(ValidateArgs),
    /// Serve one request path, generating the derivative on a miss.
    Fetch(FetchArgs),
    /// Delete every cached derivative of a style.
    Clear(ClearArgs),
    /// Pre-generate a style's derivatives.
    Warm(WarmArgs),
    /// List styles, optionally with their cached entries.
    List(ListArgs),
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Action text, one action per line.
    #[arg(long)]
    actions: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FetchArgs {
    /// Request path, e.g. `files/image/cache/thumb/cat.jpg`.
    path: String,

    /// Write the served bytes here.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ClearArgs {
    style: String,
}

#[derive(Parser, Debug)]
struct WarmArgs {
    style: String,

    /// Source paths relative to the image root. Every source image when omitted.
    paths: Vec<String>,
}

#[derive(Parser, Debug)]
struct ListArgs {
    /// Also list cached derivatives.
    #[arg(long)]
    entries: bool,

    /// Include disabled styles.
    #[arg(long)]
    all: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.cmd {
        Command::Validate(args) => cmd_validate(&cli, args),
        Command::Fetch(args) => cmd_fetch(&cli, args),
        Command::Clear(args) => cmd_clear(&cli, args),
        Command::Warm(args) => cmd_warm(&cli, args),
        Command::List(args) => cmd_list(&cli, args),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<CacheConfig> {
    match &cli.config {
        Some(path) => CacheConfig::from_json_path(path)
            .with_context(|| format!("load config '{}'", path.display())),
        None => Ok(CacheConfig::default()),
    }
}

fn load_styles(cli: &Cli) -> anyhow::Result<MemoryStyleSource> {
    let path = cli
        .styles
        .as_deref()
        .context("this command needs a style document (--styles)")?;
    MemoryStyleSource::from_json_path(path)
        .with_context(|| format!("load styles '{}'", path.display()))
}

fn make_handler(cli: &Cli) -> anyhow::Result<CacheHandler> {
    let config = load_config(cli)?;
    let styles = load_styles(cli)?;
    Ok(CacheHandler::with_image_primitives(&config, Arc::new(styles)))
}

fn cmd_validate(cli: &Cli, args: &ValidateArgs) -> anyhow::Result<()> {
    let Some(path) = &args.actions else {
        let styles = load_styles(cli)?;
        eprintln!("{} style(s) valid", styles.len());
        return Ok(());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read actions '{}'", path.display()))?;
    match stylecache::parse_action_text(&text) {
        Ok(actions) => {
            for action in &actions {
                println!("{action}");
            }
            Ok(())
        }
        Err(StyleCacheError::InvalidActions(invalid)) => {
            for e in invalid.errors() {
                eprintln!("line {}: {}", e.line, e.reason);
            }
            anyhow::bail!("{invalid}")
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_fetch(cli: &Cli, args: &FetchArgs) -> anyhow::Result<()> {
    let handler = make_handler(cli)?;
    let served = handler
        .fetch(&args.path)
        .with_context(|| format!("fetch '{}'", args.path))?;

    for (name, value) in served.headers.pairs() {
        eprintln!("{name}: {value}");
    }
    if let Some(out) = &args.out {
        std::fs::write(out, &served.body)
            .with_context(|| format!("write '{}'", out.display()))?;
        eprintln!("wrote {}", out.display());
    } else {
        println!("{}", served.path.display());
    }
    Ok(())
}

fn cmd_clear(cli: &Cli, args: &ClearArgs) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let style_id = StyleId::new(args.style.as_str())?;
    let removed = stylecache::cache::invalidate::clear(&config.cache_root, &style_id)?;
    eprintln!("removed {removed} file(s) for style '{style_id}'");
    Ok(())
}

fn cmd_warm(cli: &Cli, args: &WarmArgs) -> anyhow::Result<()> {
    let handler = make_handler(cli)?;
    let style_id = StyleId::new(args.style.as_str())?;
    let paths = if args.paths.is_empty() {
        source_images(handler.resolver().image_root(), handler.resolver().cache_root())?
    } else {
        args.paths.clone()
    };

    let report = handler.warm(&style_id, &paths)?;
    for (path, reason) in &report.failed {
        eprintln!("failed {path}: {reason}");
    }
    eprintln!(
        "{} generated, {} cached, {} failed",
        report.generated,
        report.hits,
        report.failed.len()
    );
    Ok(())
}

fn cmd_list(cli: &Cli, args: &ListArgs) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let styles = load_styles(cli)?;
    let filter = if args.all {
        StyleFilter::All
    } else {
        StyleFilter::Enabled
    };

    for style in styles.list(filter) {
        let state = if style.is_enabled() { "" } else { " (disabled)" };
        println!("{}\t{}{state}", style.id, style.name);
        for line in style.action_lines() {
            println!("  {line}");
        }
        if args.entries {
            for entry in stylecache::cache::invalidate::entries(&config.cache_root, &style.id)? {
                println!("  = {entry}");
            }
        }
    }
    Ok(())
}

/// Every image under `image_root` outside `cache_root`, relative to `image_root`.
fn source_images(image_root: &Path, cache_root: &Path) -> anyhow::Result<Vec<String>> {
    let mut out = Vec::new();
    let walker = walkdir::WalkDir::new(image_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.path() != cache_root);
    for entry in walker {
        let entry = entry.with_context(|| format!("scan '{}'", image_root.display()))?;
        if !entry.file_type().is_file() || image::ImageFormat::from_path(entry.path()).is_err() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(image_root) else {
            continue;
        };
        out.push(rel.to_string_lossy().replace('\\', "/"));
    }
    Ok(out)
}
