//! visual-edits command line
//!
//! `tag` runs the element tagger over source files; `inspect` loads a
//! rendered page and lists the identifiers found on it.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use visual_edits::dom::HtmlLoader;
use visual_edits::overlay::{ElementId, IdentifierIndex};
use visual_edits::{ComponentTagger, Config, NAME, Result, TagOutcome, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "visual-edits",
    version,
    about = "Tag JSX/TSX elements with source identifiers and inspect tagged pages"
)]
struct Cli {
    /// JSON settings file with `tagger` and `overlay` sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tag source files and write the rewritten code with source maps
    Tag(TagArgs),
    /// List the identifiers of a tagged HTML page
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct TagArgs {
    /// Source files to tag
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Directory identifiers are relative to (overrides the settings file)
    #[arg(long)]
    root: Option<PathBuf>,
    /// Write `<file>` and `<file>.map` under this directory instead of stdout
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Rendered HTML page
    html: PathBuf,
    /// Print JSON instead of a table
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    log::debug!("{} v{}", NAME, VERSION);

    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Tag(args) => command_tag(args, config),
        Commands::Inspect(args) => command_inspect(args),
    }
}

fn command_tag(args: TagArgs, mut config: Config) -> Result<()> {
    if let Some(root) = args.root {
        config.tagger.root = root;
    }
    let tagger = ComponentTagger::new(config.tagger);
    let mut tagged_files = 0;

    for file in &args.files {
        let source = std::fs::read_to_string(file)?;
        let outcome = tagger.tag(file, &source)?;
        match &args.out_dir {
            Some(out_dir) => {
                let target = out_dir.join(output_name(tagger.config().root.as_path(), file));
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&target, outcome.code(&source))?;
                if let TagOutcome::Tagged(tagged) = &outcome {
                    let json = serde_json::to_string(&tagged.map).map_err(std::io::Error::other)?;
                    std::fs::write(map_path(&target), json)?;
                }
                log::info!("wrote {}", target.display());
            }
            None => print!("{}", outcome.code(&source)),
        }
        if let TagOutcome::Tagged(tagged) = &outcome {
            tagged_files += 1;
            log::info!("{}: {} elements tagged", file.display(), tagged.elements.len());
        }
    }

    log::info!("{} of {} files tagged", tagged_files, args.files.len());
    Ok(())
}

fn command_inspect(args: InspectArgs) -> Result<()> {
    let html = std::fs::read_to_string(&args.html)?;
    let document = HtmlLoader::new().parse(&html)?;
    let mut index = IdentifierIndex::new();
    index.refresh(&document);
    let counts = index.counts();

    if args.json {
        let rows: Vec<_> = counts
            .iter()
            .map(|(id, count)| {
                let location = ElementId::parse(id);
                serde_json::json!({
                    "id": id,
                    "instances": count,
                    "filePath": location.as_ref().map(|l| l.file_path.clone()),
                    "line": location.as_ref().map(|l| l.line),
                    "column": location.as_ref().map(|l| l.column),
                    "mapContext": location.as_ref().and_then(|l| l.map_context.clone()),
                })
            })
            .collect();
        println!("{}", serde_json::Value::Array(rows));
        return Ok(());
    }

    for (id, count) in &counts {
        let marker = if ElementId::parse(id).is_some() { "" } else { "  (malformed)" };
        println!("{:>4}  {}{}", count, id, marker);
    }
    println!("{} identifiers", counts.len());
    Ok(())
}

/// Output path of `file` below the output directory
fn output_name(root: &Path, file: &Path) -> PathBuf {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative
        .components()
        .filter(|c| matches!(c, std::path::Component::Normal(_)))
        .collect()
}

fn map_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".map");
    PathBuf::from(name)
}
