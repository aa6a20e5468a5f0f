use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use asmstudio::lexer::{resolve, tokenize};
use asmstudio::{
    EditorSurface, ProcessAssembler, Selection, Studio, StudioConfig, StudioEvent, lexer::Span,
};

#[derive(Parser)]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[clap(long, short)]
    #[clap(help = "Log debug output to stderr (overrides RUST_LOG)")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[clap(about = "Print the highlight spans of a source file")]
    #[clap(aliases = &["hl"])]
    Highlight(HighlightArgs),
    #[clap(about = "Assemble a source file and canonicalize the HEX output")]
    #[clap(aliases = &["b", "asm"])]
    Build(BuildArgs),
    #[clap(about = "Compare two HEX files by content")]
    #[clap(aliases = &["cmp"])]
    Compare(CompareArgs),
}

#[derive(Args)]
struct HighlightArgs {
    #[clap(help = "Assembly source file")]
    file: PathBuf,
}

#[derive(Args)]
struct BuildArgs {
    #[clap(help = "Main assembly source file")]
    file: PathBuf,
    #[clap(long, help = "Assembler executable")]
    assembler: PathBuf,
    #[clap(long = "include", help = "Additional source file, registered by file name")]
    includes: Vec<PathBuf>,
    #[clap(long, help = "Base definitions include to merge when none is open")]
    definitions: Option<PathBuf>,
    #[clap(long, help = "Reference HEX file to verify the output against")]
    reference: Option<PathBuf>,
    #[clap(long, help = "Write <name>.hex and <name>.lst into this directory")]
    export_dir: Option<PathBuf>,
    #[clap(long, default_value_t = 16, help = "Data bytes per HEX record")]
    record_size: u8,
}

#[derive(Args)]
struct CompareArgs {
    left: PathBuf,
    right: PathBuf,
}

/// Stand-in editor for runs without a text widget.
struct Headless;

impl EditorSurface for Headless {
    fn text(&self) -> String {
        String::new()
    }

    fn selection(&self) -> Selection {
        Selection::default()
    }

    fn apply_highlight(&mut self, _spans: &[Span], _selection: Selection) {}
}

const TASK_TIMEOUT: Duration = Duration::from_secs(120);

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Command::Highlight(args) => highlight(args),
        Command::Build(args) => build(args),
        Command::Compare(args) => compare(args),
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Unable to read {}", path.display()))
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))
}

fn highlight(args: &HighlightArgs) -> Result<()> {
    let text = read(&args.file)?;

    for span in resolve(text.len(), &tokenize(&text)) {
        let line = text[..span.start].matches('\n').count() + 1;
        println!(
            "{line:>5} {:>6}..{:<6} {:<9} {}",
            span.start,
            span.end,
            format!("{:?}", span.class),
            text[span.start..span.end].trim_end()
        );
    }
    Ok(())
}

#[tracing::instrument(skip_all, fields(file = %args.file.display()))]
fn build(args: &BuildArgs) -> Result<()> {
    let mut config = StudioConfig {
        definitions_path: args.definitions.clone(),
        ..StudioConfig::default()
    }
    .with_record_size(args.record_size)?;
    if let Some(dir) = &args.export_dir {
        config.export_dir.clone_from(dir);
    }

    let mut studio = Studio::new(ProcessAssembler::new(&args.assembler), config)?;
    for include in &args.includes {
        studio.documents_mut().open(&file_name(include)?, &read(include)?);
    }
    // Opened last so it is the current document
    studio
        .documents_mut()
        .open(&file_name(&args.file)?, &read(&args.file)?);
    if let Some(reference) = &args.reference {
        studio.set_reference_hex(Some(read(reference)?));
    }

    studio.assemble();
    let report = loop {
        let events = studio.wait(TASK_TIMEOUT, &mut Headless)?;
        if events.is_empty() && !studio.is_busy() {
            bail!("Assembler did not report back");
        }
        match pick_outcome(events)? {
            Some(StudioEvent::Assembled(report)) => break report,
            _ => continue,
        }
    };

    for line in &report.annotated {
        println!("{}", line.numbered());
    }
    eprintln!("{} bytes", report.image_len);

    match report.reference_match {
        Some(false) => bail!("Output differs from the reference HEX"),
        Some(true) => eprintln!("Output matches the reference HEX"),
        None => {}
    }

    if args.export_dir.is_some() {
        studio.export();
        loop {
            let events = studio.wait(TASK_TIMEOUT, &mut Headless)?;
            if events.is_empty() && !studio.is_busy() {
                bail!("Export did not report back");
            }
            if let Some(StudioEvent::Exported(files)) = pick_outcome(events)? {
                eprintln!("Wrote {} and {}", files.hex.display(), files.listing.display());
                break;
            }
        }
    }
    Ok(())
}

/// Log status events and return the first outcome event. Failures become errors.
fn pick_outcome(events: Vec<StudioEvent>) -> Result<Option<StudioEvent>> {
    let mut outcome = None;
    for event in events {
        match event {
            StudioEvent::Status {
                message,
                is_error: true,
            } => bail!(message),
            StudioEvent::Status { message, .. } => tracing::info!("{message}"),
            StudioEvent::AssemblyFailed(text) => bail!(text),
            StudioEvent::Highlighted { .. } => {}
            other => {
                outcome.get_or_insert(other);
            }
        }
    }
    Ok(outcome)
}

fn compare(args: &CompareArgs) -> Result<()> {
    let left = read(&args.left)?;
    let right = read(&args.right)?;

    let differences = ihexlib::diff(&left, &right);
    if differences.is_empty() {
        println!("Images match");
        return Ok(());
    }

    let show = |byte: Option<u8>| byte.map_or_else(|| "--".to_string(), |b| format!("{b:02X}"));
    for d in differences.iter().take(32) {
        println!("  0x{:04X}: {} != {}", d.address, show(d.left), show(d.right));
    }
    bail!("Images differ at {} address(es)", differences.len())
}
