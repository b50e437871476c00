use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;

#[derive(Parser, Debug)]
#[command(name = "framekit", version, about = "Apply a frame template to product photos")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the text fields a template declares.
    Fields(FieldsArgs),
    /// Render the first product image of a request to a file.
    Preview(PreviewArgs),
    /// Frame every product image of a request.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct FieldsArgs {
    /// Template JSON.
    #[arg(long)]
    template: PathBuf,
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// Default font for fields that do not name one (overrides FRAMEKIT_FONT).
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    /// Request JSON (`outputDir` is ignored).
    #[arg(long)]
    request: PathBuf,

    /// Where to write the encoded preview.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Request JSON.
    #[arg(long)]
    request: PathBuf,

    /// Process items on a thread pool; progress arrives in completion order.
    #[arg(long)]
    parallel: bool,

    /// Thread pool size for `--parallel`.
    #[arg(long)]
    threads: Option<usize>,

    /// Print events as JSON lines on stdout.
    #[arg(long)]
    json_events: bool,

    #[command(flatten)]
    engine: EngineArgs,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Fields(args) => cmd_fields(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Run(args) => cmd_run(args),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open request '{}'", path.display()))?;
    serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse request JSON '{}'", path.display()))
}

fn engine_opts(args: &EngineArgs) -> framekit::EngineOpts {
    let opts = framekit::EngineOpts::from_env();
    match &args.font {
        Some(font) => opts.with_default_font(Some(font.clone())),
        None => opts,
    }
}

fn cmd_fields(args: FieldsArgs) -> anyhow::Result<()> {
    let engine = framekit::Engine::default();
    for name in engine.template_fields(&args.template)? {
        println!("{name}");
    }
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let req: framekit::PreviewRequest = read_json(&args.request)?;
    let engine = framekit::Engine::new(engine_opts(&args.engine));
    let bytes = engine.preview(&req)?;
    std::fs::write(&args.out, &bytes)
        .with_context(|| format!("write preview '{}'", args.out.display()))?;
    eprintln!(
        "wrote {} ({}, {} bytes)",
        args.out.display(),
        req.format.mime_type(),
        bytes.len()
    );
    Ok(())
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let req: framekit::BatchRequest = read_json(&args.request)?;
    let mut opts = engine_opts(&args.engine);
    if args.parallel {
        opts = opts.with_parallel(true);
    }
    if args.threads.is_some() {
        opts = opts.with_threads(args.threads);
    }

    let engine = framekit::Engine::new(opts);
    let handle = engine.start_batch(&req)?;
    for event in handle.events().iter() {
        if args.json_events {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            print_event(&event);
        }
    }
    let summary = handle.wait()?;

    if summary.is_failure() {
        anyhow::bail!("none of the {} images could be processed", summary.total);
    }
    Ok(())
}

fn print_event(event: &framekit::BatchEvent) {
    use framekit::{BatchEvent, ProgressStatus};

    match event {
        BatchEvent::Progress(p) => match p.status {
            ProgressStatus::Processing => {}
            ProgressStatus::Success => {
                let out = p
                    .output
                    .as_deref()
                    .map(|o| o.display().to_string())
                    .unwrap_or_default();
                println!("[{}/{}] {} -> {out}", p.current, p.total, p.filename);
            }
            ProgressStatus::Error => println!(
                "[{}/{}] {} failed: {}",
                p.current,
                p.total,
                p.filename,
                p.message.as_deref().unwrap_or("unknown error")
            ),
        },
        BatchEvent::Complete(c) => println!(
            "done: {} processed, {} failed",
            c.processed_count, c.failed_count
        ),
        BatchEvent::Error(e) => eprintln!("error: {}", e.message),
        BatchEvent::Cancelled(c) => println!("cancelled after {} items", c.current),
    }
}
