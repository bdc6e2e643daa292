use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use logherd::{
    render_filter, render_routing, replay, select, write_if_changed, CommandSink, ConfigDocument,
    FileSink, FileWatcher, Selection,
};

#[derive(Parser)]
#[command(name = "logherd")]
#[command(about = "Author and verify log-ingestion pipeline configuration from annotated log examples")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse config documents and report what they contain
    Check {
        /// Config documents to check
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Render the pipeline filter and routing artifacts
    Render {
        /// Config documents to render
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Directory receiving rendered artifacts
        #[arg(long, value_name = "DIR", default_value = "obj")]
        out_dir: PathBuf,
    },

    /// Render artifacts, then replay example log lines into the pipeline
    Run {
        /// Config document to run
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Replay only the example group at this position (default: all)
        #[arg(long, value_name = "N")]
        example: Option<usize>,

        /// Keep example timestamps instead of rewriting them to now
        #[arg(long)]
        keep_timestamps: bool,

        /// Overwrite the destination log instead of appending
        #[arg(long)]
        truncate: bool,

        /// Destination log file (default: <out-dir>/logs/replayed.log)
        #[arg(long, value_name = "PATH")]
        log_file: Option<PathBuf>,

        /// Deliver output to this command's stdin instead of a local file
        #[arg(long, value_name = "CMD", conflicts_with = "log_file")]
        remote_cmd: Option<String>,

        /// Re-run the pipeline whenever the config document changes
        #[arg(long)]
        watch: bool,

        /// Minimum pause between watched re-runs
        #[arg(long, value_name = "DURATION", default_value = "500ms", value_parser = humantime::parse_duration)]
        debounce: Duration,

        /// Directory receiving rendered artifacts
        #[arg(long, value_name = "DIR", default_value = "obj")]
        out_dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli) {
        eprintln!("logherd: {:#}", e);
        process::exit(1);
    }
}

fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Check { files } => check(&files),
        Command::Render { files, out_dir } => render(&files, &out_dir),
        Command::Run {
            file,
            example,
            keep_timestamps,
            truncate,
            log_file,
            remote_cmd,
            watch,
            debounce,
            out_dir,
        } => {
            let opts = RunOptions {
                file,
                selection: match example {
                    Some(n) => Selection::One(n),
                    None => Selection::All,
                },
                fresh_timestamps: !keep_timestamps,
                truncate,
                log_file,
                remote_cmd,
                out_dir,
            };
            if watch {
                let stop = Arc::new(AtomicBool::new(false));
                {
                    let stop = Arc::clone(&stop);
                    ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
                        .context("failed to install interrupt handler")?;
                }
                let path = opts.file.clone();
                FileWatcher::new(path, debounce)
                    .watch(stop, || run_once(&opts))
                    .map_err(Into::into)
            } else {
                run_once(&opts)
            }
        }
    }
}

fn check(files: &[PathBuf]) -> anyhow::Result<()> {
    for path in files {
        let doc = parse_document(path)?;
        println!(
            "{}: application '{}', {} path(s), {} grok(s), {} example group(s)",
            doc.filename,
            doc.metadata.application,
            doc.metadata.paths.len(),
            doc.metadata.groks.len(),
            doc.examples.len()
        );
    }
    Ok(())
}

fn render(files: &[PathBuf], out_dir: &Path) -> anyhow::Result<()> {
    let mut docs = Vec::new();
    for path in files {
        docs.push(parse_document(path)?);
    }

    for doc in &docs {
        render_filter_artifact(doc, out_dir)?;
    }
    render_routing_artifact(&docs, out_dir)?;
    Ok(())
}

struct RunOptions {
    file: PathBuf,
    selection: Selection,
    fresh_timestamps: bool,
    truncate: bool,
    log_file: Option<PathBuf>,
    remote_cmd: Option<String>,
    out_dir: PathBuf,
}

fn run_once(opts: &RunOptions) -> anyhow::Result<()> {
    let doc = parse_document(&opts.file)?;

    render_filter_artifact(&doc, &opts.out_dir)?;
    render_routing_artifact(std::slice::from_ref(&doc), &opts.out_dir)?;

    // Validate the selection before the sink gets a chance to truncate
    // or spawn anything.
    select(&doc, opts.selection)
        .with_context(|| format!("cannot replay '{}'", doc.filename))?;

    let written = match &opts.remote_cmd {
        Some(command) => {
            let mut sink = CommandSink::spawn(command)?;
            let written = replay(&doc, opts.selection, opts.fresh_timestamps, &mut sink)?;
            println!("delivered {} byte(s) to '{}'", written, command);
            written
        }
        None => {
            let dest = opts
                .log_file
                .clone()
                .unwrap_or_else(|| opts.out_dir.join("logs").join("replayed.log"));
            let mut sink = FileSink::open(&dest, opts.truncate)
                .with_context(|| format!("cannot open '{}'", dest.display()))?;
            let written = replay(&doc, opts.selection, opts.fresh_timestamps, &mut sink)?;
            println!("replayed {} byte(s) to {}", written, dest.display());
            written
        }
    };

    if written == 0 {
        eprintln!("logherd: warning: '{}' has no example lines", doc.filename);
    }
    Ok(())
}

fn parse_document(path: &Path) -> anyhow::Result<ConfigDocument> {
    ConfigDocument::parse_file(path)
        .with_context(|| format!("failed to parse '{}'", path.display()))
}

fn render_filter_artifact(doc: &ConfigDocument, out_dir: &Path) -> anyhow::Result<()> {
    let text = render_filter(&doc.metadata)
        .with_context(|| format!("cannot render filter for '{}'", doc.filename))?;
    let dest = out_dir
        .join("conf")
        .join(format!("{}-filter.conf", doc.metadata.application));
    report(write_if_changed(&dest, &text)?, &dest);
    Ok(())
}

fn render_routing_artifact(docs: &[ConfigDocument], out_dir: &Path) -> anyhow::Result<()> {
    let text = render_routing(docs)?;
    let dest = out_dir.join("conf").join("routing.yml");
    report(write_if_changed(&dest, &text)?, &dest);
    Ok(())
}

fn report(written: bool, dest: &Path) {
    if written {
        println!("wrote {}", dest.display());
    } else {
        println!("unchanged {}", dest.display());
    }
}
