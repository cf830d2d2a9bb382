use std::io::{self, BufWriter, Read, Write};
use std::thread;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use harvest::checkpoint::CheckpointStore;
use harvest::decompression::{open_source, SourceReader};
use harvest::{Error, Message, ReaderBuilder, State};

mod cli;
mod platform;
mod store;

use cli::{Cli, OutputFormat};
use platform::{ExitCode, SignalHandler};
use store::JsonFileStore;

fn main() {
    let cli = Cli::parse();
    init_tracing();

    match run(&cli) {
        Ok(code) => code.exit(),
        Err(e) => {
            eprintln!("harvest: {:#}", e);
            ExitCode::GeneralError.exit();
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = cli.to_config();
    config.validate()?;
    let _signals = SignalHandler::new().context("failed to install signal handlers")?;

    if cli.state_file.is_some() && cli.reads_stdin() {
        bail!("--state-file needs a file input, stdin cannot be resumed");
    }
    let mut store = cli.state_file.as_ref().map(JsonFileStore::new);
    let checkpoint = match &store {
        Some(store) => store
            .load()
            .with_context(|| format!("failed to load {}", store.path().display()))?,
        None => None,
    };

    let source: Box<dyn Read + Send> = match &cli.file {
        Some(path) if !cli.reads_stdin() => Box::new(
            open_source(path).with_context(|| format!("failed to open {}", path.display()))?,
        ),
        _ => Box::new(SourceReader::new(io::stdin())?),
    };

    let mut builder = ReaderBuilder::new(config);
    if let Some(state) = checkpoint {
        debug!(?state, "resuming from saved checkpoint");
        builder = builder.with_checkpoint(state);
    }
    let mut reader = builder.build(source)?;

    let mut out = BufWriter::new(io::stdout().lock());
    let mut last: Option<State> = checkpoint;
    let mut saved = last;
    let mut persist = |state: Option<State>, saved: &mut Option<State>| -> Result<()> {
        if let (Some(store), Some(state)) = (store.as_mut(), state) {
            if *saved != Some(state) {
                store.save(&state)?;
                *saved = Some(state);
            }
        }
        Ok(())
    };

    loop {
        if SignalHandler::should_terminate() {
            break;
        }

        match reader.next() {
            Ok(message) => {
                if let Some(state) = message.checkpoint {
                    last = Some(state);
                }
                match write_message(&mut out, &message, cli.output) {
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => break,
                    other => other?,
                }
            }
            Err(Error::Eof) if cli.follow => {
                flush(&mut out)?;
                persist(last, &mut saved)?;
                thread::sleep(cli.backoff);
            }
            Err(Error::Eof) => break,
            Err(e) if e.is_timeout() => {
                flush(&mut out)?;
                persist(last, &mut saved)?;
            }
            Err(Error::Parse { reason, bytes }) => {
                warn!(%reason, bytes, "skipping unparsable line");
            }
            Err(e) => {
                persist(last, &mut saved)?;
                return Err(e.into());
            }
        }
    }

    flush(&mut out)?;
    persist(last, &mut saved)?;
    if SignalHandler::should_terminate() {
        return Ok(ExitCode::SignalInt);
    }
    Ok(ExitCode::Success)
}

fn flush<W: Write>(out: &mut W) -> Result<()> {
    match out.flush() {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e.into()),
        _ => Ok(()),
    }
}

fn write_message<W: Write>(out: &mut W, message: &Message, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Raw => {
            out.write_all(&message.content)?;
            out.write_all(b"\n")
        }
        OutputFormat::Jsonl => {
            let mut record = serde_json::Map::new();
            record.insert(
                "@timestamp".to_string(),
                message
                    .ts
                    .to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
                    .into(),
            );
            record.insert("message".to_string(), message.content_lossy().into());
            record.insert("bytes".to_string(), message.bytes.into());
            for (key, value) in &message.fields {
                record.insert(key.clone(), value.clone());
            }
            serde_json::to_writer(&mut *out, &record)?;
            out.write_all(b"\n")
        }
    }
}
