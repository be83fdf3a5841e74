//! PortScope - Main Entry Point
//!
//! Thin interactive glue around the background I/O engine: command-line
//! parsing, logging setup, a console renderer subscribed to the event bus,
//! and a stdin reader that turns typed escape-text into outbound sends.

use anyhow::Context;
use clap::{Parser, Subcommand};
use portscope::config::{
    self, FlowControl, Parity, SerialSettings, SessionConfig, StopBits, TransportConfig,
};
use portscope::engine::SessionEngine;
use portscope::transport::{EchoTransport, GeneratorTransport, SerialTransport, Transport};
use portscope::{codec, probe, SequenceRegistry, SessionEvent};
use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "portscope", about = "Interactive serial-terminal explorer")]
struct Cli {
    /// Render payloads as hex instead of escaped ASCII
    #[arg(long, global = true)]
    hex: bool,

    /// Sequence file to preload (JSON [label, text] pairs)
    #[arg(long, global = true)]
    sequences: Option<PathBuf>,

    /// Receive-pump read timeout in milliseconds
    #[arg(long, global = true, default_value_t = 200)]
    read_timeout_ms: u64,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open a physical serial port
    Serial {
        /// Device path, e.g. /dev/ttyUSB0
        path: String,
        #[arg(long)]
        baud: Option<u32>,
        #[arg(long, default_value_t = 8)]
        data_bits: u8,
        #[arg(long, default_value = "none")]
        parity: Parity,
        #[arg(long, default_value = "1")]
        stop_bits: StopBits,
        /// Software flow control (XON/XOFF)
        #[arg(long)]
        xonxoff: bool,
        /// Hardware RTS/CTS flow control
        #[arg(long)]
        rtscts: bool,
        /// Hardware DSR/DTR flow control
        #[arg(long)]
        dsrdtr: bool,
    },
    /// Loopback session: every send comes straight back
    Echo,
    /// Synthetic byte source for exercising the display
    Generator {
        /// Tick interval in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
    /// Run a session described by a TOML file
    Run {
        /// Session config path
        config: PathBuf,
    },
    /// Search for serial parameters the device responds to
    FindSettings {
        /// Device path, e.g. /dev/ttyUSB0
        path: String,
        /// Per-candidate listen timeout in milliseconds
        #[arg(long, default_value_t = 500)]
        timeout_ms: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; keep the appender guard alive for the process
    let _log_guard = init_logging(cli.log_file.as_deref())?;

    let mut read_timeout = Duration::from_millis(cli.read_timeout_ms);

    let (transport, sequences_path): (Box<dyn Transport>, Option<PathBuf>) = match cli.command {
        Command::FindSettings { path, timeout_ms } => {
            return run_find_settings(&path, Duration::from_millis(timeout_ms));
        }
        Command::Serial {
            path,
            baud,
            data_bits,
            parity,
            stop_bits,
            xonxoff,
            rtscts,
            dsrdtr,
        } => {
            let settings = SerialSettings {
                baud,
                data_bits,
                parity,
                stop_bits,
                flow: FlowControl {
                    software: xonxoff,
                    rts_cts: rtscts,
                    dsr_dtr: dsrdtr,
                },
            };
            (
                Box::new(SerialTransport::open(&path, &settings, read_timeout)?),
                cli.sequences.clone(),
            )
        }
        Command::Echo => (Box::new(EchoTransport::new()), cli.sequences.clone()),
        Command::Generator { interval_ms } => (
            Box::new(GeneratorTransport::new(Duration::from_millis(interval_ms))),
            cli.sequences.clone(),
        ),
        Command::Run { config: path } => {
            let session = SessionConfig::load(&path)?;
            read_timeout = session.read_timeout();
            let transport: Box<dyn Transport> = match session.transport {
                TransportConfig::Serial { ref path, ref settings } => Box::new(SerialTransport::open(
                    &path,
                    &settings,
                    session.read_timeout(),
                )?),
                TransportConfig::Echo => Box::new(EchoTransport::new()),
                TransportConfig::Generator { interval_ms } => Box::new(GeneratorTransport::new(
                    Duration::from_millis(interval_ms),
                )),
            };
            (transport, session.sequences.or(cli.sequences.clone()))
        }
    };

    let mut registry = SequenceRegistry::new();
    if let Some(path) = sequences_path.or_else(config::default_sequences_path) {
        registry
            .load_file(&path)
            .with_context(|| format!("loading sequences from {}", path.display()))?;
        tracing::info!("Loaded {} sequences from {}", registry.len(), path.display());
    }

    run_session(transport, read_timeout, registry, cli.hex)
}

fn init_logging(
    log_file: Option<&std::path::Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let file_layer = match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let name = path.file_name().context("log file has no name")?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,portscope=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer.0)
        .init();

    Ok(file_layer.1)
}

fn run_find_settings(path: &str, timeout: Duration) -> anyhow::Result<()> {
    match probe::find_settings(path, timeout)? {
        Some(settings) => {
            println!("{}: {}", path, settings);
            Ok(())
        }
        None => {
            eprintln!("{}: no settings matched", path);
            std::process::exit(1);
        }
    }
}

/// Spawn the engine and run the presentation loop on this thread
fn run_session(
    transport: Box<dyn Transport>,
    read_timeout: Duration,
    registry: SequenceRegistry,
    hex: bool,
) -> anyhow::Result<()> {
    let (mut engine, mut handle) = SessionEngine::new(transport, read_timeout);
    engine.start()?;
    eprintln!("connected to {} (Ctrl-D to quit)", handle.identity());
    for (i, entry) in registry.iter().enumerate() {
        eprintln!("  !{} sends {:?}", i, entry.label);
    }

    // Console renderer: one line per chunk, switchable format
    handle.subscribe(Box::new(move |event: &SessionEvent| {
        let payload = if hex {
            codec::render_hex(&event.bytes)
        } else {
            codec::render(&event.bytes)
        };
        println!("{} {} {}", event.at.format("%H:%M:%S%.3f"), event.direction, payload);
    }));

    // Stdin reader feeds typed lines to the presentation loop
    let (line_tx, line_rx) = crossbeam_channel::unbounded::<String>();
    std::thread::Builder::new()
        .name("portscope-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if line_tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        })?;

    loop {
        handle.dispatch_pending();

        if let Some(fault) = handle.fault() {
            tracing::error!("Session unusable: {}", fault);
            break;
        }

        match line_rx.recv_timeout(Duration::from_millis(20)) {
            Ok(line) => {
                // "!N" resends saved sequence N; anything else goes through
                // the codec. A codec error is shown inline and nothing is
                // enqueued.
                let bytes = if let Some(index) = line.strip_prefix('!') {
                    match index.trim().parse::<usize>().ok().and_then(|i| registry.get(i)) {
                        Some(raw) => Some(raw.to_vec()),
                        None => {
                            eprintln!("no such sequence: {}", line);
                            None
                        }
                    }
                } else {
                    match codec::parse(&line) {
                        Ok(bytes) => Some(bytes),
                        Err(e) => {
                            eprintln!("not sent: {}", e);
                            None
                        }
                    }
                };
                if let Some(bytes) = bytes {
                    handle.send(bytes)?;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }

    handle.dispatch_pending();
    engine.shutdown();
    Ok(())
}
