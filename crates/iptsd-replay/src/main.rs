#![forbid(unsafe_code)]

//! `iptsd-replay`: run a recorded JSON-lines trace through the stylus and
//! contact pipeline and print (or inject) the result.

mod replay;
mod trace;

use std::env;
use std::error::Error;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use iptsd_core::{Config, OutputSink, RecordingSink};
use tracing_subscriber::EnvFilter;

use crate::replay::{Replay, Step, format_frame, format_report};
use crate::trace::{TraceEvent, parse_trace};

struct Args {
    input: PathBuf,
    config: Option<PathBuf>,
    prediction_ms: Option<u64>,
    uinput: bool,
    log_json: bool,
}

fn print_usage() {
    eprintln!(
        "Usage: iptsd-replay --input <file> [--config <file>] [--prediction-ms <n>] [--uinput] [--log-json]\n\
         \n\
         Environment:\n\
           IPTSD_LOG                        log filter (default: info)\n\
           IPTSD_STYLUS_PREDICTION_MS       look-ahead in milliseconds\n\
           IPTSD_STYLUS_DISABLE             ignore stylus samples\n\
           IPTSD_TEMPORAL_WINDOW            contact history depth\n\
           IPTSD_CHECK_TEMPORAL_STABILITY   drop contacts missing from history\n\
         \n\
         Example:\n\
           iptsd-replay --input /tmp/session.jsonl --prediction-ms 10"
    );
}

fn parse_args() -> Result<Args, String> {
    let mut args = env::args().skip(1);
    let mut input: Option<PathBuf> = None;
    let mut config: Option<PathBuf> = None;
    let mut prediction_ms: Option<u64> = None;
    let mut uinput = false;
    let mut log_json = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--input" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--input requires a value".to_string())?;
                input = Some(PathBuf::from(value));
            }
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--config requires a value".to_string())?;
                config = Some(PathBuf::from(value));
            }
            "--prediction-ms" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--prediction-ms requires a value".to_string())?;
                prediction_ms = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| "invalid --prediction-ms value".to_string())?,
                );
            }
            "--uinput" => uinput = true,
            "--log-json" => log_json = true,
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unexpected argument: {other}")),
        }
    }

    let input = input.ok_or_else(|| "missing --input".to_string())?;

    Ok(Args {
        input,
        config,
        prediction_ms,
        uinput,
        log_json,
    })
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_env("IPTSD_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    // Only fails if a global subscriber is already installed.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn load_config(args: &Args) -> Result<Config, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    config.apply_env()?;
    if let Some(ms) = args.prediction_ms {
        config.stylus.prediction_target_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

/// Print every report and stabilized frame.
fn replay_text(events: Vec<TraceEvent>, config: &Config) -> Result<(), Box<dyn Error>> {
    let mut replay = Replay::new(RecordingSink::new(), config)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut reports = 0usize;

    for event in events {
        let step = replay.step(event);

        // Includes the lift report a disabled channel commits on startup.
        for report in replay.sink_mut().take_reports() {
            reports += 1;
            writeln!(out, "{}", format_report(reports, &report))?;
        }

        if let Step::Frame(frame) = step {
            writeln!(out, "{}", format_frame(replay.frames(), &frame))?;
        }
    }

    out.flush()?;
    summarize(&replay);
    Ok(())
}

/// Inject into a real virtual device.
#[cfg(target_os = "linux")]
fn replay_uinput(events: Vec<TraceEvent>, config: &Config) -> Result<(), Box<dyn Error>> {
    let mut replay = Replay::new(iptsd_uinput::UinputSink::new(), config)?;
    for event in events {
        replay.step(event);
    }

    let failed = replay.stylus().sink().write_errors();
    if failed > 0 {
        tracing::warn!(failed, "some reports were not delivered");
    }
    summarize(&replay);
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn replay_uinput(_events: Vec<TraceEvent>, _config: &Config) -> Result<(), Box<dyn Error>> {
    Err("--uinput is only supported on Linux".into())
}

fn summarize<S: OutputSink>(replay: &Replay<S>) {
    tracing::info!(
        samples = replay.samples(),
        frames = replay.frames(),
        dropped = replay.stabilizer().dropped_count(),
        "replay finished"
    );
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = parse_args().inspect_err(|_| {
        print_usage();
    })?;
    init_logging(args.log_json);

    let config = load_config(&args)?;
    let text = fs::read_to_string(&args.input)?;
    let events = parse_trace(&text)?;
    tracing::debug!(events = events.len(), input = %args.input.display(), "trace loaded");

    if args.uinput {
        replay_uinput(events, &config)
    } else {
        replay_text(events, &config)
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("iptsd-replay error: {err}");
        std::process::exit(1);
    }
}
