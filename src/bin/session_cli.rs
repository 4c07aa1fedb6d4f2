use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use binaural_core::audio::BinauralTone;
use binaural_core::config::{AppConfig, BackendKind, ToneSourceKind};
use binaural_core::session::{self, Session};
use binaural_core::{PlayerSnapshot, SessionCoordinator};
use clap::{Parser, Subcommand};
use tokio_stream::StreamExt;

#[derive(Parser, Debug)]
#[command(
    name = "session_cli",
    about = "Drive binaural sessions from the terminal without the app UI"
)]
struct Cli {
    /// Player configuration file (defaults to assets/player_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a session until it completes or Ctrl-C closes the player
    Play {
        /// Built-in preset id (see `presets`)
        #[arg(long, conflicts_with = "frequency")]
        preset: Option<String>,
        /// Beat frequency for an ad-hoc session
        #[arg(long)]
        frequency: Option<f64>,
        /// Session length in seconds
        #[arg(long)]
        duration: Option<i64>,
        #[arg(long, default_value = "Custom Session")]
        name: String,
        /// Use the in-process stub clock instead of the sound card
        #[arg(long)]
        stub: bool,
        #[arg(long, default_value_t = 250)]
        tick_ms: u64,
        /// Stub seconds per real second
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
        /// Synthesize the binaural tone instead of the placeholder asset
        #[arg(long)]
        binaural: bool,
    },
    /// List built-in presets
    Presets,
    /// Print the effective configuration as JSON
    Config,
    /// Write a binaural tone to a WAV file
    Render {
        #[arg(long)]
        frequency: f64,
        #[arg(long, default_value_t = 10.0)]
        seconds: f64,
        #[arg(long, default_value_t = 200.0)]
        carrier: f64,
        #[arg(long, default_value_t = 44_100)]
        sample_rate: u32,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli
        .config
        .as_ref()
        .map(AppConfig::load_from_file)
        .unwrap_or_else(AppConfig::load);

    match cli.command {
        Commands::Play {
            preset,
            frequency,
            duration,
            name,
            stub,
            tick_ms,
            speed,
            binaural,
        } => {
            let session = resolve_session(preset.as_deref(), frequency, duration, &name)?;
            let mut config = config;
            if stub {
                config.playback.backend = BackendKind::Stub;
                config.stub.auto_clock = true;
                config.stub.tick_ms = tick_ms;
                config.stub.speed = speed;
            }
            if binaural {
                config.playback.source = ToneSourceKind::Binaural;
            }
            run_play(config, session)
        }
        Commands::Presets => run_presets(),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Render {
            frequency,
            seconds,
            carrier,
            sample_rate,
            output,
        } => run_render(frequency, seconds, carrier, sample_rate, output),
    }
}

fn resolve_session(
    preset: Option<&str>,
    frequency: Option<f64>,
    duration: Option<i64>,
    name: &str,
) -> Result<Session> {
    if let Some(preset_id) = preset {
        let Some(preset) = session::find_preset(preset_id) else {
            bail!("unknown preset '{preset_id}' (run `presets` for the list)");
        };
        return Ok(preset.session(duration)?);
    }

    let Some(frequency) = frequency else {
        bail!("either --preset or --frequency is required");
    };
    let session = Session::new(
        format!("cli-{}", frequency),
        name,
        "Custom",
        frequency,
        duration.unwrap_or(1800),
    )?;
    Ok(session)
}

fn run_play(config: AppConfig, session: Session) -> Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    runtime.block_on(async move {
        let coordinator = binaural_core::build_coordinator(&config);
        let mut snapshots = Box::pin(coordinator.view().stream());

        println!("Starting {} ({})", session.name(), session.subtitle());
        coordinator.start_session(session).await?;

        let mut last_second = None;
        loop {
            tokio::select! {
                next = snapshots.next() => {
                    let Some(snapshot) = next else { break };
                    if !snapshot.is_visible {
                        if last_second.is_some() {
                            println!("Session finished");
                            break;
                        }
                        continue;
                    }
                    let second = snapshot.current_time_seconds.floor() as u64;
                    if last_second != Some(second) {
                        last_second = Some(second);
                        print_snapshot(&snapshot);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    println!("Closing player");
                    close(&coordinator).await;
                    break;
                }
            }
        }

        let telemetry = coordinator.telemetry().snapshot();
        println!("{}", serde_json::to_string_pretty(&telemetry)?);
        Ok(ExitCode::SUCCESS)
    })
}

async fn close(coordinator: &SessionCoordinator) {
    coordinator.close_player().await;
    // let the cpal thread shut its stream down before the runtime drops
    tokio::time::sleep(Duration::from_millis(50)).await;
}

fn print_snapshot(snapshot: &PlayerSnapshot) {
    let state = if snapshot.is_playing { "playing" } else { "paused" };
    if let Some(label) = snapshot.time_label() {
        println!(
            "{label}  {:>5.1}%  {state}",
            snapshot.progress * 100.0
        );
    }
}

fn run_presets() -> Result<ExitCode> {
    for preset in session::PRESETS.iter() {
        println!(
            "{:<22} {:<26} {:>5.1} Hz  {:<11} {}",
            preset.id,
            preset.name,
            preset.frequency_hz,
            preset.category,
            session::format_clock(preset.default_duration_seconds as f64)
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn run_render(
    frequency: f64,
    seconds: f64,
    carrier: f64,
    sample_rate: u32,
    output: PathBuf,
) -> Result<ExitCode> {
    let tone = BinauralTone::new(carrier, frequency, 0.5);
    let clip = tone.render(sample_rate, seconds)?;

    let spec = hound::WavSpec {
        channels: clip.channels(),
        sample_rate: clip.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&output, spec)
        .with_context(|| format!("creating {}", output.display()))?;
    for sample in clip.samples() {
        writer.write_sample(*sample)?;
    }
    writer.finalize().context("finalizing WAV file")?;

    println!(
        "Wrote {} ({} Hz left / {} Hz right, {:.1}s)",
        output.display(),
        tone.left_hz(),
        tone.right_hz(),
        clip.duration_secs()
    );
    Ok(ExitCode::SUCCESS)
}
