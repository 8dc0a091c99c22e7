mod commands;
mod console;

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};

use voice_capture_core::{
    CaptureError, DeviceStreamBroker, FftAnalyserFactory, PcmEncoderFactory, RecordingDriver, RecordingSession,
    RecordingState, WaveformVisualizer,
};
use voice_capture_cpal::{check_microphone_permission, CpalMicrophone};

use commands::{DemoSettings, LoggingUploader};
use console::{ConsoleDelegate, TerminalSurface};

const DEFAULT_SPONSOR: &str = "live-recorder";

const DEFAULT_DESTINATION: &str = "log://uploads";

fn main() -> Result<(), CaptureError> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices => run_devices(),
        Commands::Record(args) => run_record(args),
    }
}

fn run_devices() -> Result<(), CaptureError> {
    let devices = commands::list_input_devices()?;
    let json = serde_json::to_string_pretty(&devices)
        .map_err(|e| CaptureError::ConfigurationFailed(format!("failed to serialize devices: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn run_record(args: RecordArgs) -> Result<(), CaptureError> {
    let mut settings = match &args.config {
        Some(path) => DemoSettings::load(path)?,
        None => DemoSettings::default(),
    };
    if args.device.is_some() {
        settings.mic_device = args.device;
    }
    if args.max_duration.is_some() {
        settings.max_duration_secs = args.max_duration;
    }
    if args.sponsor.is_some() {
        settings.sponsor = args.sponsor;
    }
    let destination = args
        .destination
        .or_else(|| settings.destination.clone())
        .unwrap_or_else(|| DEFAULT_DESTINATION.to_string());

    if !check_microphone_permission()? {
        log::warn!("Default microphone looks unavailable; trying anyway");
    }

    let mic = match settings.mic_device.clone() {
        Some(name) => CpalMicrophone::with_device(name),
        None => CpalMicrophone::default_device(),
    };
    let broker = Arc::new(DeviceStreamBroker::new(Arc::new(mic)));

    let vis_config = settings.visualizer_config();
    let surface = TerminalSurface::new(args.columns, vis_config.height_px);
    let visualizer = WaveformVisualizer::new(
        Arc::clone(&broker),
        Arc::new(FftAnalyserFactory),
        Box::new(surface),
        vis_config,
    )?;
    visualizer.open()?;

    let mut session = RecordingSession::new(Arc::clone(&broker), Arc::new(PcmEncoderFactory), settings.recording_config())?;
    session.set_delegate(Arc::new(ConsoleDelegate::new(args.json)));
    let mut driver = RecordingDriver::new(session);
    driver.start()?;
    eprintln!("Recording; press Enter to stop early.");

    let stop_requests = spawn_stdin_listener()?;
    let state = loop {
        match stop_requests.recv_timeout(Duration::from_millis(100)) {
            Ok(()) => {
                driver.stop()?;
                break driver.state();
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let state = driver.state();
                if !state.is_busy() {
                    break state;
                }
            }
            // stdin closed; let the duration limit end the recording
            Err(mpsc::RecvTimeoutError::Disconnected) => break driver.wait(),
        }
    };

    visualizer.close();
    eprintln!();

    match state {
        RecordingState::Stopped(_) if args.discard => {
            log::info!("Discarding recording");
            driver.reset();
            Ok(())
        }
        RecordingState::Stopped(_) => {
            let uploader = LoggingUploader::new(destination);
            let sponsor = settings.sponsor.as_deref().unwrap_or(DEFAULT_SPONSOR);
            let receipt = driver.submit(&uploader, sponsor)?;
            println!("{}", receipt.reference);
            Ok(())
        }
        RecordingState::Failed(error) => Err(error),
        other => Err(CaptureError::InvalidState(format!("recording ended in {} state", other.name()))),
    }
}

/// Forward each line typed on stdin as a stop request.
fn spawn_stdin_listener() -> Result<mpsc::Receiver<()>, CaptureError> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("stdin-listener".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                if line.is_err() || tx.send(()).is_err() {
                    break;
                }
            }
        })
        .map_err(|e| CaptureError::ConfigurationFailed(format!("failed to spawn stdin listener: {}", e)))?;
    Ok(rx)
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Live microphone bars and a bounded voice recording", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List input devices as JSON.
    Devices,
    /// Show live bars while recording from the microphone.
    Record(RecordArgs),
}

#[derive(clap::Args, Debug)]
struct RecordArgs {
    /// JSON settings file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input device name, as printed by `devices`.
    #[arg(short, long)]
    device: Option<String>,

    /// Stop automatically after this many seconds.
    #[arg(short, long)]
    max_duration: Option<f64>,

    #[arg(short, long)]
    sponsor: Option<String>,

    /// Label of the upload target reported in the receipt.
    #[arg(long)]
    destination: Option<String>,

    /// Width of the bar display in terminal columns.
    #[arg(long, default_value_t = 60)]
    columns: u16,

    /// Print session events as JSON lines on stdout.
    #[arg(long)]
    json: bool,

    /// Throw the recording away instead of submitting it.
    #[arg(long)]
    discard: bool,
}
