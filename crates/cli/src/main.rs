#![deny(warnings)]

mod render;

use anyhow::Context;
use clap::Parser;
use mood_mirror_core::camera::{CameraError, SimulatedCamera};
use mood_mirror_core::clock::SystemClock;
use mood_mirror_core::config::{
    resolve_location, ConfidenceThreshold, Env, MirrorConfig, StdEnv, Timing, WeatherEndpoints,
};
use mood_mirror_core::mirror::{Control, Mirror, MirrorParts};
use mood_mirror_core::mood::{SimulatedEmotionSampler, DEFAULT_CONFIDENCE_THRESHOLD};
use mood_mirror_core::voice::{
    ConsoleRecognizer, SimulatedSynthesizer, SpeechRecognizer, SpeechSynthesizer, VoiceInfo,
};
use mood_mirror_core::weather::{
    FixedLocation, GeoLocator, IpGeoLocator, NoDeviceLocation, OpenMeteoClient, WeatherResolver,
};
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const CONTROL_BUFFER: usize = 16;
const EVENT_BUFFER: usize = 256;
const TYPED_SPEECH_BUFFER: usize = 8;

#[derive(Parser, Debug)]
#[command(name = "mood-mirror")]
#[command(about = "Headless smart mirror: clock, weather, mood quotes and a voice assistant")]
struct Args {
    /// Device position as "LAT,LON". Without it weather starts at the IP lookup.
    #[arg(long)]
    location: Option<String>,

    /// Run as if no camera were attached.
    #[arg(long)]
    no_camera: bool,

    /// Run as if speech recognition were unavailable.
    #[arg(long)]
    no_voice: bool,

    /// Seed for every random draw, for reproducible sessions.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    forecast_url: Option<String>,

    #[arg(long)]
    geocoding_url: Option<String>,

    #[arg(long)]
    ip_lookup_url: Option<String>,

    #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    confidence_threshold: f32,

    /// Print every event as a JSON line instead of text.
    #[arg(long)]
    json: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let json = args.json;
    let env = StdEnv;
    let cfg = build_config(args, &env)?;

    tracing::info!(
        camera = cfg.camera_enabled,
        voice = cfg.voice_enabled,
        device_location = cfg.device_location.is_some(),
        threshold = cfg.confidence_threshold.get(),
        "config loaded"
    );

    run_mirror(cfg, json).await
}

async fn run_mirror(cfg: MirrorConfig, json: bool) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(cfg.timing.http_timeout)
        .build()
        .context("failed to build http client")?;
    let provider = OpenMeteoClient::new(
        client.clone(),
        &cfg.endpoints.forecast,
        &cfg.endpoints.geocoding,
    )?;
    let ip = IpGeoLocator::new(client, &cfg.endpoints.ip_lookup)?;
    let device: Arc<dyn GeoLocator> = match cfg.device_location {
        Some(at) => Arc::new(FixedLocation(at)),
        None => Arc::new(NoDeviceLocation),
    };
    let weather = WeatherResolver::new(device, Arc::new(ip), Arc::new(provider))
        .with_geolocation_timeout(cfg.timing.geolocation_timeout);

    let camera = if cfg.camera_enabled {
        SimulatedCamera::new()
    } else {
        SimulatedCamera::failing(CameraError::Unsupported)
    };
    let sampler = match cfg.seed {
        Some(seed) => {
            SimulatedEmotionSampler::seeded(seed.wrapping_add(1), cfg.timing.processing_delay)
        }
        None => SimulatedEmotionSampler::new(cfg.timing.processing_delay),
    };

    let (recognizer, typed_speech, synthesizer) = if cfg.voice_enabled {
        let (typed_tx, typed_rx) = mpsc::channel(TYPED_SPEECH_BUFFER);
        let recognizer: Arc<dyn SpeechRecognizer> = Arc::new(ConsoleRecognizer::new(typed_rx));
        let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(
            SimulatedSynthesizer::new(cfg.timing.speech_per_char).with_voices(vec![
                VoiceInfo::new("Alex", "en-US"),
                VoiceInfo::new("Samantha", "en-US"),
            ]),
        );
        (Some(recognizer), Some(typed_tx), Some(synthesizer))
    } else {
        (None, None, None)
    };

    let mirror = Mirror::new(
        &cfg,
        MirrorParts {
            camera: Arc::new(camera),
            sampler: Arc::new(sampler),
            recognizer,
            typed_speech,
            synthesizer,
            weather,
            clock: Arc::new(SystemClock),
        },
    )?;

    let (control_tx, control_rx) = mpsc::channel(CONTROL_BUFFER);
    let (event_tx, mut event_rx) = mpsc::channel(EVENT_BUFFER);
    let mirror_task = tokio::spawn(mirror.run(control_rx, event_tx));

    spawn_stdin_reader(control_tx.clone());
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            let _ = control_tx.send(Control::Shutdown).await;
        }
    });

    let mut renderer = render::Renderer::new(json);
    while let Some(event) = event_rx.recv().await {
        if let Some(line) = renderer.render(&event)? {
            println!("{line}");
        }
    }

    interrupt.abort();
    mirror_task.await.context("mirror task panicked")??;
    Ok(())
}

/// Blocking stdin reads live on their own thread so they never hold up
/// runtime shutdown.
fn spawn_stdin_reader(controls: mpsc::Sender<Control>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            };
            let Some(control) = parse_command(&line) else {
                continue;
            };
            if controls.blocking_send(control).is_err() {
                break;
            }
        }
        tracing::debug!("stdin closed");
    });
}

fn parse_command(line: &str) -> Option<Control> {
    match line.trim() {
        "" => None,
        "/listen" => Some(Control::ToggleListening),
        "/refresh" => Some(Control::RefreshWeather),
        "/retry" => Some(Control::RetryCamera),
        "/quit" | "/exit" => Some(Control::Shutdown),
        text => Some(Control::Utterance(text.to_owned())),
    }
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_config(args: Args, env: &impl Env) -> anyhow::Result<MirrorConfig> {
    let endpoints =
        WeatherEndpoints::resolve(args.forecast_url, args.geocoding_url, args.ip_lookup_url, env)?;
    let device_location = resolve_location(args.location, env)?;
    let confidence_threshold = ConfidenceThreshold::new(args.confidence_threshold)?;

    Ok(MirrorConfig {
        endpoints,
        device_location,
        confidence_threshold,
        timing: Timing::default(),
        camera_enabled: !args.no_camera,
        voice_enabled: !args.no_voice,
        seed: args.seed,
        select_initial_quote: true,
    })
}
