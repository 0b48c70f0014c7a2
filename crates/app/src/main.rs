use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Args, Parser, Subcommand};
use sound_cues_core::{
    AppConfig, AssetFetcher, AudioContext, AudioCueService, ContextFactory, FsFetcher,
    NullContext, PlaybackOutcome, SoundCueError,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> sound_cues_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli.source)?;
    let service = build_service(&cli.source, &config)?;

    match cli.command {
        Commands::Catalog => run_catalog(&service),
        Commands::Preload => run_preload(&service).await,
        Commands::Play { cue, volume } => {
            let volume = volume.unwrap_or(config.playback.default_volume);
            run_play(&service, &cue, volume).await
        }
        Commands::Scroll { offsets } => run_scroll(&service, &config.scroll.cue, &offsets).await,
    }
}

fn run_catalog(service: &AudioCueService) -> sound_cues_core::Result<()> {
    for (cue, path) in service.catalog().iter() {
        println!("{cue:<12} {path}");
    }
    Ok(())
}

async fn run_preload(service: &AudioCueService) -> sound_cues_core::Result<()> {
    let loaded = service.preload().await;
    for (cue, path) in service.catalog().iter() {
        match service.cache().get(path) {
            Some(buffer) => println!(
                "{cue:<12} {} ch  {} Hz  {:.3}s",
                buffer.channels(),
                buffer.sample_rate(),
                buffer.duration().as_secs_f64()
            ),
            None => println!("{cue:<12} unavailable"),
        }
    }

    if loaded == 0 && !service.catalog().is_empty() {
        return Err(SoundCueError::msg("no sound cue could be loaded"));
    }
    Ok(())
}

async fn run_play(
    service: &AudioCueService,
    cue: &str,
    volume: f32,
) -> sound_cues_core::Result<()> {
    tracing::info!(cue, volume, "playing cue");
    service.activate();

    let Some(path) = service.catalog().path(cue) else {
        return Err(SoundCueError::msg(format!("unknown cue `{cue}`")));
    };
    let outcome = match service.play_cue(path, volume) {
        Some(ticket) => ticket.await,
        None => PlaybackOutcome::Rejected,
    };

    if outcome != PlaybackOutcome::Started {
        return Err(SoundCueError::msg(format!(
            "cue `{cue}` did not play: {outcome:?}"
        )));
    }
    if let Some(buffer) = service.cache().get(path) {
        // Voices are detached; keep the process alive until this one ends.
        tokio::time::sleep(buffer.duration()).await;
    }
    Ok(())
}

async fn run_scroll(
    service: &AudioCueService,
    scroll_cue: &str,
    offsets: &[f64],
) -> sound_cues_core::Result<()> {
    service.activate();

    let mut longest = Duration::ZERO;
    for offset in offsets {
        match service.on_scroll(*offset) {
            Some(ticket) => {
                let outcome = ticket.await;
                println!("{offset:>10.1}  cue {outcome:?}");
                if let Some(buffer) = service
                    .catalog()
                    .path(scroll_cue)
                    .and_then(|path| service.cache().get(path))
                {
                    longest = longest.max(buffer.duration());
                }
            }
            None => println!("{offset:>10.1}  -"),
        }
    }

    tokio::time::sleep(longest).await;
    Ok(())
}

fn load_config(source: &SourceArgs) -> sound_cues_core::Result<AppConfig> {
    match &source.config {
        Some(path) => {
            tracing::debug!(?path, "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn build_service(
    source: &SourceArgs,
    config: &AppConfig,
) -> sound_cues_core::Result<AudioCueService> {
    let fetcher = build_fetcher(source, config)?;
    let factory: Arc<dyn ContextFactory> = if source.mute {
        Arc::new(null_context)
    } else {
        Arc::new(output_context)
    };

    AudioCueService::builder(fetcher)
        .catalog(config.cues.clone())
        .scroll(config.scroll.clone())
        .context_factory(factory)
        .build()
}

fn build_fetcher(
    source: &SourceArgs,
    config: &AppConfig,
) -> sound_cues_core::Result<Arc<dyn AssetFetcher>> {
    let base_url = source
        .base_url
        .clone()
        .or_else(|| config.assets.base_url.clone());
    // An explicit --assets-root beats a base URL from the config file.
    if let (Some(base_url), None) = (base_url, &source.assets_root) {
        return http_fetcher(&base_url);
    }

    let root = source
        .assets_root
        .clone()
        .or_else(|| config.assets.root.clone())
        .ok_or_else(|| SoundCueError::msg("no asset root or base url configured"))?;
    tracing::info!(root = %root.display(), "serving sounds from directory");
    Ok(Arc::new(FsFetcher::new(root)))
}

#[cfg(feature = "http")]
fn http_fetcher(base_url: &str) -> sound_cues_core::Result<Arc<dyn AssetFetcher>> {
    tracing::info!(base_url, "fetching sounds over http");
    Ok(Arc::new(sound_cues_core::HttpFetcher::new(base_url)?))
}

#[cfg(not(feature = "http"))]
fn http_fetcher(base_url: &str) -> sound_cues_core::Result<Arc<dyn AssetFetcher>> {
    Err(SoundCueError::msg(format!(
        "cannot fetch from `{base_url}`: built without the `http` feature"
    )))
}

fn null_context() -> sound_cues_core::Result<Arc<dyn AudioContext>> {
    Ok(Arc::new(NullContext::new()))
}

#[cfg(feature = "rodio")]
fn output_context() -> sound_cues_core::Result<Arc<dyn AudioContext>> {
    Ok(Arc::new(sound_cues_core::RodioContext::open()?))
}

#[cfg(not(feature = "rodio"))]
fn output_context() -> sound_cues_core::Result<Arc<dyn AudioContext>> {
    tracing::warn!("built without the `rodio` feature, cues will be silent");
    null_context()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Gesture-gated interface sound cues", long_about = None)]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Directory that site-relative asset paths resolve against.
    #[arg(long, global = true)]
    assets_root: Option<PathBuf>,
    /// Origin that site-relative asset paths resolve against.
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Decode and schedule cues without opening an output device.
    #[arg(long, global = true)]
    mute: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the configured cues.
    Catalog,
    /// Fetch and decode every cue, then report what was loaded.
    Preload,
    /// Play a single cue by name.
    Play {
        cue: String,
        /// Gain in [0, 1]. Defaults to the configured default volume.
        #[arg(short, long)]
        volume: Option<f32>,
    },
    /// Replay a sequence of scroll offsets through the scroll trigger.
    Scroll {
        #[arg(allow_negative_numbers = true)]
        offsets: Vec<f64>,
    },
}
