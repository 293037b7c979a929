#![deny(warnings)]

use anyhow::Context;
use clap::{Parser, ValueEnum};
use mood_mirror_core::camera::{CameraHub, WebcamSource};
use mood_mirror_core::classify::RemoteEmotionClassifier;
use mood_mirror_core::config::{
    resolve_api_key, resolve_string_with_default, ConfidenceThreshold, MirrorConfig,
    SampleInterval, StdEnv, WindowSize, DEFAULT_BIND_ADDR, DEFAULT_CLASSIFIER_URL,
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_SAMPLE_INTERVAL, DEFAULT_WINDOW_SIZE, ENV_CAMERA_INDEX,
    ENV_CLASSIFIER_URL, ENV_CONFIDENCE_THRESHOLD, ENV_OPENAI_API_KEY, ENV_SAMPLE_INTERVAL,
    ENV_WINDOW_SIZE,
};
use mood_mirror_core::display::run_window;
use mood_mirror_core::respond::{
    CannedJokes, FallbackJokeSource, JokeSource, OpenAiJokeClient, ResponseSelector,
    DEFAULT_JOKE_MODEL,
};
use mood_mirror_core::server::{serve, ServerState};
use mood_mirror_core::session::MirrorSession;
use std::net::SocketAddr;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// HTTP endpoints: /mood (JSON) and /video (MJPEG).
    Serve,
    /// Native window with the feed and mood overlay.
    Window,
}

#[derive(Parser, Debug)]
#[command(name = "mood-mirror")]
#[command(about = "Webcam mood mirror (classify -> smooth -> respond)")]
struct Args {
    #[arg(long, value_enum, default_value_t = Mode::Serve)]
    mode: Mode,

    #[arg(long, env = ENV_CAMERA_INDEX)]
    camera_index: Option<u32>,

    #[arg(long, env = ENV_SAMPLE_INTERVAL, default_value_t = DEFAULT_SAMPLE_INTERVAL)]
    sample_interval: u32,

    #[arg(long, env = ENV_WINDOW_SIZE, default_value_t = DEFAULT_WINDOW_SIZE)]
    window_size: usize,

    #[arg(long, env = ENV_CONFIDENCE_THRESHOLD, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    confidence_threshold: f32,

    #[arg(long)]
    classifier_url: Option<String>,

    #[arg(long)]
    openai_api_key: Option<String>,

    #[arg(long, default_value = DEFAULT_JOKE_MODEL)]
    joke_model: String,

    #[arg(long, default_value = DEFAULT_BIND_ADDR)]
    bind: String,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let mode = args.mode;
    let bind = args.bind.clone();
    let env = StdEnv;
    let cfg = build_config(args, &env)?;

    tracing::info!(
        sample_interval = cfg.sample_interval.get(),
        window_size = cfg.window_size.get(),
        confidence_threshold = cfg.confidence_threshold.get(),
        classifier_url = %cfg.classifier_url,
        "config loaded"
    );

    let camera_index = cfg.camera_index;
    let camera = CameraHub::spawn(move || WebcamSource::open(camera_index))
        .context("opening the camera")?;

    let classifier = RemoteEmotionClassifier::new(cfg.classifier_url.clone());

    let jokes: Box<dyn JokeSource> = match cfg.openai_api_key.as_ref() {
        Some(key) => Box::new(FallbackJokeSource::new(
            OpenAiJokeClient::new(key.expose().to_string()).with_model(cfg.joke_model.clone()),
            CannedJokes,
        )),
        None => {
            tracing::info!("no OpenAI key configured, using canned jokes");
            Box::new(CannedJokes)
        }
    };

    let (session, mood) = MirrorSession::new(
        camera.clone(),
        classifier,
        ResponseSelector::new(jokes),
        cfg.sample_interval.get(),
        cfg.window_size.get(),
        cfg.confidence_threshold.get(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(session.run(shutdown_rx));

    let outcome = match mode {
        Mode::Serve => {
            let addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("invalid --bind address: {bind}"))?;
            serve(
                addr,
                ServerState {
                    mood,
                    camera: camera.clone(),
                },
            )
            .await
            .map_err(anyhow::Error::from)
        }
        Mode::Window => run_window(camera.clone(), mood).map_err(anyhow::Error::from),
    };

    let _ = shutdown_tx.send(true);
    camera.stop();
    worker.await.context("orchestration loop panicked")?;

    outcome
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn build_config(args: Args, env: &impl mood_mirror_core::config::Env) -> anyhow::Result<MirrorConfig> {
    let sample_interval = SampleInterval::new(args.sample_interval)?;
    let window_size = WindowSize::new(args.window_size)?;
    let confidence_threshold = ConfidenceThreshold::new(args.confidence_threshold)?;

    let classifier_url = resolve_string_with_default(
        args.classifier_url,
        ENV_CLASSIFIER_URL,
        env,
        DEFAULT_CLASSIFIER_URL,
    );
    let openai_api_key = resolve_api_key(args.openai_api_key, ENV_OPENAI_API_KEY, env)?;

    Ok(MirrorConfig {
        camera_index: args.camera_index,
        sample_interval,
        window_size,
        confidence_threshold,
        classifier_url,
        openai_api_key,
        joke_model: args.joke_model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mood_mirror_core::config::MapEnv;

    fn args(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("mood-mirror").chain(argv.iter().copied()))
    }

    #[test]
    fn classifier_url_flag_takes_precedence() {
        let env = MapEnv::default().with_var(ENV_CLASSIFIER_URL, "http://sidecar:9000");
        let cfg = build_config(args(&["--classifier-url", "http://flag:1"]), &env)
            .expect("valid config");
        assert_eq!(cfg.classifier_url, "http://flag:1");
    }

    #[test]
    fn classifier_url_falls_back_to_env_then_default() {
        let env = MapEnv::default().with_var(ENV_CLASSIFIER_URL, "http://sidecar:9000");
        let cfg = build_config(args(&[]), &env).expect("valid config");
        assert_eq!(cfg.classifier_url, "http://sidecar:9000");

        let cfg = build_config(args(&[]), &MapEnv::default()).expect("valid config");
        assert_eq!(cfg.classifier_url, DEFAULT_CLASSIFIER_URL);
    }

    #[test]
    fn invalid_numeric_args_are_rejected() {
        assert!(build_config(args(&["--sample-interval", "0"]), &MapEnv::default()).is_err());
        assert!(
            build_config(args(&["--confidence-threshold", "1.5"]), &MapEnv::default()).is_err()
        );
    }
}
