use anyhow::Result;
use clap::Parser;
use formcoach::{
    overlay_color, renderable_edges, AnalysisLoop, ExerciseType, FixedPoseEstimator,
    FormcoachConfig, FrameSource, InMemorySessionStore, PostureRuleEngine, SessionStore,
    SessionSummary, SyntheticDevice,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "formcoach")]
#[command(about = "Real-time exercise form analysis with posture feedback")]
#[command(version)]
#[command(long_about = "Analyzes body posture against per-exercise geometric rules and \
streams live coaching feedback. Runs against a synthetic camera and pose backend; real \
device and model backends plug in through the capture and estimator traits.")]
struct Args {
    /// Exercise to coach (e.g. squat, pushup, yogaWarrior)
    #[arg(short, long, default_value = "squat", help = "Exercise type to analyze")]
    exercise: ExerciseType,

    /// Session duration in seconds
    #[arg(short = 't', long, default_value_t = 10, help = "Session duration in seconds")]
    duration: u64,

    /// Path to configuration file
    #[arg(short, long, default_value = "formcoach.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// List supported exercises and exit
    #[arg(long, help = "List supported exercises with coaching notes and exit")]
    list_exercises: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting a session")]
    validate_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_exercises {
        list_exercises();
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting formcoach v{}", env!("CARGO_PKG_VERSION"));

    let config = match FormcoachConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }
    config.validate()?;

    run_session(&args, config).await
}

async fn run_session(args: &Args, config: FormcoachConfig) -> Result<()> {
    let device = Arc::new(
        SyntheticDevice::new()
            .with_resolution(config.camera.resolution.0, config.camera.resolution.1)
            .with_fps(config.camera.fps),
    );
    let source = Arc::new(FrameSource::new(device, config.camera.clone()));
    let engine = PostureRuleEngine::new(config.rules.clone(), config.analysis.min_pose_score);
    let analysis = AnalysisLoop::new(
        source,
        Arc::new(FixedPoseEstimator::new()),
        engine,
        config.analysis.clone(),
    );

    let store = InMemorySessionStore::new();
    store.init().await?;

    println!(
        "Coaching {} for {}s ({})",
        args.exercise,
        args.duration,
        args.exercise.info().description
    );

    let started = Instant::now();
    if let Err(e) = analysis.start(args.exercise).await {
        // The published state carries the user-facing message
        let state = analysis.current_state();
        eprintln!("{}", state.feedback.as_deref().unwrap_or("Camera unavailable"));
        return Err(e.into());
    }

    let mut updates = analysis.subscribe();
    let deadline = tokio::time::sleep(Duration::from_secs(args.duration));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, ending session early");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let update = updates.borrow_and_update().clone();
                let edges = update.pose.as_ref().map(|p| renderable_edges(p).len()).unwrap_or(0);
                println!(
                    "[score {:3}] {} (skeleton {} edges, {})",
                    update.state.score,
                    update.state.feedback.as_deref().unwrap_or("-"),
                    edges,
                    overlay_color(update.state.feedback_type),
                );
            }
        }
    }

    let final_score = analysis.current_state().score;
    analysis.stop().await;

    let summary = SessionSummary::new(args.exercise, started.elapsed().as_secs(), final_score);
    info!(session_id = %summary.id, "recording session summary");
    store.record(summary.clone()).await?;

    println!(
        "\nSession complete: {} for {}s, final score {}",
        summary.exercise_type, summary.duration_seconds, summary.final_score
    );
    Ok(())
}

fn list_exercises() {
    for exercise in ExerciseType::ALL {
        let info = exercise.info();
        let arg = serde_json::to_string(&exercise).unwrap_or_default();
        println!("{:<14} {}", arg.trim_matches('"'), info.description);
        println!("{:<14} targets: {}", "", info.target_muscles.join(", "));
        println!("{:<14} tip: {}", "", info.tips.first().unwrap_or(&""));
    }
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("formcoach={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer().with_target(true).boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}
