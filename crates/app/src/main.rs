use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(not(feature = "audio"))]
use services::LogCuePlayer;
use services::{AppServices, Clock, CuePlayer, DirectoryCamera, LiveEvent, QuizServiceError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use visor_core::model::{AdvanceOutcome, Frame, NoticeLevel, SessionState, TrainerSettingsDraft};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    MissingFrames,
    NoImages,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::MissingFrames => write!(f, "live requires --frames <dir>"),
            ArgsError::NoImages => write!(f, "quiz requires at least one png/jpg image"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(raw: String, flag: &'static str) -> Result<T, ArgsError> {
    raw.parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  visor quiz [options] <image>...   # answer the detected marking for each image");
    eprintln!("  visor live [options] --frames <dir>");
    eprintln!("  visor dictionary [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --model <path>        detection model (default assets/visorai.json)");
    eprintln!("  --assets <dir>        audio cue directory (default assets)");
    eprintln!("  --captures <dir>      live screenshot directory (default screenshots)");
    eprintln!("  --vocabulary <path>   JSON map of class name to audio cue");
    eprintln!("  --threshold <0..1>    minimum confidence, exclusive (default 0.3)");
    eprintln!("  --max-uploads <n>     images per quiz (default 25)");
    eprintln!("  --interval-ms <n>     delay between live frames (default 100)");
    eprintln!("  --shuffle             shuffle quiz images");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  VISOR_MODEL_PATH, VISOR_ASSETS_DIR, VISOR_CAPTURE_DIR, VISOR_VOCABULARY, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Quiz,
    Live,
    Dictionary,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "quiz" => Some(Self::Quiz),
            "live" => Some(Self::Live),
            "dictionary" => Some(Self::Dictionary),
            _ => None,
        }
    }
}

struct Args {
    settings: TrainerSettingsDraft,
    images: Vec<PathBuf>,
    frames_dir: Option<PathBuf>,
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut settings = TrainerSettingsDraft {
            model_path: env_path("VISOR_MODEL_PATH"),
            assets_dir: env_path("VISOR_ASSETS_DIR"),
            capture_dir: env_path("VISOR_CAPTURE_DIR"),
            vocabulary_path: env_path("VISOR_VOCABULARY"),
            ..TrainerSettingsDraft::default()
        };
        let mut images = Vec::new();
        let mut frames_dir = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--model" => settings.model_path = Some(require_value(args, "--model")?.into()),
                "--assets" => settings.assets_dir = Some(require_value(args, "--assets")?.into()),
                "--captures" => {
                    settings.capture_dir = Some(require_value(args, "--captures")?.into());
                }
                "--vocabulary" => {
                    settings.vocabulary_path = Some(require_value(args, "--vocabulary")?.into());
                }
                "--threshold" => {
                    let raw = require_value(args, "--threshold")?;
                    settings.confidence_threshold = Some(parse_number(raw, "--threshold")?);
                }
                "--max-uploads" => {
                    let raw = require_value(args, "--max-uploads")?;
                    settings.max_uploads = Some(parse_number(raw, "--max-uploads")?);
                }
                "--interval-ms" => {
                    let raw = require_value(args, "--interval-ms")?;
                    settings.capture_interval_ms = Some(parse_number(raw, "--interval-ms")?);
                }
                "--shuffle" => settings.shuffle_uploads = Some(true),
                "--frames" => frames_dir = Some(require_value(args, "--frames")?.into()),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => images.push(PathBuf::from(arg)),
            }
        }

        Ok(Self {
            settings,
            images,
            frames_dir,
        })
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "audio")]
fn cue_player() -> Arc<dyn CuePlayer> {
    Arc::new(services::SpeakerCuePlayer)
}

#[cfg(not(feature = "audio"))]
fn cue_player() -> Arc<dyn CuePlayer> {
    Arc::new(LogCuePlayer)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            ArgsError::UnknownArg(first.clone())
        })?,
    };

    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let settings = parsed.settings.validate()?;

    // The model is required before any session starts.
    let services = AppServices::from_settings(&settings, Clock::system(), cue_player()).await?;

    match cmd {
        Command::Dictionary => {
            for name in services.quiz().dictionary() {
                println!("{name}");
            }
            Ok(())
        }
        Command::Quiz => run_quiz(&services, &parsed.images).await,
        Command::Live => {
            let dir = parsed.frames_dir.ok_or(ArgsError::MissingFrames)?;
            run_live(&services, &dir).await
        }
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

fn is_upload(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
}

async fn read_upload(path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(path).await?;
    let decoded = image::load_from_memory(&bytes)?;
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Frame::from_dynamic(decoded).with_source(source))
}

fn print_notices(state: &mut SessionState) {
    for notice in state.take_notices() {
        let level = match notice.level {
            NoticeLevel::Info => "note",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        eprintln!("{level}: {}", notice.message);
    }
}

async fn run_quiz(
    services: &AppServices,
    paths: &[PathBuf],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut frames = Vec::new();
    for path in paths.iter().filter(|path| is_upload(path)) {
        frames.push(read_upload(path).await?);
    }
    if frames.is_empty() {
        return Err(ArgsError::NoImages.into());
    }

    let quiz = services.quiz();
    let mut state = services.new_session();
    quiz.upload(&mut state, frames);
    print_notices(&mut state);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let progress = quiz.progress(&state);
        let source = state
            .quiz()
            .current_item()
            .and_then(|item| item.image().source())
            .unwrap_or("image")
            .to_string();
        println!("Image {} of {} ({source})", progress.position, progress.total);

        let detected = loop {
            let attempt = quiz.detect(&mut state).await;
            print_notices(&mut state);
            match attempt {
                Ok(detected) => break detected,
                Err(QuizServiceError::Detection(err)) => {
                    tracing::debug!(error = %err, "waiting for retry");
                    println!("Detection failed. Press Enter to retry, or q to stop.");
                    match lines.next_line().await? {
                        Some(line) if line.trim() != "q" => continue,
                        _ => {
                            println!("Score so far: {}", state.quiz().summary());
                            return Ok(());
                        }
                    }
                }
                Err(err) => return Err(err.into()),
            }
        };
        println!(
            "{} road marking(s) detected. Name it (? lists valid names):",
            detected.detections.len()
        );

        let answer = loop {
            let Some(line) = lines.next_line().await? else {
                println!("Score so far: {}", state.quiz().summary());
                return Ok(());
            };
            if line.trim() == "?" {
                println!("{}", quiz.dictionary().join(", "));
                continue;
            }
            break line;
        };

        let result = quiz.submit(&mut state, &answer)?;
        if result.correct {
            println!("Correct! Score: {}", result.score);
        } else {
            println!("Incorrect. The correct answer is: {}", result.expected);
        }

        if let AdvanceOutcome::Completed(summary) = quiz.advance(&mut state)? {
            println!("Quiz complete! Final score: {summary}");
            return Ok(());
        }
    }
}

//
// ─── LIVE ──────────────────────────────────────────────────────────────────────
//

async fn run_live(services: &AppServices, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let camera = DirectoryCamera::open(dir).await?;
    let session = Arc::new(tokio::sync::Mutex::new(services.new_session()));
    let mut handle = services.live().spawn(camera, Arc::clone(&session));
    let vocabulary = services.vocabulary();

    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(LiveEvent::FrameProcessed(report)) => {
                    if let Some(capture) = report.capture {
                        println!("{} -> {}", capture.class_name, capture.artifact);
                        println!("  {}", vocabulary.definition(&capture.class_name));
                    } else if let Some(class_name) = report.new_class {
                        println!("{class_name} (not saved)");
                        println!("  {}", vocabulary.definition(&class_name));
                    }
                }
                Some(LiveEvent::Stopped(reason)) => {
                    tracing::debug!(?reason, "live loop finished");
                    break;
                }
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal?;
                handle.stop();
            }
        }
    }

    let reason = handle.join().await?;
    let mut state = session.lock().await;
    print_notices(&mut state);
    println!(
        "Stopped ({reason:?}): {} frame(s), {} capture(s).",
        state.live().frames_processed(),
        state.live().captures().len()
    );

    // Latest first.
    for capture in state.live().captures().iter().rev() {
        println!(
            "{} [{}] {}",
            capture.class_name,
            capture.captured_at.format("%H:%M:%S"),
            capture.artifact
        );
        println!("  Definition: {}", vocabulary.definition(&capture.class_name));
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
