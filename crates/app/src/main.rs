//! Terminal front end for the exam-prep services.

mod quiz;
mod seed;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand};
use exam_core::model::{ExamId, MissionId, QuestionDraft, Role, Student, Subject};
use services::ai::{DEFAULT_TIMEOUT_SECS, parse_extracted_exam};
use services::content_service::DEFAULT_IMPORT_REWARD;
use services::{ASSISTANT_FALLBACK, AiConfig, AppConfig, AppServices, Clock, ImportedExamSpec, SessionService};
use tracing_subscriber::EnvFilter;

/// Exam preparation: practice sessions, simulated exams and missions.
#[derive(Parser, Debug)]
#[command(name = "exam")]
#[command(version, about, long_about = None)]
struct Args {
    /// SQLite database URL or path
    #[arg(long, env = "EXAM_DB_URL", default_value = "sqlite://exam.sqlite3")]
    db: String,

    /// Sign in as this e-mail
    #[arg(long, env = "EXAM_EMAIL")]
    email: Option<String>,

    /// Display name used on first sign-in
    #[arg(long, default_value = "")]
    name: String,

    /// Teacher e-mail allowed into administrative commands
    #[arg(long, env = "EXAM_ADMIN_EMAIL")]
    admin_email: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a demo question bank, exam and mission
    Seed,
    /// Practice a random sample of the bank
    Practice {
        /// Restrict to one subject
        #[arg(long)]
        subject: Option<Subject>,
    },
    /// Take a simulated exam
    Exam { id: u64 },
    /// Run a mission
    Mission { id: u64 },
    /// Show the student leaderboard
    Ranking,
    /// Allow an e-mail to register as a student
    Whitelist { email: String },
    /// Import extracted exam material (JSON as produced by extraction, or plain text)
    Import {
        file: PathBuf,
        /// Source document name recorded on each question
        #[arg(long, default_value = "")]
        source: String,
        /// Also publish the imported questions as an exam with this title
        #[arg(long)]
        exam_title: Option<String>,
        #[arg(long, default_value_t = DEFAULT_IMPORT_REWARD)]
        reward: u32,
    },
    /// Generate new questions from study material
    Generate { file: PathBuf },
    /// Narrate a mission summary and store the audio
    NarrateMission { id: u64 },
    /// Ask the exam assistant about dates, notices or campuses
    Ask {
        query: String,
        /// Also narrate the answer into an MP3 file
        #[arg(long)]
        speak: bool,
        #[arg(long, default_value = "answer.mp3")]
        audio_out: PathBuf,
    },
    /// List unread notifications
    Notifications {
        /// Mark every listed notification as read
        #[arg(long)]
        mark_read: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let db_url = normalize_sqlite_url(&args.db);
    prepare_sqlite_file(&db_url)?;

    let ai = AiConfig::from_env();
    let explain_wait = ai
        .as_ref()
        .map_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS), |c| c.timeout);
    let config = AppConfig {
        admin_email: args.admin_email.clone(),
        ai,
    };
    let services = AppServices::new_sqlite(&db_url, Clock::default(), config)
        .await
        .with_context(|| format!("opening {db_url}"))?;
    tracing::debug!(%db_url, ai = services.ai().enabled(), "services ready");

    match args.command {
        Command::Seed => {
            let report = seed::demo(&services).await?;
            if report.questions == 0 {
                println!("Database already has questions; nothing seeded.");
            } else {
                println!(
                    "Seeded {} questions, exam {:?} and mission {:?}. Demo student: {}",
                    report.questions,
                    report.exam_title.unwrap_or_default(),
                    report.mission_title.unwrap_or_default(),
                    seed::DEMO_STUDENT
                );
            }
        }
        Command::Practice { subject } => {
            let student = sign_in(&services, args.email.as_deref(), &args.name).await?;
            let loop_svc = services.session_loop();
            let session = match subject {
                Some(subject) => loop_svc.start_subject_practice(subject).await?,
                None => loop_svc.start_daily_practice().await?,
            };
            play(&services, session, &student, explain_wait).await?;
        }
        Command::Exam { id } => {
            let student = sign_in(&services, args.email.as_deref(), &args.name).await?;
            let session = services.session_loop().start_exam(ExamId::new(id)).await?;
            if let Some(exam) = session.exam() {
                println!(
                    "{} ({} min, +{} pts)",
                    exam.title(),
                    exam.duration_minutes(),
                    exam.reward_points()
                );
            }
            play(&services, session, &student, explain_wait).await?;
        }
        Command::Mission { id } => {
            let student = sign_in(&services, args.email.as_deref(), &args.name).await?;
            let session = services
                .session_loop()
                .start_mission(MissionId::new(id))
                .await?;
            if let Some(summary) = session.mission().and_then(|m| m.summary()) {
                println!("{}", summary.text);
            }
            play(&services, session, &student, explain_wait).await?;
        }
        Command::Ranking => {
            for entry in services.ranking().leaderboard().await? {
                println!(
                    "{:>3}. {:<24} {:>8} pts  streak {:>3}  {:>3}%",
                    entry.position, entry.name, entry.points, entry.streak, entry.accuracy_percent
                );
            }
        }
        Command::Whitelist { email } => {
            require_teacher(&services, args.email.as_deref()).await?;
            let added = services.access().whitelist(&email).await?;
            println!("Whitelisted {added}");
        }
        Command::Import {
            file,
            source,
            exam_title,
            reward,
        } => {
            require_teacher(&services, args.email.as_deref()).await?;
            let raw = read_material(&file)?;
            let extracted = if file.extension().is_some_and(|ext| ext == "json") {
                parse_extracted_exam(&raw)?
            } else {
                services.ai().extract_exam(&raw).await?
            };
            let source = if source.trim().is_empty() {
                file.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default()
            } else {
                source
            };
            let spec = exam_title.map(|title| ImportedExamSpec {
                title,
                reward_points: reward,
            });
            let report = services
                .content()
                .import_extracted(extracted, &source, spec)
                .await?;
            println!(
                "Imported {} questions ({} rejected) and {} texts.",
                report.questions.len(),
                report.rejected.len(),
                report.text_ids.len()
            );
            for (index, err) in &report.rejected {
                println!("  question #{}: {err}", index + 1);
            }
            if let Some(exam) = report.exam {
                println!("Published exam {} (id {}).", exam.title(), exam.id());
            }
        }
        Command::Generate { file } => {
            require_teacher(&services, args.email.as_deref()).await?;
            let raw = read_material(&file)?;
            let generated = services.ai().generate_questions(&raw).await?;
            let source = file.file_name().map(|name| name.to_string_lossy().into_owned());
            let content = services.content();
            for question in generated {
                let draft: QuestionDraft = question.into_draft(source.as_deref(), None);
                match content.add_question(draft).await {
                    Ok(stored) => println!("{:>5}  {}", stored.id(), stored.prompt()),
                    Err(err) => tracing::warn!(error = %err, "skipping generated question"),
                }
            }
        }
        Command::NarrateMission { id } => {
            require_teacher(&services, args.email.as_deref()).await?;
            let mission = services
                .content()
                .narrate_mission(MissionId::new(id), &services.ai())
                .await?;
            println!("Narration stored for mission {}.", mission.title());
        }
        Command::Ask {
            query,
            speak,
            audio_out,
        } => {
            let ai = services.ai();
            let answer = ai.ask_or_fallback(&query).await;
            println!("{answer}");
            if speak && answer != ASSISTANT_FALLBACK {
                let audio = ai.narrate(&answer).await?;
                let bytes = STANDARD
                    .decode(audio)
                    .context("decoding narrated audio")?;
                std::fs::write(&audio_out, bytes)
                    .with_context(|| format!("writing {}", audio_out.display()))?;
                println!("Audio saved to {}.", audio_out.display());
            }
        }
        Command::Notifications { mark_read } => {
            let content = services.content();
            for notification in content.unread_notifications().await? {
                println!(
                    "{}  {}",
                    notification.created_at().format("%Y-%m-%d %H:%M"),
                    notification.message()
                );
                if mark_read {
                    content.mark_notification_read(notification.id()).await?;
                }
            }
        }
    }
    Ok(())
}

async fn play(
    services: &AppServices,
    mut session: SessionService,
    student: &Student,
    explain_wait: Duration,
) -> anyhow::Result<()> {
    let mut input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut out = io::stdout();
    quiz::run(&mut session, &mut input, &mut out, explain_wait).await?;

    let completed = services
        .session_loop()
        .complete(&mut session, student.id())
        .await?;
    let (correct, answered, earned, bonus) = completed.outcome.as_tuple();
    println!("\n{correct}/{answered} correct, {earned} pts earned, {bonus} bonus.");
    println!(
        "Total {} pts, streak {}.",
        completed.student.stats().points,
        completed.student.stats().streak
    );
    Ok(())
}

async fn sign_in(
    services: &AppServices,
    email: Option<&str>,
    name: &str,
) -> anyhow::Result<Student> {
    let Some(email) = email else {
        bail!("pass --email (or set EXAM_EMAIL) to sign in");
    };
    Ok(services.access().sign_in(email, name).await?)
}

async fn require_teacher(services: &AppServices, email: Option<&str>) -> anyhow::Result<()> {
    let user = sign_in(services, email, "").await?;
    if user.role() != Role::Teacher {
        bail!("{} is not a teacher account", user.email());
    }
    Ok(())
}

fn read_material(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid database URL: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid database URL: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}
