use std::fmt;

use chrono::{DateTime, Utc};
use quest_core::model::{
    Badge, BadgeId, Game, GameId, LearningModule, ModuleId, Profile, Quiz, QuizId, UserBadge,
    UserId, builtin_questions,
};
use storage::repository::{Storage, StorageError};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    user_id: UserId,
    display_name: String,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidUser { raw: String },
    InvalidDbUrl { raw: String },
    InvalidDisplayName { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value (expected UUID): {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidDisplayName { raw } => {
                write!(f, "invalid --display-name value: {raw:?}")
            }
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

/// Stable ids so repeated seeding upserts the same catalog rows.
fn seed_uuid(n: u128) -> Uuid {
    Uuid::from_u128(0x5eed_0000_0000_4000_8000_0000_0000_0000 | n)
}

const DEMO_USER: u128 = 0x0001;

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUEST_DB_URL").unwrap_or_else(|_| "sqlite://quest.sqlite3?mode=rwc".into());
        let mut user_id = std::env::var("QUEST_SEED_USER")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .unwrap_or_else(|| UserId::new(seed_uuid(DEMO_USER)));
        let mut display_name = "Demo Citizen".to_owned();
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    user_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidUser { raw: value.clone() })?;
                }
                "--display-name" => {
                    let value = require_value(&mut args, "--display-name")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDisplayName { raw: value });
                    }
                    display_name = value;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user_id,
            display_name,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://quest.sqlite3?mode=rwc)");
    eprintln!("  --user <uuid>             Demo profile user id");
    eprintln!("  --display-name <name>     Demo profile display name (default: Demo Citizen)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUEST_DB_URL, QUEST_SEED_USER");
}

fn sample_modules() -> Vec<LearningModule> {
    let rows = [
        (
            "Preamble and Basic Structure",
            "The Preamble sets out the ideals of justice, liberty, equality and fraternity.",
            10,
        ),
        (
            "Fundamental Rights",
            "Part III guarantees six fundamental rights enforceable by the courts.",
            15,
        ),
        (
            "Directive Principles",
            "Part IV lists the principles the State should apply in making laws.",
            10,
        ),
        (
            "Fundamental Duties",
            "Article 51A lists the duties every citizen owes the nation.",
            8,
        ),
        (
            "Union and State Government",
            "The Constitution divides power between the Union and the States.",
            12,
        ),
    ];
    rows.iter()
        .zip(1_u128..)
        .map(|((title, content, reward), n)| {
            let order = i32::try_from(n).unwrap_or(i32::MAX);
            LearningModule::new(
                ModuleId::new(seed_uuid(0x0100 + n)),
                *title,
                *content,
                *reward,
                order,
            )
        })
        .collect()
}

fn sample_quizzes(modules: &[LearningModule]) -> Vec<Quiz> {
    let rows = [
        ("Constitutional Basics", "Test your knowledge of the basics.", 10, 0),
        ("Fundamental Rights", "How well do you know your rights?", 15, 1),
        ("Government Structure", "The organs of government and their powers.", 12, 4),
    ];
    rows.iter()
        .zip(1_u128..)
        .map(|((title, description, reward, module_idx), n)| {
            let quiz = Quiz::new(QuizId::new(seed_uuid(0x0200 + n)), *title, builtin_questions())
                .with_description(*description)
                .with_points_reward(*reward);
            match modules.get(*module_idx) {
                Some(module) => quiz.for_module(module.id),
                None => quiz,
            }
        })
        .collect()
}

fn sample_games() -> Vec<Game> {
    let rows = [
        ("Constitution Trivia", "trivia", 5, "Rapid-fire questions against the clock."),
        ("Rights Matching", "matching", 4, "Match each right to its article."),
        ("Timeline Builder", "timeline", 6, "Order the milestones of the Constitution."),
    ];
    rows.iter()
        .zip(1_u128..)
        .map(|((name, kind, reward, description), n)| {
            Game::new(GameId::new(seed_uuid(0x0300 + n)), *name, *kind, *reward)
                .with_description(*description)
        })
        .collect()
}

fn sample_badges() -> Vec<Badge> {
    let rows = [
        ("First Steps", "Started your first module.", None),
        ("Rights Defender", "Earned 50 points.", Some(50)),
        ("Constitution Scholar", "Earned 200 points.", Some(200)),
    ];
    rows.iter()
        .zip(1_u128..)
        .map(|((name, description, points), n)| {
            let badge = Badge::new(BadgeId::new(seed_uuid(0x0400 + n)), *name)
                .with_description(*description);
            match points {
                Some(points) => badge.with_points_required(*points),
                None => badge,
            }
        })
        .collect()
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let modules = sample_modules();
    for module in &modules {
        storage.modules.upsert_module(module).await?;
    }
    let quizzes = sample_quizzes(&modules);
    for quiz in &quizzes {
        storage.quizzes.upsert_quiz(quiz).await?;
    }
    let games = sample_games();
    for game in &games {
        storage.games.upsert_game(game).await?;
    }
    let badges = sample_badges();
    for badge in &badges {
        storage.badges.upsert_badge(badge).await?;
    }

    let profile = Profile::new(args.user_id, Some(args.display_name.clone()), now);
    match storage.profiles.insert_profile(&profile).await {
        Ok(()) => tracing::info!(user = %args.user_id, "created demo profile"),
        Err(StorageError::Conflict) => {
            tracing::info!(user = %args.user_id, "demo profile already present");
        }
        Err(err) => return Err(err.into()),
    }

    if let Some(first) = badges.first() {
        let grant = UserBadge {
            user_id: args.user_id,
            badge_id: first.id,
            earned_at: now,
        };
        storage.badges.grant_badge(&grant).await?;
    }

    println!(
        "Seeded {} modules, {} quizzes, {} games and {} badges for user {} into {}",
        modules.len(),
        quizzes.len(),
        games.len(),
        badges.len(),
        args.user_id,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
