use std::fmt;
use std::path::PathBuf;

use drill_core::model::PracticeMode;
use services::{AppServices, AppServicesConfig, PronunciationConfig};
use tracing_subscriber::{EnvFilter, fmt as log_fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { what: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidMode { raw: String },
    InvalidLimit { raw: String },
    InvalidDbUrl { raw: String },
    ConflictingIdentity,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { what } => write!(f, "missing {what}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidMode { raw } => {
                write!(f, "invalid --mode value: {raw} (expected new or wrong)")
            }
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::ConflictingIdentity => write!(f, "use either --guest or --user, not both"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  vocab practice    [--guest | --user <name>] [--mode new|wrong]");
    eprintln!("  vocab register    <name>");
    eprintln!("  vocab stats       --user <name>");
    eprintln!("  vocab leaderboard");
    eprintln!("  vocab history     --user <name> [--limit <n>]");
    eprintln!("  vocab import      <csv> --user <admin>");
    eprintln!("  vocab grant-admin <name>");
    eprintln!();
    eprintln!("Every command also accepts --db <sqlite_url> and --words <csv>.");
    eprintln!("Passwords are read from stdin. While practicing, type :hint or :quit.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  VOCAB_DB_URL, VOCAB_WORDS_PATH, VOCAB_TTS_URL, VOCAB_AUDIO_DIR, RUST_LOG");
}

/// Who is practicing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Identity {
    Guest,
    User(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Practice { identity: Identity, mode: PracticeMode },
    Register { name: String },
    Stats { user: String },
    Leaderboard,
    History { user: String, limit: u32 },
    Import { csv: PathBuf, admin: String },
    GrantAdmin { name: String },
}

/// Options shared by every subcommand.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub db_url: String,
    pub words_path: PathBuf,
    pub tts_url: Option<String>,
    pub audio_dir: Option<PathBuf>,
}

impl Settings {
    fn from_env() -> Self {
        let db_url = std::env::var("VOCAB_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://vocab.sqlite3".into(), normalize_sqlite_url);
        let words_path = std::env::var("VOCAB_WORDS_PATH")
            .map_or_else(|_| PathBuf::from("words.csv"), PathBuf::from);
        let tts_url = std::env::var("VOCAB_TTS_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let audio_dir = std::env::var("VOCAB_AUDIO_DIR").ok().map(PathBuf::from);
        Self {
            db_url,
            words_path,
            tts_url,
            audio_dir,
        }
    }

    fn services_config(&self) -> AppServicesConfig {
        let config = AppServicesConfig::new(self.db_url.clone(), self.words_path.clone());
        match &self.tts_url {
            Some(url) => config.with_pronunciation(PronunciationConfig::new(url.clone())),
            None => config,
        }
    }
}

struct Args {
    settings: Settings,
    command: Command,
}

impl Args {
    fn parse(argv: Vec<String>) -> Result<Self, ArgsError> {
        let mut settings = Settings::from_env();
        let mut iter = argv.into_iter();
        let Some(cmd) = iter.next() else {
            return Err(ArgsError::MissingArgument { what: "subcommand" });
        };

        let mut positional: Vec<String> = Vec::new();
        let mut user: Option<String> = None;
        let mut guest = false;
        let mut mode = PracticeMode::NewWords;
        let mut limit: u32 = 20;

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut iter, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    settings.db_url = normalize_sqlite_url(value);
                }
                "--words" => settings.words_path = require_value(&mut iter, "--words")?.into(),
                "--user" => user = Some(require_value(&mut iter, "--user")?),
                "--guest" => guest = true,
                "--mode" => {
                    let value = require_value(&mut iter, "--mode")?;
                    mode = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidMode { raw: value.clone() })?;
                }
                "--limit" => {
                    let value = require_value(&mut iter, "--limit")?;
                    limit = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                }
                other if other.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let command = match cmd.as_str() {
            "practice" => {
                let identity = match (guest, user) {
                    (true, Some(_)) => return Err(ArgsError::ConflictingIdentity),
                    (_, Some(name)) => Identity::User(name),
                    (_, None) => Identity::Guest,
                };
                Command::Practice { identity, mode }
            }
            "register" => Command::Register {
                name: positional
                    .next()
                    .ok_or(ArgsError::MissingArgument { what: "<name>" })?,
            },
            "stats" => Command::Stats {
                user: user.ok_or(ArgsError::MissingValue { flag: "--user" })?,
            },
            "leaderboard" => Command::Leaderboard,
            "history" => Command::History {
                user: user.ok_or(ArgsError::MissingValue { flag: "--user" })?,
                limit,
            },
            "import" => Command::Import {
                csv: positional
                    .next()
                    .ok_or(ArgsError::MissingArgument { what: "<csv>" })?
                    .into(),
                admin: user.ok_or(ArgsError::MissingValue { flag: "--user" })?,
            },
            "grant-admin" => Command::GrantAdmin {
                name: positional
                    .next()
                    .ok_or(ArgsError::MissingArgument { what: "<name>" })?,
            },
            _ => return Err(ArgsError::UnknownCommand(cmd)),
        };
        if let Some(extra) = positional.next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Self { settings, command })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
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

/// Logs go to stderr so they never interleave with prompts on stdout.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(log_fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if matches!(argv.first().map(String::as_str), None | Some("--help" | "-h" | "help")) {
        print_usage();
        return Ok(());
    }

    let args = Args::parse(argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite here so the library crates never touch the filesystem layout.
    prepare_sqlite_file(&args.settings.db_url)?;
    let app = AppServices::new_sqlite(&args.settings.services_config()).await?;
    tracing::debug!(db = %args.settings.db_url, words = %args.settings.words_path.display(), "services ready");

    commands::dispatch(&app, &args.settings, args.command).await
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    init_logging();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, ArgsError> {
        Args::parse(args.iter().map(|s| (*s).to_string()).collect()).map(|a| a.command)
    }

    #[test]
    fn practice_defaults_to_guest_new_words() {
        assert_eq!(
            parse(&["practice"]).unwrap(),
            Command::Practice {
                identity: Identity::Guest,
                mode: PracticeMode::NewWords,
            }
        );
    }

    #[test]
    fn practice_accepts_user_and_mode() {
        assert_eq!(
            parse(&["practice", "--user", "anna", "--mode", "wrong"]).unwrap(),
            Command::Practice {
                identity: Identity::User("anna".into()),
                mode: PracticeMode::WrongWords,
            }
        );
        assert!(matches!(
            parse(&["practice", "--guest", "--user", "anna"]),
            Err(ArgsError::ConflictingIdentity)
        ));
        assert!(matches!(
            parse(&["practice", "--mode", "old"]),
            Err(ArgsError::InvalidMode { .. })
        ));
    }

    #[test]
    fn import_needs_file_and_admin() {
        assert_eq!(
            parse(&["import", "batch.csv", "--user", "root"]).unwrap(),
            Command::Import {
                csv: PathBuf::from("batch.csv"),
                admin: "root".into(),
            }
        );
        assert!(matches!(
            parse(&["import", "--user", "root"]),
            Err(ArgsError::MissingArgument { .. })
        ));
    }

    #[test]
    fn rejects_unknown_input() {
        assert!(matches!(parse(&["dance"]), Err(ArgsError::UnknownCommand(_))));
        assert!(matches!(
            parse(&["leaderboard", "--fast"]),
            Err(ArgsError::UnknownArg(_))
        ));
        assert!(matches!(
            parse(&["register", "anna", "bob"]),
            Err(ArgsError::UnknownArg(_))
        ));
    }

    #[test]
    fn sqlite_urls_become_absolute() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/v.sqlite3".into()),
            "sqlite:///tmp/v.sqlite3"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:/tmp/v.sqlite3".into()),
            "sqlite:///tmp/v.sqlite3"
        );
    }
}
