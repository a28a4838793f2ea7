use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use drill_core::model::{PracticeMode, User, UserId, UserRole};
use services::{AppServices, PracticeSession, SessionError, SessionState, SubmitOutcome};

use crate::{Command, Identity, Settings};

#[derive(Debug)]
enum CliError {
    InvalidCredentials,
    PasswordRequired,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::InvalidCredentials => write!(f, "invalid username or password"),
            CliError::PasswordRequired => write!(f, "a password is required on stdin"),
        }
    }
}

impl std::error::Error for CliError {}

type CliResult = Result<(), Box<dyn std::error::Error>>;

pub(crate) async fn dispatch(app: &AppServices, settings: &Settings, command: Command) -> CliResult {
    match command {
        Command::Practice { identity, mode } => {
            let user = match identity {
                Identity::Guest => app.credentials().guest(),
                Identity::User(name) => sign_in(app, &name).await?,
            };
            practice(app, settings, &user, mode).await
        }
        Command::Register { name } => {
            let password = ask("Password: ")?.ok_or(CliError::PasswordRequired)?;
            let confirm = ask("Confirm password: ")?.unwrap_or_default();
            let user = app.credentials().register(&name, &password, &confirm).await?;
            println!("Registered {}.", user.id());
            Ok(())
        }
        Command::Stats { user } => {
            let id: UserId = user.parse()?;
            let stats = app.reporting().stats(&id).await;
            println!("Words in list:   {}", stats.total_words);
            println!("Words practiced: {}", stats.completed);
            println!("Perfect words:   {}", stats.perfect);
            println!("Rating:          {} ({})", stats.rating, stats.rating.tier());
            Ok(())
        }
        Command::Leaderboard => {
            let board = app.reporting().leaderboard().await;
            if board.is_empty() {
                println!("No learners yet.");
            }
            for entry in board {
                println!(
                    "{:>2}. {:<20} {:>4} words {:>4} perfect  {:>6}  {}",
                    entry.rank,
                    entry.user.as_str(),
                    entry.words_practiced,
                    entry.perfect,
                    entry.rating.to_string(),
                    entry.rating.tier()
                );
            }
            Ok(())
        }
        Command::History { user, limit } => {
            let id: UserId = user.parse()?;
            let items = app.reporting().history(&id, limit).await;
            if items.is_empty() {
                println!("No sessions recorded for {id}.");
            }
            for item in items {
                println!(
                    "{}  {:<5} {:<9} attempted {:>3} correct {:>3} perfect {:>3}  rating {:.1}%",
                    item.recorded_at.format("%Y-%m-%d %H:%M"),
                    item.mode.as_str(),
                    item.end.as_str(),
                    item.words_attempted,
                    item.words_correct,
                    item.perfect_words,
                    item.rating
                );
            }
            Ok(())
        }
        Command::Import { csv, admin } => {
            let actor = sign_in(app, &admin).await?;
            let report = app.catalog().append_from_path(&actor, &csv)?;
            println!(
                "Added {} new words from {} ({} total).",
                report.added,
                csv.display(),
                report.total
            );
            Ok(())
        }
        Command::GrantAdmin { name } => {
            app.credentials().set_role(&name, UserRole::Admin).await?;
            println!("{name} can now edit the word list.");
            Ok(())
        }
    }
}

async fn sign_in(app: &AppServices, name: &str) -> Result<User, Box<dyn std::error::Error>> {
    let password = ask("Password: ")?.ok_or(CliError::PasswordRequired)?;
    app.credentials()
        .login(name, &password)
        .await
        .ok_or_else(|| CliError::InvalidCredentials.into())
}

async fn practice(
    app: &AppServices,
    settings: &Settings,
    user: &User,
    mode: PracticeMode,
) -> CliResult {
    let practice = app.practice();
    let mut session = practice.open(user.id()).await;

    match practice.start(&mut session, mode) {
        Ok(progress) => println!("{} words to practice. Type :hint or :quit at any time.", progress.total),
        Err(SessionError::NothingToPractice { mode }) => {
            println!("Nothing to practice in {mode} mode.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    while let Some(word) = session.current_word().cloned() {
        let Some(input) = ask(&format!("{} ({}): ", word.prompt(), session.try_number()))? else {
            practice.quit(&mut session).await?;
            break;
        };
        match input.trim() {
            ":quit" => {
                practice.quit(&mut session).await?;
                break;
            }
            ":hint" => {
                let audio = practice.hint(&session).await;
                announce_audio(settings, word.answer(), audio.as_deref());
                continue;
            }
            _ => {}
        }

        let result = practice.submit(&mut session, &input).await?;
        match result.outcome {
            SubmitOutcome::TryAgain { apostrophe_only } => {
                if apostrophe_only {
                    println!("Almost: check the apostrophe.");
                } else {
                    println!("Not quite, try again.");
                }
                announce_audio(settings, word.answer(), result.pronunciation.as_deref());
            }
            SubmitOutcome::Resolved(res) if res.correct => println!("Correct!"),
            SubmitOutcome::Resolved(res) => println!("The answer was: {}", res.word.answer()),
        }
    }

    summarize(app, &session).await;
    Ok(())
}

async fn summarize(app: &AppServices, session: &PracticeSession) {
    let tally = session.tally();
    let verb = match session.state() {
        SessionState::Abandoned => "Stopped",
        _ => "Finished",
    };
    println!(
        "{verb}: {} attempted, {} correct, {} on the first try.",
        tally.attempted, tally.correct, tally.perfect
    );
    let stats = app.reporting().stats(session.user()).await;
    println!("Overall rating: {} ({})", stats.rating, stats.rating.tier());
}

fn announce_audio(settings: &Settings, answer: &str, audio: Option<&[u8]>) {
    let (Some(audio), Some(dir)) = (audio, settings.audio_dir.as_deref()) else {
        return;
    };
    match save_audio(dir, answer, audio) {
        Ok(path) => println!("Pronunciation: {}", path.display()),
        Err(e) => tracing::warn!(error = %e, "could not write pronunciation audio"),
    }
}

fn save_audio(dir: &Path, answer: &str, audio: &[u8]) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let stem: String = answer
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let path = dir.join(format!("{stem}.mp3"));
    std::fs::write(&path, audio)?;
    Ok(path)
}

/// Print `prompt` and read one line. `None` at end of input.
fn ask(prompt: &str) -> io::Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}
