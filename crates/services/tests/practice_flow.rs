use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use drill_core::model::{
    Attempts, Catalog, PracticeMode, SessionEnd, UserId, UserRole, WordPair,
};
use drill_core::time::fixed_clock;
use services::{
    AppServices, CatalogService, Pronouncer, SessionError, SessionState, SubmitOutcome,
};
use storage::repository::{InMemoryRepository, Storage};

/// Records every text it was asked to speak.
#[derive(Default)]
struct RecordingPronouncer {
    spoken: Mutex<Vec<String>>,
}

#[async_trait]
impl Pronouncer for RecordingPronouncer {
    async fn pronounce(&self, text: &str) -> Option<Vec<u8>> {
        self.spoken.lock().unwrap().push(text.to_owned());
        Some(b"ID3".to_vec())
    }
}

struct Harness {
    repo: InMemoryRepository,
    app: AppServices,
    pronouncer: Arc<RecordingPronouncer>,
}

fn harness(words: &[(&str, &str)]) -> Harness {
    let repo = InMemoryRepository::new();
    let storage = Storage::from_in_memory(&repo);
    let catalog = Catalog::new(
        words
            .iter()
            .map(|(p, a)| WordPair::new(p, a).unwrap())
            .collect(),
    );
    let pronouncer = Arc::new(RecordingPronouncer::default());
    let app = AppServices::from_parts(
        &storage,
        CatalogService::with_catalog("unused.csv", catalog),
        Arc::clone(&pronouncer) as Arc<dyn Pronouncer>,
        fixed_clock(),
    );
    Harness {
        repo,
        app,
        pronouncer,
    }
}

fn anna() -> UserId {
    UserId::registered("anna").unwrap()
}

#[tokio::test]
async fn first_try_answer_is_perfect_and_rated() {
    let h = harness(&[("hola", "bonjour"), ("gracias", "merci")]);
    let practice = h.app.practice();
    let mut session = practice.open(&anna()).await;
    practice.start(&mut session, PracticeMode::NewWords).unwrap();

    // Answer whichever word was drawn first, then the other.
    for _ in 0..2 {
        let word = session.current_word().unwrap().clone();
        let answer = if word.prompt() == "hola" { "Bonjour" } else { "nope" };
        let result = practice.submit(&mut session, answer).await.unwrap();
        if word.prompt() == "gracias" {
            assert!(matches!(result.outcome, SubmitOutcome::TryAgain { .. }));
            practice.submit(&mut session, "nope").await.unwrap();
        }
    }

    assert_eq!(session.state(), SessionState::Finished);
    let stats = h.app.reporting().stats(&anna()).await;
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.perfect, 1);
    assert!((stats.rating.percent() - 50.0).abs() < f64::EPSILON);
    assert_eq!(h.app.progress().load(&anna()).await.attempts("hola"), Some(Attempts::PERFECT));
}

#[tokio::test]
async fn wrong_then_right_records_two_attempts_and_speaks_answer() {
    let h = harness(&[("hola", "bonjour")]);
    let practice = h.app.practice();
    let mut session = practice.open(&anna()).await;
    practice.start(&mut session, PracticeMode::NewWords).unwrap();

    let first = practice.submit(&mut session, "bonjou").await.unwrap();
    assert_eq!(first.outcome, SubmitOutcome::TryAgain { apostrophe_only: false });
    assert_eq!(first.pronunciation.as_deref(), Some(&b"ID3"[..]));
    assert_eq!(*h.pronouncer.spoken.lock().unwrap(), vec!["bonjour".to_owned()]);

    let second = practice.submit(&mut session, "bonjour").await.unwrap();
    assert!(matches!(second.outcome, SubmitOutcome::Resolved(ref r) if r.correct));
    assert!(second.history_id.is_some());

    let stored = h.app.progress().load(&anna()).await;
    assert_eq!(stored.attempts("hola"), Some(Attempts::CAPPED));
    assert_eq!(stored.perfect_count(), 0);
}

#[tokio::test]
async fn two_misses_reveal_answer() {
    let h = harness(&[("hola", "bonjour")]);
    let practice = h.app.practice();
    let mut session = practice.open(&anna()).await;
    practice.start(&mut session, PracticeMode::NewWords).unwrap();

    practice.submit(&mut session, "bonjou").await.unwrap();
    let result = practice.submit(&mut session, "bonjou").await.unwrap();
    let SubmitOutcome::Resolved(res) = result.outcome else {
        panic!("expected the word to resolve");
    };
    assert!(!res.correct);
    assert_eq!(res.word.answer(), "bonjour");
    assert_eq!(res.attempts, Attempts::CAPPED);
    assert_eq!(
        h.app.progress().load(&anna()).await.attempts("hola"),
        Some(Attempts::CAPPED)
    );
}

#[tokio::test]
async fn wrong_mode_without_mistakes_stays_idle() {
    let h = harness(&[("hola", "bonjour")]);
    let practice = h.app.practice();
    let mut session = practice.open(&anna()).await;

    let err = practice
        .start(&mut session, PracticeMode::WrongWords)
        .unwrap_err();
    assert!(matches!(err, SessionError::NothingToPractice { .. }));
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn new_mode_excludes_practiced_and_wrong_mode_picks_them_up() {
    let h = harness(&[("hola", "bonjour"), ("gracias", "merci")]);
    let practice = (*h.app.practice()).clone().with_seed(11);

    let mut session = practice.open(&anna()).await;
    practice.start(&mut session, PracticeMode::NewWords).unwrap();
    while let Some(word) = session.current_word().cloned() {
        let answer = if word.prompt() == "hola" { "x" } else { "merci" };
        practice.submit(&mut session, answer).await.unwrap();
    }

    let mut next = practice.open(&anna()).await;
    let err = practice.start(&mut next, PracticeMode::NewWords).unwrap_err();
    assert!(matches!(err, SessionError::NothingToPractice { .. }));

    let progress = practice.start(&mut next, PracticeMode::WrongWords).unwrap();
    assert_eq!(progress.total, 1);
    assert_eq!(next.current_word().unwrap().prompt(), "hola");
}

#[tokio::test]
async fn history_is_written_on_finish_and_on_quit() {
    let h = harness(&[("hola", "bonjour"), ("gracias", "merci")]);
    let practice = h.app.practice();

    let mut session = practice.open(&anna()).await;
    practice.start(&mut session, PracticeMode::NewWords).unwrap();
    let answer = session.current_word().unwrap().answer().to_owned();
    practice.submit(&mut session, &answer).await.unwrap();
    let quit_id = practice.quit(&mut session).await.unwrap();
    assert!(quit_id.is_some());
    assert_eq!(session.state(), SessionState::Abandoned);

    let mut session = practice.open(&anna()).await;
    practice.start(&mut session, PracticeMode::NewWords).unwrap();
    let answer = session.current_word().unwrap().answer().to_owned();
    let result = practice.submit(&mut session, &answer).await.unwrap();
    assert!(result.history_id.is_some());
    assert!(result.progress.is_complete());

    let history = h.app.reporting().history(&anna(), 10).await;
    assert_eq!(history.len(), 2);
    let ends: Vec<_> = history.iter().map(|item| item.end).collect();
    assert!(ends.contains(&SessionEnd::Finished));
    assert!(ends.contains(&SessionEnd::Abandoned));
    let finished = history.iter().find(|i| i.end == SessionEnd::Finished).unwrap();
    assert_eq!(finished.words_attempted, 1);
    assert!((finished.rating - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn store_outage_does_not_stop_practice() {
    let h = harness(&[("hola", "bonjour")]);
    let practice = h.app.practice();
    h.repo.set_offline(true);

    let mut session = practice.open(&anna()).await;
    practice.start(&mut session, PracticeMode::NewWords).unwrap();
    let result = practice.submit(&mut session, "bonjour").await.unwrap();
    assert!(result.history_id.is_none());
    assert_eq!(session.state(), SessionState::Finished);
    assert_eq!(session.progress_map().attempts("hola"), Some(Attempts::PERFECT));
}

#[tokio::test]
async fn leaderboard_excludes_guests() {
    let h = harness(&[("hola", "bonjour")]);
    let credentials = h.app.credentials();
    credentials.register("anna", "pw", "pw").await.unwrap();
    let guest = credentials.guest();
    let practice = h.app.practice();

    for user in [anna(), guest.id().clone()] {
        let mut session = practice.open(&user).await;
        practice.start(&mut session, PracticeMode::NewWords).unwrap();
        practice.submit(&mut session, "bonjour").await.unwrap();
    }

    let board = h.app.reporting().leaderboard().await;
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].user, anna());
    assert_eq!(board[0].rank, 1);
}

#[tokio::test]
async fn only_admins_extend_the_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("words.csv");
    std::fs::write(&path, "prompt,answer\nhola,bonjour\n").unwrap();

    let repo = InMemoryRepository::new();
    let app = AppServices::from_parts(
        &Storage::from_in_memory(&repo),
        CatalogService::load(&path),
        Arc::new(services::SilentPronouncer),
        fixed_clock(),
    );
    let credentials = app.credentials();
    let learner = credentials.register("anna", "pw", "pw").await.unwrap();
    credentials.register("maria", "pw", "pw").await.unwrap();
    credentials.set_role("maria", UserRole::Admin).await.unwrap();
    let admin = credentials.login("maria", "pw").await.unwrap();

    let batch = "prompt,answer\ngracias,merci\n";
    assert!(app.catalog().append_from_reader(&learner, batch.as_bytes()).is_err());
    let report = app.catalog().append_from_reader(&admin, batch.as_bytes()).unwrap();
    assert_eq!(report.total, 2);

    let practice = app.practice();
    let mut session = practice.open(learner.id()).await;
    let progress = practice.start(&mut session, PracticeMode::NewWords).unwrap();
    assert_eq!(progress.total, 2);
}
