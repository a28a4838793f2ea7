use chrono::Duration;
use drill_core::model::{
    Attempts, PracticeMode, ProgressMap, SessionEnd, SessionHistoryRecord, SessionTally, User,
    UserId, UserRole,
};
use drill_core::time::fixed_now;
use storage::repository::{
    ProgressRepository, SessionHistoryRepository, StorageError, UserRepository,
};
use storage::sqlite::SqliteRepository;
use tempfile::TempDir;

async fn connect(name: &str) -> (TempDir, SqliteRepository) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join(name).display());
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    // Migrations are idempotent.
    repo.migrate().await.expect("migrate again");
    (dir, repo)
}

fn user(name: &str) -> UserId {
    UserId::registered(name).unwrap()
}

#[tokio::test]
async fn sqlite_users_reject_duplicates_and_update_roles() {
    let (_dir, repo) = connect("users.sqlite3").await;
    let anna = User::registered(user("anna"), "$argon2id$x".into(), fixed_now());
    repo.insert_user(&anna).await.unwrap();

    let err = repo.insert_user(&anna).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let fetched = repo.get_user(&user("anna")).await.unwrap().expect("user");
    assert_eq!(fetched.password_hash(), Some("$argon2id$x"));
    assert_eq!(fetched.role(), UserRole::Learner);
    assert_eq!(fetched.created_at(), fixed_now());

    repo.set_role(&user("anna"), UserRole::Admin).await.unwrap();
    let fetched = repo.get_user(&user("anna")).await.unwrap().expect("user");
    assert_eq!(fetched.role(), UserRole::Admin);

    assert!(repo.get_user(&user("bob")).await.unwrap().is_none());
    let err = repo.set_role(&user("bob"), UserRole::Admin).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_progress_round_trips_and_overwrites() {
    let (_dir, repo) = connect("progress.sqlite3").await;
    let anna = user("anna");
    let now = fixed_now();

    let mut map = ProgressMap::new();
    map.record("hola", Attempts::CAPPED, now);
    map.record("gracias", Attempts::PERFECT, now);
    repo.save_progress(&anna, &map).await.unwrap();

    let loaded = repo.load_progress(&anna).await.unwrap();
    assert_eq!(loaded.attempts("hola"), Some(Attempts::CAPPED));
    assert_eq!(loaded.attempts("gracias"), Some(Attempts::PERFECT));
    assert_eq!(loaded.get("hola").unwrap().last_practiced, now);

    let later = now + Duration::minutes(3);
    map.record("hola", Attempts::PERFECT, later);
    repo.save_progress(&anna, &map).await.unwrap();

    let loaded = repo.load_progress(&anna).await.unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.attempts("hola"), Some(Attempts::PERFECT));
    assert_eq!(loaded.get("hola").unwrap().last_practiced, later);

    let other = repo.load_progress(&user("bob")).await.unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn sqlite_progress_totals_group_by_user() {
    let (_dir, repo) = connect("totals.sqlite3").await;
    let now = fixed_now();

    let mut anna = ProgressMap::new();
    anna.record("hola", Attempts::PERFECT, now);
    anna.record("gracias", Attempts::CAPPED, now);
    repo.save_progress(&user("anna"), &anna).await.unwrap();

    let guest = UserId::from_persisted("guest_1700000000");
    let mut guest_map = ProgressMap::new();
    guest_map.record("hola", Attempts::PERFECT, now);
    repo.save_progress(&guest, &guest_map).await.unwrap();

    let totals = repo.progress_totals().await.unwrap();
    assert_eq!(totals.len(), 2);
    let anna_totals = totals.iter().find(|t| t.user == user("anna")).unwrap();
    assert_eq!(anna_totals.words_practiced, 2);
    assert_eq!(anna_totals.perfect, 1);
}

#[tokio::test]
async fn sqlite_history_appends_and_lists_newest_first() {
    let (_dir, repo) = connect("history.sqlite3").await;
    let anna = user("anna");

    let mut ids = Vec::new();
    for (minutes, end) in [(0, SessionEnd::Abandoned), (5, SessionEnd::Finished)] {
        let record = SessionHistoryRecord::new(
            anna.clone(),
            fixed_now() + Duration::minutes(minutes),
            PracticeMode::NewWords,
            end,
            SessionTally {
                attempted: 2,
                correct: 2,
                perfect: 1,
            },
            50.0,
        )
        .unwrap();
        ids.push(repo.append_record(&record).await.unwrap());
    }

    let rows = repo.list_records(&anna, 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, ids[1]);
    assert_eq!(rows[0].record.end(), SessionEnd::Finished);
    assert_eq!(rows[1].record.end(), SessionEnd::Abandoned);
    assert_eq!(rows[0].record.perfect_words(), 1);
    assert!((rows[0].record.rating() - 50.0).abs() < f64::EPSILON);

    let limited = repo.list_records(&anna, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn sqlite_accepts_guest_rows_without_a_user() {
    let (_dir, repo) = connect("guest.sqlite3").await;
    let guest = UserId::from_persisted("guest_1700000000");
    assert!(repo.get_user(&guest).await.unwrap().is_none());

    let mut map = ProgressMap::new();
    map.record("hola", Attempts::PERFECT, fixed_now());
    repo.save_progress(&guest, &map).await.unwrap();

    let record = SessionHistoryRecord::new(
        guest.clone(),
        fixed_now(),
        PracticeMode::NewWords,
        SessionEnd::Finished,
        SessionTally {
            attempted: 1,
            correct: 1,
            perfect: 1,
        },
        100.0,
    )
    .unwrap();
    repo.append_record(&record).await.unwrap();

    assert_eq!(repo.load_progress(&guest).await.unwrap().len(), 1);
    assert_eq!(repo.list_records(&guest, 5).await.unwrap().len(), 1);
}
