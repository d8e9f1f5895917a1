use std::time::Duration;

use services::{AppServices, Clock, DEFAULT_QUIET_INTERVAL, STATE_KEY, VERSION_KEY};
use storage::repository::{InMemoryKeyValueStore, KeyValueStore, Storage};
use study_core::model::{Level, SCHEMA_VERSION, Theme};
use study_core::time::fixed_now;

#[tokio::test]
async fn edits_survive_a_restart_on_sqlite() {
    let url = "sqlite:file:memdb_store_flow?mode=memory&cache=shared";
    let clock = Clock::fixed(fixed_now());

    let mut first = AppServices::new_sqlite(url, clock, DEFAULT_QUIET_INTERVAL)
        .await
        .expect("open sqlite");
    assert_eq!(first.store().state().subjects.len(), 3);

    let store = first.store_mut();
    let physics = store.state().subjects[0].id.clone();
    let chapter = store.state().subjects[0].chapters[1].id.clone();
    let column = store.state().subjects[0].columns[0].id.clone();
    assert!(store.set_level(&physics, &chapter, &column, Level::FULL));
    let biology = store.add_subject("Biology").expect("subject added");
    store.add_chapter(&biology, "Cells").expect("chapter added");
    store.toggle_theme();

    first.shutdown().await;
    assert!(!first.scheduler().has_pending());

    let second = AppServices::new_sqlite(url, clock, DEFAULT_QUIET_INTERVAL)
        .await
        .expect("reopen sqlite");
    let state = second.store().state();
    assert_eq!(state.subjects.len(), 4);
    assert_eq!(state.theme, Theme::Light);
    assert_eq!(
        state.subjects[0].chapters[1].level_for(&column),
        Level::FULL
    );
    assert_eq!(state.subjects[3].name, "Biology");
    assert_eq!(state.version.as_deref(), Some(SCHEMA_VERSION));
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_are_written_after_quiet_period() {
    let kv = InMemoryKeyValueStore::new();
    let storage = Storage {
        kv: std::sync::Arc::new(kv.clone()),
    };
    let mut services =
        AppServices::with_storage(storage, Clock::fixed(fixed_now()), DEFAULT_QUIET_INTERVAL)
            .await;
    assert_eq!(kv.peek(VERSION_KEY).as_deref(), Some(SCHEMA_VERSION));
    assert_eq!(kv.peek(STATE_KEY), None);
    assert!(services.scheduler().has_pending());

    for name in ["Biology", "Botany", "Zoology"] {
        services.store_mut().add_subject(name);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(kv.peek(STATE_KEY), None);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let blob = kv.get(STATE_KEY).await.unwrap().expect("state written");
    assert!(blob.contains("\"Zoology\""));
    assert!(blob.contains("\"lastModified\":\"2023-11-14T22:13:20.000Z\""));
}

#[tokio::test]
async fn import_replaces_tree_and_persists_on_flush() {
    let kv = InMemoryKeyValueStore::new();
    let storage = Storage {
        kv: std::sync::Arc::new(kv.clone()),
    };
    let mut services =
        AppServices::with_storage(storage, Clock::fixed(fixed_now()), DEFAULT_QUIET_INTERVAL)
            .await;

    let payload = r#"{
        "subjects": [{
            "id": "s1",
            "name": "Imported",
            "columns": [{"id": "c1", "name": "Notes", "type": "notes", "order": 0}],
            "chapters": [{
                "id": "ch1",
                "name": "Only",
                "checkballs": [{"columnId": "c1", "level": 10}]
            }]
        }],
        "theme": "light",
        "lastModified": "2024-01-01T00:00:00.000Z"
    }"#;
    services.store_mut().import_json(payload).expect("import");
    let stats = services.store().progress();
    assert_eq!(stats.completed_chapters, 1);
    assert!((stats.overall_completion_percentage - 100.0).abs() < f64::EPSILON);

    services.shutdown().await;
    let reloaded = services.gateway().try_load().await.expect("reload");
    assert_eq!(reloaded.subjects[0].name, "Imported");
    assert_eq!(reloaded.theme, Theme::Light);
}

#[tokio::test]
async fn mismatched_blob_is_replaced_by_defaults_for_good() {
    let kv = InMemoryKeyValueStore::new();
    kv.set(STATE_KEY, r#"{"subjects":[{"id":"old","name":"OldSchema","columns":[],"chapters":[]}]}"#)
        .await
        .unwrap();
    kv.set(VERSION_KEY, "0.9").await.unwrap();
    let storage = Storage {
        kv: std::sync::Arc::new(kv.clone()),
    };
    let clock = Clock::fixed(fixed_now());

    let first = AppServices::with_storage(storage.clone(), clock, DEFAULT_QUIET_INTERVAL).await;
    let first_ids: Vec<String> = first
        .store()
        .state()
        .subjects
        .iter()
        .map(|s| s.id.to_string())
        .collect();
    assert_eq!(first.store().state().subjects[0].name, "Physics");
    first.shutdown().await;

    let second = AppServices::with_storage(storage, clock, DEFAULT_QUIET_INTERVAL).await;
    let state = second.store().state();
    let names: Vec<&str> = state.subjects.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Physics", "Chemistry", "Mathematics"]);
    let second_ids: Vec<String> = state.subjects.iter().map(|s| s.id.to_string()).collect();
    assert_eq!(second_ids, first_ids);
    assert!(!second.scheduler().has_pending());
}
