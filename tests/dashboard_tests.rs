// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard service tests: load, rename, import and auth-change handling.

mod common;

use common::{millis_from_now, seed_credentials, session_for, FakeStrava, ATHLETE_ID};
use std::sync::Arc;
use std::time::Duration;
use strava_namer::db::{keys, KeyValueStore, MemoryStore};
use strava_namer::error::AppError;
use strava_namer::services::names::{render_template, NamingStyle};
use strava_namer::services::{DashboardService, ImportOutcome, Session};

async fn authenticated(fake: &FakeStrava) -> (Session, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    seed_credentials(store.as_ref(), millis_from_now(Duration::from_secs(3600)));
    (session_for(&fake.config(), store.clone()), store)
}

#[tokio::test]
async fn test_load_fetches_athlete_and_activities() {
    let fake = FakeStrava::start().await;
    let (session, _) = authenticated(&fake).await;
    let dashboard = DashboardService::new(session, false);

    let view = dashboard.load().await.unwrap();
    assert_eq!(view.athlete.as_ref().map(|a| a.id), Some(ATHLETE_ID));
    assert_eq!(view.activities.len(), 2);
    assert_eq!(view.stats.activity_count, 2);
    assert_eq!(view.stats.total_distance_meters, 25000.0);
    assert_eq!(view.last_import, None);

    let query = &fake.activity_queries()[0];
    assert_eq!(query.get("page").map(String::as_str), Some("1"));
    assert_eq!(query.get("per_page").map(String::as_str), Some("20"));
}

#[tokio::test]
async fn test_rename_pushes_generated_name() {
    let fake = FakeStrava::start().await;
    let (session, _) = authenticated(&fake).await;
    let dashboard = DashboardService::new(session, false);
    let view = dashboard.load().await.unwrap();

    let result = dashboard.rename(1, "serious").await.unwrap();
    assert_eq!(result.activity_id, 1);
    assert_eq!(result.style, "serious");

    // Must be one of the serious templates for this activity
    let run = &view.activities[0];
    let candidates: Vec<String> = (0..10)
        .map(|i| render_template(run, NamingStyle::Serious, i))
        .collect();
    assert!(candidates.contains(&result.name));

    assert_eq!(fake.renames(), vec![(1, result.name.clone())]);
    assert_eq!(dashboard.view().await.activities[0].name, result.name);
}

#[tokio::test]
async fn test_rename_unknown_style_uses_descriptive() {
    let fake = FakeStrava::start().await;
    let (session, _) = authenticated(&fake).await;
    let dashboard = DashboardService::new(session, false);
    let view = dashboard.load().await.unwrap();

    let result = dashboard.rename(2, "motivational").await.unwrap();

    let ride = &view.activities[1];
    let candidates: Vec<String> = (0..10)
        .map(|i| render_template(ride, NamingStyle::Descriptive, i))
        .collect();
    assert!(candidates.contains(&result.name));
}

#[tokio::test]
async fn test_rename_requires_loaded_activity() {
    let fake = FakeStrava::start().await;
    let (session, _) = authenticated(&fake).await;
    let dashboard = DashboardService::new(session, false);

    let err = dashboard.rename(1, "funny").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(fake.renames().is_empty());
}

#[tokio::test]
async fn test_import_disabled_does_nothing() {
    let fake = FakeStrava::start().await;
    let (session, store) = authenticated(&fake).await;
    let dashboard = DashboardService::new(session, false);

    let outcome = dashboard.import_new_activities().await.unwrap();
    assert_eq!(outcome, ImportOutcome::Disabled);
    assert!(fake.activity_queries().is_empty());
    assert!(store.get(keys::LAST_IMPORT).unwrap().is_none());
}

#[tokio::test]
async fn test_import_prepends_new_activities() {
    let fake = FakeStrava::start().await;
    let (session, _) = authenticated(&fake).await;
    let dashboard = DashboardService::new(session.clone(), true);
    dashboard.load().await.unwrap();

    let before = chrono::Utc::now().timestamp_millis();
    let outcome = dashboard.import_new_activities().await.unwrap();
    assert_eq!(outcome, ImportOutcome::Imported { count: 1 });

    let view = dashboard.view().await;
    let ids: Vec<u64> = view.activities.iter().map(|a| a.id).collect();
    assert_eq!(ids, [3, 1, 2]);
    assert!(view.last_import.is_some());

    // First import looks back seven days, in epoch seconds
    let queries = fake.activity_queries();
    let after: i64 = queries[1]["after"].parse().unwrap();
    let week = 7 * 24 * 60 * 60;
    assert!((before / 1000 - week - after).abs() <= 5);

    // Later imports start from the stored high-water mark
    let mark = session.last_import().unwrap();
    assert!(mark >= before);
    dashboard.import_new_activities().await.unwrap();
    let after: i64 = fake.activity_queries()[2]["after"].parse().unwrap();
    assert_eq!(after, mark / 1000);
}

#[tokio::test]
async fn test_logout_clears_view() {
    let fake = FakeStrava::start().await;
    let (session, _) = authenticated(&fake).await;
    let dashboard = DashboardService::new(session.clone(), false);
    dashboard.load().await.unwrap();

    session.logout();
    dashboard.on_auth_changed().await;

    let view = dashboard.view().await;
    assert!(view.athlete.is_none());
    assert!(view.activities.is_empty());
}

#[tokio::test]
async fn test_auth_listener_follows_logout() {
    let fake = FakeStrava::start().await;
    let (session, _) = authenticated(&fake).await;
    let dashboard = Arc::new(DashboardService::new(session.clone(), false));
    dashboard.load().await.unwrap();
    let _listener = dashboard.spawn_auth_listener();

    session.logout();

    let cleared = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if dashboard.view().await.athlete.is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(cleared.is_ok());
}

#[tokio::test]
async fn test_load_after_expiry_needs_login() {
    let fake = FakeStrava::start().await;
    let store = Arc::new(MemoryStore::new());
    seed_credentials(store.as_ref(), millis_from_now(Duration::ZERO) - 1);
    let dashboard = DashboardService::new(session_for(&fake.config(), store), false);

    let err = dashboard.load().await.unwrap_err();
    assert!(err.requires_login());
    assert!(fake.activity_queries().is_empty());
}

#[tokio::test]
async fn test_stats_follow_view_state() {
    let fake = FakeStrava::start().await;
    let (session, _) = authenticated(&fake).await;
    let dashboard = DashboardService::new(session, false);
    assert_eq!(dashboard.stats().await.activity_count, 0);

    dashboard.load().await.unwrap();
    let stats = dashboard.stats().await;
    assert_eq!(stats.activity_count, 2);
    assert_eq!(stats.distinct_types, 2);
    assert_eq!(stats.total_moving_seconds, 5400.0);
    assert_eq!(stats.total_elevation_meters, 250.0);
}
