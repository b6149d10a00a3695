//! Integration tests for the orchestrator.
//!
//! These tests wire the real HTTP clients through `AppConfig` and point
//! them at a local mock of all three upstream services.

use std::collections::HashMap;

use domain::AppConfig;
use httpmock::prelude::*;
use pipeline::{BranchOutcome, Stage};
use serde_json::json;
use server::RecommendationOrchestrator;

fn config(server: &MockServer, extra: &[(&str, &str)]) -> AppConfig {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("OPENAI_API_KEY".into(), "sk-test".into()),
        ("TMDB_API_KEY".into(), "tmdb-test".into()),
        ("OPENAI_BASE_URL".into(), server.base_url()),
        ("TMDB_BASE_URL".into(), server.base_url()),
        ("MUSIC_BASE_URL".into(), server.base_url()),
        ("TMDB_IMAGE_BASE_URL".into(), "https://images.test/w500".into()),
    ]);
    for (name, value) in extra {
        vars.insert(name.to_string(), value.to_string());
    }
    AppConfig::from_lookup(|name| vars.get(name).cloned()).expect("test config is valid")
}

fn detail_body(id: u64, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "poster_path": format!("/{}.jpg", id),
        "genres": [{"name": "Comedy"}, {"name": "Family"}, {"name": "Adventure"}, {"name": "Fantasy"}],
        "credits": {"cast": [{"name": "A"}, {"name": "B"}, {"name": "C"}, {"name": "D"}]},
        "vote_average": 7.2,
        "overview": "",
        "release_date": "2014-11-28"
    })
}

async fn mock_completion(server: &MockServer, reply: &str) {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer sk-test");
            then.status(200).json_body(json!({
                "choices": [{"message": {"role": "assistant", "content": reply}}]
            }));
        })
        .await;
}

#[tokio::test]
async fn test_full_run_against_mocked_services() {
    let server = MockServer::start_async().await;
    mock_completion(&server, "Keyword: \"comfort\".").await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/search/movie").query_param("query", "comfort");
            then.status(200).json_body(json!({
                "results": [
                    {"id": 101, "title": "Paddington", "popularity": 50.0},
                    {"id": 102, "title": "Chef", "popularity": 40.0},
                    {"id": 103, "title": "Amélie", "popularity": 30.0},
                    {"id": 104, "title": "Up", "popularity": 20.0}
                ]
            }));
        })
        .await;

    let mut detail_mocks = Vec::new();
    for (id, title) in [(101, "Paddington"), (102, "Chef"), (103, "Amélie"), (104, "Up")] {
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(format!("/movie/{}", id))
                    .query_param("append_to_response", "credits");
                then.status(200).json_body(detail_body(id, title));
            })
            .await;
        detail_mocks.push(mock);
    }

    server
        .mock_async(|when, then| {
            when.method(GET).path("/search").query_param("q", "comfort");
            then.status(200).json_body(json!({
                "data": [
                    {"id": 1, "title": "Here Comes the Sun", "artist": {"name": "The Beatles"},
                     "album": {"cover_medium": "https://covers.test/1.jpg"}, "preview": "https://previews.test/1.mp3"},
                    {"id": 2, "title": "Lovely Day", "artist": {"name": "Bill Withers"},
                     "album": {"cover_medium": null}, "preview": ""}
                ]
            }));
        })
        .await;

    let orchestrator = RecommendationOrchestrator::from_config(&config(&server, &[]));
    let result = orchestrator.run(&domain::Mood::new("행복").unwrap()).await.unwrap();

    assert_eq!(result.keyword.as_str(), "comfort");

    let films = result.films.items();
    let ids: Vec<_> = films.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![101, 102, 103]);
    assert_eq!(films[0].poster_url.as_deref(), Some("https://images.test/w500/101.jpg"));
    assert_eq!(films[0].genres_line(), "Comedy, Family, Adventure");
    assert_eq!(films[0].cast_line(), "A, B, C");
    assert_eq!(films[0].overview, None);

    assert_eq!(detail_mocks[3].hits_async().await, 0, "only the top 3 are enriched");
    for mock in &detail_mocks[..3] {
        assert_eq!(mock.hits_async().await, 1);
    }

    let tracks = result.tracks();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].artist, "The Beatles");
    assert_eq!(tracks[1].preview_url, None);
}

#[tokio::test]
async fn test_empty_search_is_no_match() {
    let server = MockServer::start_async().await;
    mock_completion(&server, "xyzzynomatch").await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/search/movie");
            then.status(200).json_body(json!({"results": []}));
        })
        .await;
    let details = server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/movie/");
            then.status(200).json_body(detail_body(1, "unused"));
        })
        .await;

    let orchestrator = RecommendationOrchestrator::from_config(&config(&server, &[("RECS_MUSIC", "false")]));
    let result = orchestrator.run(&domain::Mood::new("분노").unwrap()).await.unwrap();

    assert!(result.is_no_match());
    assert!(result.music.is_none());
    assert_eq!(details.hits_async().await, 0);
}

#[tokio::test]
async fn test_completion_outage_surfaces_as_transport_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(503).body("upstream unavailable");
        })
        .await;
    let search = server
        .mock_async(|when, then| {
            when.method(GET).path("/search/movie");
            then.status(200).json_body(json!({"results": []}));
        })
        .await;

    let orchestrator = RecommendationOrchestrator::from_config(&config(&server, &[]));
    let err = orchestrator.run(&domain::Mood::new("행복").unwrap()).await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(err.stage(), Stage::Completion);
    assert_eq!(search.hits_async().await, 0);
}

#[tokio::test]
async fn test_music_quota_error_keeps_films() {
    let server = MockServer::start_async().await;
    mock_completion(&server, "comfort").await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/search/movie");
            then.status(200).json_body(json!({
                "results": [{"id": 101, "title": "Paddington", "popularity": 50.0}]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/movie/101");
            then.status(200).json_body(detail_body(101, "Paddington"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/search");
            then.status(200)
                .json_body(json!({"error": {"type": "Exception", "message": "Quota limit exceeded", "code": 4}}));
        })
        .await;

    let orchestrator = RecommendationOrchestrator::from_config(&config(&server, &[]));
    let result = orchestrator.run(&domain::Mood::new("행복").unwrap()).await.unwrap();

    assert_eq!(result.films.items().len(), 1);
    match result.music {
        Some(BranchOutcome::Failed(error)) => {
            assert!(error.is_decode());
            assert_eq!(error.stage(), Stage::MusicSearch);
        }
        other => panic!("expected failed music branch, got {:?}", other),
    }
}
