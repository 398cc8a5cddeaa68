use anyhow::{Context, Result};
use std::time::Duration;

use tracing::info;

use crate::catalog::Catalog;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::{log_requests, state::*, RequestsLoggingLevel, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub songs: usize,
}

#[derive(Serialize)]
struct ErrorBody {
    pub error: &'static str,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        songs: state.catalog.get_songs_count(),
    };
    Json(stats)
}

async fn get_songs(State(catalog): State<GuardedCatalog>) -> Response {
    Json(catalog.songs()).into_response()
}

async fn get_song(State(catalog): State<GuardedCatalog>, Path(id): Path<String>) -> Response {
    match catalog.get_song(&id) {
        Some(song) => Json(song).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: "Song not found",
            }),
        )
            .into_response(),
    }
}

pub fn make_app(config: ServerConfig, catalog: Catalog) -> Router {
    let state = ServerState::new(config, catalog);

    Router::new()
        .route("/", get(home))
        .route("/songs", get(get_songs))
        .route("/songs/{id}", get(get_song))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state)
}

pub async fn run_server(
    catalog: Catalog,
    requests_logging_level: RequestsLoggingLevel,
    port: u16,
) -> Result<()> {
    let config = ServerConfig {
        port,
        requests_logging_level,
    };
    let songs_count = catalog.get_songs_count();
    let app = make_app(config, catalog);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!(
        "Serving {} songs at http://localhost:{}",
        songs_count, port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SongMetadata;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let catalog = Catalog::from_songs(vec![
            SongMetadata::new("s1", "Blue", "A"),
            SongMetadata::new("s2", "Green", "B"),
        ])
        .unwrap();
        make_app(ServerConfig::default(), catalog)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0d 00:00:00");
        assert_eq!(format_uptime(Duration::from_secs(3_723)), "0d 01:02:03");
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "1d 01:01:01");
    }

    #[tokio::test]
    async fn home_reports_stats() {
        let (status, body) = get_json(test_app(), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["songs"], 2);
        assert!(body["uptime"].as_str().unwrap().starts_with("0d"));
    }

    #[tokio::test]
    async fn lists_all_songs() {
        let (status, body) = get_json(test_app(), "/songs").await;

        assert_eq!(status, StatusCode::OK);
        let songs = body.as_array().unwrap();
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0]["songId"], "s1");
        assert_eq!(songs[1]["artist"], "B");
    }

    #[tokio::test]
    async fn gets_song_by_id() {
        let (status, body) = get_json(test_app(), "/songs/s2").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["songId"], "s2");
        assert_eq!(body["title"], "Green");
        assert_eq!(body["artist"], "B");
    }

    #[tokio::test]
    async fn responds_not_found_on_unknown_song() {
        let (status, body) = get_json(test_app(), "/songs/nope").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Song not found");
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let request = Request::builder()
            .uri("/albums")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
