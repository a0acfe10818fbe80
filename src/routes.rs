use crate::{
  error::AppError,
  models::LogList,
  state::AppState,
  templates::{self, IndexTemplate, LogTemplate, ViewerTemplate},
  viewer::{GameSelector, LogView},
  ws,
};
use askama::Template;
use axum::{
  Json, Router,
  extract::{Path, Query, State},
  response::{Html, IntoResponse, Redirect},
  routing::get,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub fn app(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/", get(index))
    .route("/ws", get(ws::ws_handler))
    .route("/viewer", get(viewer_page))
    .route("/viewer/log/{game_id}", get(log_fragment))
    .route("/viewer/download/{game_id}", get(download))
    .route("/healthz", get(healthz))
    .layer(
      ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new().deflate(true).gzip(true)),
    )
    .with_state(state)
}

// Renders to an owned `Html` body so fragments can also be embedded in pages.
fn render<T: Template>(t: T) -> Result<Html<String>, AppError> {
  let s = t
    .render()
    .map_err(|e| anyhow::anyhow!("Template error: {}", e))?;
  Ok(Html(s))
}

async fn index(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
  let snapshot = state.controller.snapshot().await;
  let controller_html = render(templates::render_controller(&snapshot))?.0;
  render(IndexTemplate {
    controller_html,
    backend_url: state.config.backend_url.clone(),
  })
}

#[derive(serde::Deserialize)]
struct ViewerParams {
  game: Option<String>,
}

async fn viewer_page(
  State(state): State<Arc<AppState>>,
  Query(params): Query<ViewerParams>,
) -> Result<impl IntoResponse, AppError> {
  let game = params.game.filter(|g| !g.is_empty());

  let list = match state.api.list_logs().await {
    Ok(list) => list,
    Err(e) => {
      tracing::warn!(error = %e, "failed to load game list");
      LogList::default()
    }
  };
  let selector = GameSelector::build(&list, game.as_deref());

  let (log_html, load_error) = match game {
    None => (None, None),
    Some(id) => match state.api.get_log(&id).await {
      Ok(log) => (Some(render_log(&id, LogView::build(&log))?), None),
      Err(e) => {
        tracing::warn!(game_id = %id, error = %e, "failed to load game log");
        (None, Some(format!("Failed to load game log: {e}")))
      }
    },
  };

  render(ViewerTemplate {
    selector,
    log_html,
    load_error,
  })
}

fn render_log(game_id: &str, view: LogView) -> Result<String, AppError> {
  Ok(
    render(LogTemplate {
      game_id: game_id.to_string(),
      view,
    })?
    .0,
  )
}

async fn log_fragment(
  State(state): State<Arc<AppState>>,
  Path(game_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
  let log = state.api.get_log(&game_id).await?;
  Ok(Html(render_log(&game_id, LogView::build(&log))?))
}

async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(serde_json::json!({
    "status": "ok",
    "polling": state.controller.is_polling(),
  }))
}

async fn download(State(state): State<Arc<AppState>>, Path(game_id): Path<String>) -> Redirect {
  Redirect::to(&state.api.download_url(&game_id))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::DEFAULT_BACKEND_URL;
  use crate::conf::Config;
  use crate::controller::tests::FakeApi;
  use crate::models::{LogSummary, Winner};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use tower::ServiceExt;

  fn test_app(api: FakeApi) -> Router {
    let config = Config {
      listen: "127.0.0.1:0".into(),
      backend_url: DEFAULT_BACKEND_URL.into(),
      poll_ms: 500,
      recent_games: 10,
      request_timeout_secs: 10,
    };
    app(AppState::new(Arc::new(api), config))
  }

  async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
    let res = app
      .oneshot(Request::get(uri).body(Body::empty()).unwrap())
      .await
      .unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
      .await
      .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
  }

  #[tokio::test]
  async fn index_renders_connecting_state() {
    let (status, body) = get_body(test_app(FakeApi::default()), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Connecting to game server..."));
    assert!(body.contains("startGameBtn"));
  }

  #[tokio::test]
  async fn viewer_without_games() {
    let (status, body) = get_body(test_app(FakeApi::default()), "/viewer").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("No games available"));
  }

  #[tokio::test]
  async fn viewer_preselects_and_renders_requested_game() {
    let api = FakeApi::default();
    let log = crate::viewer::tests::sample_log();
    api.logs.lock().unwrap().push(LogSummary {
      game_id: log.game_id.clone(),
      winner: Winner::Evil,
      timestamp: Some(log.timestamp.clone()),
    });
    api.game_logs.lock().unwrap().push(log);

    let (status, body) = get_body(test_app(api), "/viewer?game=20250105_143045").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"value="20250105_143045" selected"#));
    assert!(body.contains("Game Overview"));
  }

  #[tokio::test]
  async fn unknown_log_fragment_is_not_found() {
    let (status, _) = get_body(test_app(FakeApi::default()), "/viewer/log/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn download_redirects_to_game_server() {
    let res = test_app(FakeApi::default())
      .oneshot(
        Request::get("/viewer/download/g7")
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(
      res.headers().get(header::LOCATION).unwrap(),
      "http://game.test/api/log/g7/download"
    );
  }

  #[tokio::test]
  async fn health_check() {
    let (status, body) = get_body(test_app(FakeApi::default()), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""status":"ok""#));
    assert!(body.contains(r#""polling":false"#));
  }
}
