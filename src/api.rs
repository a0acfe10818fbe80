//! Client for the game server's HTTP/JSON API.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::models::{
  GameConfig, GameLog, GameStatus, LogList, OllamaStatus, ServerError, SubmitActionBody,
};

/// Default game server location.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("request failed: {0}")]
  Transport(String),
  #[error("{message}")]
  Rejected { status: StatusCode, message: String },
  #[error("unexpected response: {0}")]
  Decode(String),
  #[error("invalid game server URL: {0}")]
  InvalidUrl(String),
}

impl ApiError {
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::Rejected { status, .. } if *status == StatusCode::NOT_FOUND)
  }
}

#[async_trait]
pub trait GameApi: Send + Sync {
  async fn start_game(&self, config: &GameConfig) -> Result<(), ApiError>;
  async fn game_status(&self) -> Result<GameStatus, ApiError>;
  async fn submit_action(&self, action: &str) -> Result<(), ApiError>;
  async fn check_ollama(&self) -> Result<OllamaStatus, ApiError>;
  async fn list_logs(&self) -> Result<LogList, ApiError>;
  async fn get_log(&self, game_id: &str) -> Result<GameLog, ApiError>;
  /// Where the browser should be sent to fetch the raw log file.
  fn download_url(&self, game_id: &str) -> String;
}

#[derive(Clone)]
pub struct HttpGameApi {
  client: Client,
  base: Url,
}

impl HttpGameApi {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
    let base =
      Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
    if base.cannot_be_a_base() {
      return Err(ApiError::InvalidUrl(base_url.to_string()));
    }
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| ApiError::Transport(e.to_string()))?;

    Ok(Self { client, base })
  }

  /// Appends `segments` to the base path, escaping each one on its own.
  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
    let response = self
      .client
      .get(self.endpoint(segments))
      .send()
      .await
      .map_err(|e| ApiError::Transport(e.to_string()))?;
    decode(check(response).await?).await
  }
}

/// Turns a non-2xx response into [`ApiError::Rejected`], preferring the
/// server's `{error}` text over the raw body.
async fn check(response: Response) -> Result<Response, ApiError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  let body = response.text().await.unwrap_or_default();
  let message = match serde_json::from_str::<ServerError>(&body) {
    Ok(e) => e.error,
    Err(_) if body.trim().is_empty() => format!("server answered {status}"),
    Err(_) => body,
  };
  Err(ApiError::Rejected { status, message })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
  let bytes = response
    .bytes()
    .await
    .map_err(|e| ApiError::Transport(e.to_string()))?;
  serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl GameApi for HttpGameApi {
  async fn start_game(&self, config: &GameConfig) -> Result<(), ApiError> {
    let response = self
      .client
      .post(self.endpoint(&["api", "start_game"]))
      .json(config)
      .send()
      .await
      .map_err(|e| ApiError::Transport(e.to_string()))?;
    check(response).await?;
    Ok(())
  }

  async fn game_status(&self) -> Result<GameStatus, ApiError> {
    self.get_json(&["api", "game_status"]).await
  }

  async fn submit_action(&self, action: &str) -> Result<(), ApiError> {
    let response = self
      .client
      .post(self.endpoint(&["api", "submit_action"]))
      .json(&SubmitActionBody { action })
      .send()
      .await
      .map_err(|e| ApiError::Transport(e.to_string()))?;
    check(response).await?;
    Ok(())
  }

  async fn check_ollama(&self) -> Result<OllamaStatus, ApiError> {
    self.get_json(&["api", "check_ollama"]).await
  }

  async fn list_logs(&self) -> Result<LogList, ApiError> {
    self.get_json(&["api", "logs"]).await
  }

  async fn get_log(&self, game_id: &str) -> Result<GameLog, ApiError> {
    self.get_json(&["api", "log", game_id]).await
  }

  fn download_url(&self, game_id: &str) -> String {
    self
      .endpoint(&["api", "log", game_id, "download"])
      .to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn trailing_slash_is_trimmed() {
    let api = HttpGameApi::new("http://localhost:5000/", Duration::from_secs(1)).unwrap();
    assert_eq!(
      api.download_url("20250101_120000"),
      "http://localhost:5000/api/log/20250101_120000/download"
    );
  }

  #[test]
  fn game_ids_are_escaped_as_one_segment() {
    let api = HttpGameApi::new("http://localhost:5000", Duration::from_secs(1)).unwrap();
    assert_eq!(
      api.download_url("a/b c"),
      "http://localhost:5000/api/log/a%2Fb%20c/download"
    );
  }

  #[test]
  fn base_path_prefix_is_kept() {
    let api = HttpGameApi::new("http://game.test/avalon/", Duration::from_secs(1)).unwrap();
    assert_eq!(
      api.endpoint(&["api", "game_status"]).as_str(),
      "http://game.test/avalon/api/game_status"
    );
  }

  #[test]
  fn unusable_base_url_is_rejected() {
    let err = HttpGameApi::new("mailto:someone", Duration::from_secs(1))
      .err()
      .unwrap();
    assert!(matches!(err, ApiError::InvalidUrl(_)));
    assert!(HttpGameApi::new("not a url", Duration::from_secs(1)).is_err());
  }

  #[test]
  fn rejected_error_displays_server_text() {
    let err = ApiError::Rejected {
      status: StatusCode::BAD_REQUEST,
      message: "A game is already running".into(),
    };
    assert_eq!(err.to_string(), "A game is already running");
    assert!(!err.is_not_found());
  }
}
