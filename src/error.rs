use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};
use std::fmt::Debug;

use crate::api::ApiError;

// Wraps `anyhow::Error` so handlers can use `?` on anything.
pub struct AppError(anyhow::Error);

impl<E> From<E> for AppError
where
  E: Into<anyhow::Error>,
{
  fn from(err: E) -> Self {
    Self(err.into())
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    tracing::error!("Application error: {:#}", self.0);

    // problems talking to the game server are not ours
    let status = match self.0.downcast_ref::<ApiError>() {
      Some(e) if e.is_not_found() => StatusCode::NOT_FOUND,
      Some(_) => StatusCode::BAD_GATEWAY,
      None => StatusCode::INTERNAL_SERVER_ERROR,
    };

    #[cfg(debug_assertions)]
    let message = format!(
      "Something went wrong:\n{}\n\nBacktrace:\n{}",
      self.0,
      self.0.backtrace()
    );

    #[cfg(not(debug_assertions))]
    let message = format!("Something went wrong: {}", self.0);

    (status, message).into_response()
  }
}

impl Debug for AppError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:?}", self.0)
  }
}
