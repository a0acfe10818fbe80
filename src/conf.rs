use std::{env, str::FromStr, time::Duration};

use crate::api::DEFAULT_BACKEND_URL;

#[derive(Clone, Debug)]
pub struct Config {
  pub listen: String,
  pub backend_url: String,
  pub poll_ms: u64,
  pub recent_games: usize,
  pub request_timeout_secs: u64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
  env::var(key)
    .ok()
    .and_then(|v| v.trim().parse().ok())
    .unwrap_or(default)
}

impl Config {
  pub fn load() -> Self {
    Self {
      listen: env::var("AVALON_LISTEN").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
      backend_url: env::var("AVALON_BACKEND_URL")
        .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string()),
      poll_ms: env_or("AVALON_POLL_MS", 500),
      recent_games: env_or("AVALON_RECENT_GAMES", 10),
      request_timeout_secs: env_or("AVALON_REQUEST_TIMEOUT_SECS", 10),
    }
  }

  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_ms.max(1))
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs.max(1))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn intervals_never_reach_zero() {
    let conf = Config {
      listen: "127.0.0.1:0".into(),
      backend_url: DEFAULT_BACKEND_URL.into(),
      poll_ms: 0,
      recent_games: 10,
      request_timeout_secs: 0,
    };
    assert_eq!(conf.poll_interval(), Duration::from_millis(1));
    assert_eq!(conf.request_timeout(), Duration::from_secs(1));
  }
}
