use askama::Template;

use crate::controller::{RecentGames, SessionState};
use crate::forms::InputForm;
use crate::viewer::{self, GameSelector, LogView};

pub struct RecentGameItem {
  pub game_id: String,
  pub winner: String,
  pub winner_class: String,
  pub when: String,
}

/// Everything below the page header on the controller page; re-sent over the
/// websocket whenever the session changes.
#[derive(Template)]
#[template(path = "controller.html")]
pub struct ControllerTemplate {
  pub status: String,
  pub message: String,
  pub viewer_link: Option<String>,
  pub current_action: Option<String>,
  pub start_enabled: bool,
  pub start_label: &'static str,
  pub form: Option<InputForm>,
  pub awaiting: bool,
  pub recent: Option<Vec<RecentGameItem>>,
  pub recent_failed: bool,
  pub ollama_available: bool,
  pub ollama_models: Vec<String>,
}

pub fn render_controller(s: &SessionState) -> ControllerTemplate {
  let (recent, recent_failed) = match &s.recent {
    RecentGames::NotLoaded => (None, false),
    RecentGames::Failed => (None, true),
    RecentGames::Loaded(games) => (
      Some(
        games
          .iter()
          .map(|g| RecentGameItem {
            game_id: g.game_id.clone(),
            winner: g.winner.to_string(),
            winner_class: g.winner.to_string().to_lowercase(),
            when: g
              .timestamp
              .as_deref()
              .map(viewer::format_timestamp_short)
              .unwrap_or_default(),
          })
          .collect(),
      ),
      false,
    ),
  };
  let (ollama_available, ollama_models) = match &s.ollama {
    Some(o) if o.available => (true, o.models.clone()),
    _ => (false, Vec::new()),
  };

  ControllerTemplate {
    status: s.status.to_string(),
    message: s.message.clone(),
    viewer_link: s.viewer_link(),
    current_action: s.current_action.clone(),
    start_enabled: s.start.enabled,
    start_label: s.start.label,
    form: s.form().cloned(),
    awaiting: s.awaiting_confirmation(),
    recent,
    recent_failed,
    ollama_available,
    ollama_models,
  }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
  pub controller_html: String,
  pub backend_url: String,
}

#[derive(Template)]
#[template(path = "log.html")]
pub struct LogTemplate {
  pub game_id: String,
  pub view: LogView,
}

#[derive(Template)]
#[template(path = "viewer.html")]
pub struct ViewerTemplate {
  pub selector: GameSelector,
  pub log_html: Option<String>,
  pub load_error: Option<String>,
}
