use crate::forms::{self, FormSubmission, InputForm, ValidationError};
use crate::models::{GameStatus, LogSummary, OllamaStatus, PendingInput, StatusKind};

#[derive(Debug, Clone, PartialEq)]
pub struct StartControl {
  pub enabled: bool,
  pub label: &'static str,
}

impl StartControl {
  pub fn ready(label: &'static str) -> Self {
    Self {
      enabled: true,
      label,
    }
  }

  pub fn locked(label: &'static str) -> Self {
    Self {
      enabled: false,
      label,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Panel {
  Hidden,
  Prompt {
    pending: PendingInput,
    form: InputForm,
  },
  /// Answer sent, waiting for the server to move past `submitted`.
  ///
  /// Once the server has taken the answer, `confirmed_after` holds the last
  /// poll sequence number handed out at that moment. A later poll reporting
  /// an identical request is a new request and shows the prompt again.
  AwaitingConfirmation {
    submitted: PendingInput,
    confirmed_after: Option<u64>,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecentGames {
  NotLoaded,
  Loaded(Vec<LogSummary>),
  Failed,
}

/// Side effects the reducer asks the controller to carry out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Effects {
  pub changed: bool,
  pub stop_polling: bool,
  pub refresh_logs: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
  pub status: StatusKind,
  pub message: String,
  pub current_action: Option<String>,
  pub completed_game: Option<String>,
  pub start: StartControl,
  pub panel: Panel,
  pub recent: RecentGames,
  pub ollama: Option<OllamaStatus>,
  pub applied_seq: u64,
}

impl Default for SessionState {
  fn default() -> Self {
    Self {
      status: StatusKind::Idle,
      message: "Connecting to game server...".into(),
      current_action: None,
      completed_game: None,
      start: StartControl::ready("Start Game"),
      panel: Panel::Hidden,
      recent: RecentGames::NotLoaded,
      ollama: None,
      applied_seq: 0,
    }
  }
}

impl SessionState {
  /// Replaces the rendered state with what `status` says.
  ///
  /// Unknown statuses leave everything untouched. `changed` is false when the
  /// status repeats what is already shown, so idle polls push nothing.
  pub fn reduce(&mut self, status: GameStatus) -> Effects {
    let before = self.clone();
    let mut effects = Effects::default();

    match status.status {
      StatusKind::Idle => {
        self.message = "Ready to start a new game".into();
        self.start = StartControl::ready("Start Game");
        self.panel = Panel::Hidden;
        self.completed_game = None;
        effects.stop_polling = true;
      }
      StatusKind::Starting | StatusKind::Initializing => {
        self.message = "Game is starting...".into();
        self.start = StartControl::locked("Starting...");
        self.panel = Panel::Hidden;
        self.completed_game = None;
      }
      StatusKind::Running => {
        self.message = "Game is running...".into();
        self.start = StartControl::locked("Game in Progress");
        self.completed_game = None;
        self.panel = match (status.pending_input, &self.panel) {
          (None, _) => Panel::Hidden,
          (
            Some(pending),
            Panel::AwaitingConfirmation {
              submitted,
              confirmed_after,
            },
          ) if *submitted == pending && confirmed_after.is_none_or(|c| self.applied_seq <= c) => {
            self.panel.clone()
          }
          (Some(pending), _) => Panel::Prompt {
            form: forms::render_form(&pending),
            pending,
          },
        };
      }
      StatusKind::Completed => {
        self.message = "Game completed!".into();
        self.completed_game = status.game_id;
        self.start = StartControl::ready("Start Another Game");
        self.panel = Panel::Hidden;
        effects.stop_polling = true;
        effects.refresh_logs = true;
      }
      StatusKind::Error => {
        self.message = format!(
          "Error: {}",
          status.error.as_deref().unwrap_or("Unknown error")
        );
        self.start = StartControl::ready("Try Again");
        self.panel = Panel::Hidden;
        self.completed_game = None;
        effects.stop_polling = true;
      }
      StatusKind::Unknown => {
        tracing::debug!("ignoring unrecognized game status");
        return Effects::default();
      }
    }

    self.status = status.status;
    self.current_action = if status.status == StatusKind::Running {
      status.current_action.filter(|a| !a.trim().is_empty())
    } else {
      None
    };
    effects.changed = *self != before;
    effects
  }

  /// Checks `submission` against the shown prompt and hides the panel.
  ///
  /// Returns the action string to send and the request it answers.
  pub fn begin_submit(
    &mut self,
    submission: FormSubmission,
  ) -> Result<Option<(String, PendingInput)>, ValidationError> {
    let Panel::Prompt { pending, .. } = &self.panel else {
      return Ok(None);
    };
    let action = forms::resolve_action(&pending.request, submission)?;
    let submitted = pending.clone();
    self.panel = Panel::AwaitingConfirmation {
      submitted: submitted.clone(),
      confirmed_after: None,
    };
    Ok(Some((action, submitted)))
  }

  /// Records that the server accepted the answer to `submitted`; polls
  /// numbered above `seq` were sent after it did.
  pub fn confirm_submit(&mut self, submitted: &PendingInput, seq: u64) {
    if let Panel::AwaitingConfirmation {
      submitted: s,
      confirmed_after,
    } = &mut self.panel
      && s == submitted
    {
      *confirmed_after = Some(seq);
    }
  }

  /// Brings the prompt back after a failed submission, unless the server has
  /// already moved on.
  pub fn restore_prompt(&mut self, submitted: PendingInput) -> bool {
    match &self.panel {
      Panel::AwaitingConfirmation { submitted: s, .. } if *s == submitted => {
        self.panel = Panel::Prompt {
          form: forms::render_form(&submitted),
          pending: submitted,
        };
        true
      }
      _ => false,
    }
  }

  pub fn form(&self) -> Option<&InputForm> {
    match &self.panel {
      Panel::Prompt { form, .. } => Some(form),
      _ => None,
    }
  }

  pub fn awaiting_confirmation(&self) -> bool {
    matches!(self.panel, Panel::AwaitingConfirmation { .. })
  }

  pub fn viewer_link(&self) -> Option<String> {
    self
      .completed_game
      .as_ref()
      .map(|id| format!("/viewer?game={id}"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{InputRequest, MissionActionData, VoteData};

  fn vote_pending(team: &[&str]) -> PendingInput {
    PendingInput {
      player: "Alice".into(),
      request: InputRequest::Vote(VoteData {
        proposed_team: team.iter().map(|s| s.to_string()).collect(),
        role_info: "You are a Loyal Servant of Arthur.".into(),
      }),
    }
  }

  fn running_with(pending: Option<PendingInput>) -> GameStatus {
    GameStatus {
      status: StatusKind::Running,
      current_action: Some("Voting on Bob's team".into()),
      pending_input: pending,
      ..Default::default()
    }
  }

  #[test]
  fn idle_enables_start_and_stops_polling() {
    let mut s = SessionState {
      start: StartControl::locked("Starting..."),
      ..Default::default()
    };
    let fx = s.reduce(GameStatus::with_status(StatusKind::Idle));
    assert!(fx.stop_polling);
    assert!(!fx.refresh_logs);
    assert_eq!(s.start, StartControl::ready("Start Game"));
    assert_eq!(s.panel, Panel::Hidden);
  }

  #[test]
  fn completed_links_viewer_and_refreshes_logs() {
    let mut s = SessionState::default();
    let fx = s.reduce(GameStatus {
      status: StatusKind::Completed,
      game_id: Some("g42".into()),
      ..Default::default()
    });
    assert!(fx.stop_polling && fx.refresh_logs);
    assert_eq!(s.viewer_link().as_deref(), Some("/viewer?game=g42"));
    assert_eq!(s.start.label, "Start Another Game");
    assert!(s.start.enabled);
  }

  #[test]
  fn error_shows_message_and_try_again() {
    let mut s = SessionState::default();
    let fx = s.reduce(GameStatus {
      status: StatusKind::Error,
      error: Some("DeepSeek API key missing".into()),
      ..Default::default()
    });
    assert!(fx.stop_polling);
    assert_eq!(s.message, "Error: DeepSeek API key missing");
    assert_eq!(s.start, StartControl::ready("Try Again"));

    s.reduce(GameStatus::with_status(StatusKind::Error));
    assert_eq!(s.message, "Error: Unknown error");
  }

  #[test]
  fn starting_keeps_polling_and_hides_panel() {
    let mut s = SessionState::default();
    let fx = s.reduce(GameStatus::with_status(StatusKind::Initializing));
    assert!(!fx.stop_polling);
    assert_eq!(s.message, "Game is starting...");
    assert_eq!(s.panel, Panel::Hidden);
  }

  #[test]
  fn unknown_status_changes_nothing() {
    let mut s = SessionState::default();
    s.reduce(running_with(Some(vote_pending(&["Bob", "Eve"]))));
    let before = s.clone();
    let fx = s.reduce(GameStatus::with_status(StatusKind::Unknown));
    assert_eq!(fx, Effects::default());
    assert_eq!(s, before);
  }

  #[test]
  fn repeated_status_is_not_a_change() {
    let mut s = SessionState::default();
    assert!(s.reduce(running_with(Some(vote_pending(&["Bob"])))).changed);
    assert!(!s.reduce(running_with(Some(vote_pending(&["Bob"])))).changed);
    assert!(s.reduce(running_with(None)).changed);
  }

  #[test]
  fn running_renders_prompt_and_action_text() {
    let mut s = SessionState::default();
    s.reduce(running_with(Some(vote_pending(&["Bob", "Eve"]))));
    assert_eq!(s.current_action.as_deref(), Some("Voting on Bob's team"));
    let form = s.form().unwrap();
    assert_eq!(form.player, "Alice");

    s.reduce(running_with(None));
    assert_eq!(s.panel, Panel::Hidden);
  }

  #[test]
  fn submitted_prompt_stays_hidden_until_server_moves_on() {
    let mut s = SessionState::default();
    let pending = vote_pending(&["Bob", "Eve"]);
    s.reduce(running_with(Some(pending.clone())));

    let (action, submitted) = s
      .begin_submit(FormSubmission::Choice("APPROVE".into()))
      .unwrap()
      .unwrap();
    assert_eq!(action, "APPROVE");
    assert_eq!(submitted, pending);
    assert!(s.awaiting_confirmation());

    // a poll that still reports the answered request must not re-open it
    s.reduce(running_with(Some(pending.clone())));
    assert!(s.awaiting_confirmation());

    // the next prompt is shown right away
    let next = PendingInput {
      player: "Alice".into(),
      request: InputRequest::MissionAction(MissionActionData::default()),
    };
    s.reduce(running_with(Some(next)));
    assert!(s.form().is_some());
  }

  #[test]
  fn identical_follow_up_request_reopens_after_confirmation() {
    let mut s = SessionState::default();
    let pending = PendingInput {
      player: "Alice".into(),
      request: InputRequest::MissionAction(MissionActionData::default()),
    };
    s.applied_seq = 1;
    s.reduce(running_with(Some(pending.clone())));
    let (_, submitted) = s
      .begin_submit(FormSubmission::Choice("SUCCESS".into()))
      .unwrap()
      .unwrap();

    // the server took the answer when polls up to 3 had been handed out
    s.confirm_submit(&submitted, 3);

    // poll 3 was sent before the answer landed: still the old request
    s.applied_seq = 3;
    s.reduce(running_with(Some(pending.clone())));
    assert!(s.awaiting_confirmation());

    // poll 4 went out afterwards, so the same request is a fresh one
    s.applied_seq = 4;
    let fx = s.reduce(running_with(Some(pending)));
    assert!(fx.changed);
    assert!(s.form().is_some());
  }

  #[test]
  fn confirmation_for_another_request_is_ignored() {
    let mut s = SessionState::default();
    s.reduce(running_with(Some(vote_pending(&["Bob"]))));
    s.begin_submit(FormSubmission::Choice("APPROVE".into()))
      .unwrap()
      .unwrap();
    s.confirm_submit(&vote_pending(&["Eve"]), 7);
    assert!(matches!(
      s.panel,
      Panel::AwaitingConfirmation {
        confirmed_after: None,
        ..
      }
    ));
  }

  #[test]
  fn invalid_submission_leaves_prompt_visible() {
    let mut s = SessionState::default();
    s.reduce(running_with(Some(vote_pending(&["Bob"]))));
    let err = s
      .begin_submit(FormSubmission::Choice("MAYBE".into()))
      .unwrap_err();
    assert_eq!(err, ValidationError::InvalidChoice("MAYBE".into()));
    assert!(s.form().is_some());
  }

  #[test]
  fn restore_brings_back_the_same_prompt() {
    let mut s = SessionState::default();
    let pending = vote_pending(&["Bob"]);
    s.reduce(running_with(Some(pending.clone())));
    let (_, submitted) = s
      .begin_submit(FormSubmission::Choice("REJECT".into()))
      .unwrap()
      .unwrap();
    assert!(s.restore_prompt(submitted));
    assert!(s.form().is_some());

    // nothing to restore once the server cleared the prompt
    s.reduce(running_with(None));
    assert!(!s.restore_prompt(pending));
  }

  #[test]
  fn submit_without_prompt_is_noop() {
    let mut s = SessionState::default();
    assert_eq!(
      s.begin_submit(FormSubmission::Choice("APPROVE".into())),
      Ok(None)
    );
  }
}
