//! Input forms for the human seat.
//!
//! [`render_form`] turns the server's pending request into a view model the
//! templates draw; [`resolve_action`] checks what the player picked against
//! that same request and produces the single `action` string the server wants.

use serde::Deserialize;
use thiserror::Error;

use crate::models::{InputKind, InputRequest, PendingInput};

pub const APPROVE: &str = "APPROVE";
pub const REJECT: &str = "REJECT";
pub const SUCCESS: &str = "SUCCESS";
pub const FAIL: &str = "FAIL";

const MISSION_NOTICE: &str = "Note: Good players MUST choose SUCCESS.";

/// What the browser sends back for the currently shown form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FormSubmission {
  Comment(String),
  Team(Vec<String>),
  Choice(String),
  Target(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("This form expects a {expected} response.")]
  WrongForm { expected: InputKind },
  #[error("Please select exactly {expected} players.")]
  TeamSize { expected: usize, selected: usize },
  #[error("{0} is not one of the listed players.")]
  UnknownPlayer(String),
  #[error("{0} is not a valid choice here.")]
  InvalidChoice(String),
  #[error("Please select a target.")]
  NoTarget,
  #[error("Please select exactly one target.")]
  MultipleTargets,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputForm {
  pub kind: InputKind,
  pub player: String,
  pub prompt: String,
  pub role_info: String,
  pub game_state: Option<String>,
  pub notice: Option<&'static str>,
  pub controls: FormControls,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormControls {
  Comment(CommentBox),
  TeamPicker(TeamPicker),
  Buttons(Vec<ActionButton>),
  TargetPicker(TargetPicker),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentBox {
  pub placeholder: &'static str,
  pub submit_label: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamPicker {
  pub team_size: usize,
  pub options: Vec<PickOption>,
  pub submit_label: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickOption {
  pub name: String,
  pub checked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionButton {
  pub label: &'static str,
  pub value: &'static str,
  pub style: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetPicker {
  pub options: Vec<String>,
  pub submit_label: &'static str,
}

impl InputForm {
  // Accessors keep the templates free of enum matching.
  pub fn comment(&self) -> Option<&CommentBox> {
    match &self.controls {
      FormControls::Comment(c) => Some(c),
      _ => None,
    }
  }

  pub fn team_picker(&self) -> Option<&TeamPicker> {
    match &self.controls {
      FormControls::TeamPicker(t) => Some(t),
      _ => None,
    }
  }

  pub fn buttons(&self) -> &[ActionButton] {
    match &self.controls {
      FormControls::Buttons(b) => b,
      _ => &[],
    }
  }

  pub fn target_picker(&self) -> Option<&TargetPicker> {
    match &self.controls {
      FormControls::TargetPicker(t) => Some(t),
      _ => None,
    }
  }
}

fn pick_options(names: &[String], checked: &[String]) -> Vec<PickOption> {
  names
    .iter()
    .map(|name| PickOption {
      name: name.clone(),
      checked: checked.contains(name),
    })
    .collect()
}

fn two_buttons(
  (yes, yes_style): (&'static str, &'static str),
  (no, no_style): (&'static str, &'static str),
) -> FormControls {
  FormControls::Buttons(vec![
    ActionButton {
      label: yes,
      value: yes,
      style: yes_style,
    },
    ActionButton {
      label: no,
      value: no,
      style: no_style,
    },
  ])
}

pub fn render_form(pending: &PendingInput) -> InputForm {
  let request = &pending.request;
  let mut game_state = None;
  let mut notice = None;

  let (prompt, controls) = match request {
    InputRequest::Discussion(d) => {
      game_state = Some(d.game_state.clone()).filter(|s| !s.is_empty());
      (
        format!(
          "Discussion Phase: What do you want to say about the proposed team ({})?",
          d.proposed_team.join(", ")
        ),
        FormControls::Comment(CommentBox {
          placeholder: "Enter your comment...",
          submit_label: "Submit Comment",
        }),
      )
    }
    InputRequest::TeamProposal(d) => (
      format!(
        "You are the Leader! Select {} players for the mission.",
        d.team_size
      ),
      FormControls::TeamPicker(TeamPicker {
        team_size: d.team_size,
        options: pick_options(&d.player_names, &[]),
        submit_label: "Propose Team",
      }),
    ),
    InputRequest::LeaderFinalProposal(d) => (
      "Final Decision: Confirm or change your team proposal.".to_string(),
      FormControls::TeamPicker(TeamPicker {
        team_size: d.team_size,
        options: pick_options(&d.player_names, &d.initial_team),
        submit_label: "Confirm Team",
      }),
    ),
    InputRequest::Vote(d) => (
      format!("Vote on the proposed team: {}", d.proposed_team.join(", ")),
      two_buttons((APPROVE, "btn-success"), (REJECT, "btn-danger")),
    ),
    InputRequest::MissionAction(_) => {
      notice = Some(MISSION_NOTICE);
      (
        "Mission Phase: Choose your action.".to_string(),
        two_buttons((SUCCESS, "btn-success"), (FAIL, "btn-danger")),
      )
    }
    InputRequest::Assassination(d) => (
      "Assassin Phase: Identify Merlin!".to_string(),
      FormControls::TargetPicker(TargetPicker {
        options: d.good_players.clone(),
        submit_label: "Assassinate",
      }),
    ),
  };

  InputForm {
    kind: request.kind(),
    player: pending.player.clone(),
    prompt,
    role_info: request.role_info().to_string(),
    game_state,
    notice,
    controls,
  }
}

/// Validates a submission against the request it answers.
///
/// Errors here never reach the network.
pub fn resolve_action(
  request: &InputRequest,
  submission: FormSubmission,
) -> Result<String, ValidationError> {
  let wrong = || ValidationError::WrongForm {
    expected: request.kind(),
  };

  match (request, submission) {
    (InputRequest::Discussion(_), FormSubmission::Comment(text)) => Ok(text),
    (InputRequest::TeamProposal(d), FormSubmission::Team(picked)) => {
      pick_team(&d.player_names, d.team_size, &picked)
    }
    (InputRequest::LeaderFinalProposal(d), FormSubmission::Team(picked)) => {
      pick_team(&d.player_names, d.team_size, &picked)
    }
    (InputRequest::Vote(_), FormSubmission::Choice(choice)) => {
      pick_choice(choice, &[APPROVE, REJECT])
    }
    (InputRequest::MissionAction(_), FormSubmission::Choice(choice)) => {
      pick_choice(choice, &[SUCCESS, FAIL])
    }
    (InputRequest::Assassination(d), FormSubmission::Target(picked)) => match picked.as_slice() {
      [] => Err(ValidationError::NoTarget),
      [one] if d.good_players.contains(one) => Ok(one.clone()),
      [one] => Err(ValidationError::UnknownPlayer(one.clone())),
      _ => Err(ValidationError::MultipleTargets),
    },
    _ => Err(wrong()),
  }
}

fn pick_team(
  player_names: &[String],
  team_size: usize,
  picked: &[String],
) -> Result<String, ValidationError> {
  if let Some(stray) = picked.iter().find(|p| !player_names.contains(p)) {
    return Err(ValidationError::UnknownPlayer(stray.clone()));
  }
  // player-list order, not click order
  let team: Vec<&str> = player_names
    .iter()
    .filter(|name| picked.contains(name))
    .map(String::as_str)
    .collect();
  if team.len() != team_size {
    return Err(ValidationError::TeamSize {
      expected: team_size,
      selected: team.len(),
    });
  }
  Ok(team.join(", "))
}

fn pick_choice(choice: String, allowed: &[&str]) -> Result<String, ValidationError> {
  if allowed.contains(&choice.as_str()) {
    Ok(choice)
  } else {
    Err(ValidationError::InvalidChoice(choice))
  }
}
