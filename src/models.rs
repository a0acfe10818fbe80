use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::forms::FormSubmission;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatusKind {
  #[default]
  Idle,
  Starting,
  Initializing,
  Running,
  Completed,
  Error,
  // Anything the server adds later lands here and is ignored by the reducer
  #[serde(other)]
  Unknown,
}

/// Snapshot returned by `GET /api/game_status`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct GameStatus {
  #[serde(default)]
  pub status: StatusKind,
  #[serde(default)]
  pub current_action: Option<String>,
  #[serde(default)]
  pub pending_input: Option<PendingInput>,
  #[serde(default)]
  pub game_id: Option<String>,
  #[serde(default)]
  pub error: Option<String>,
}

#[cfg(test)]
impl GameStatus {
  pub fn with_status(status: StatusKind) -> Self {
    Self {
      status,
      ..Default::default()
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InputKind {
  Discussion,
  TeamProposal,
  LeaderFinalProposal,
  Vote,
  MissionAction,
  Assassination,
}

/// A human seat the server is currently waiting on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawPendingInput")]
pub struct PendingInput {
  pub player: String,
  pub request: InputRequest,
}

#[derive(Deserialize)]
struct RawPendingInput {
  player: String,
  #[serde(rename = "type")]
  kind: InputKind,
  #[serde(default)]
  data: serde_json::Value,
}

impl TryFrom<RawPendingInput> for PendingInput {
  type Error = serde_json::Error;

  fn try_from(raw: RawPendingInput) -> Result<Self, Self::Error> {
    let data = match raw.data {
      serde_json::Value::Null => serde_json::Value::Object(Default::default()),
      other => other,
    };
    let request = match raw.kind {
      InputKind::Discussion => InputRequest::Discussion(serde_json::from_value(data)?),
      InputKind::TeamProposal => InputRequest::TeamProposal(serde_json::from_value(data)?),
      InputKind::LeaderFinalProposal => {
        InputRequest::LeaderFinalProposal(serde_json::from_value(data)?)
      }
      InputKind::Vote => InputRequest::Vote(serde_json::from_value(data)?),
      InputKind::MissionAction => InputRequest::MissionAction(serde_json::from_value(data)?),
      InputKind::Assassination => InputRequest::Assassination(serde_json::from_value(data)?),
    };
    Ok(Self {
      player: raw.player,
      request,
    })
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputRequest {
  Discussion(DiscussionData),
  TeamProposal(TeamProposalData),
  LeaderFinalProposal(LeaderFinalData),
  Vote(VoteData),
  MissionAction(MissionActionData),
  Assassination(AssassinationData),
}

impl InputRequest {
  pub fn kind(&self) -> InputKind {
    match self {
      Self::Discussion(_) => InputKind::Discussion,
      Self::TeamProposal(_) => InputKind::TeamProposal,
      Self::LeaderFinalProposal(_) => InputKind::LeaderFinalProposal,
      Self::Vote(_) => InputKind::Vote,
      Self::MissionAction(_) => InputKind::MissionAction,
      Self::Assassination(_) => InputKind::Assassination,
    }
  }

  pub fn role_info(&self) -> &str {
    match self {
      Self::Discussion(d) => &d.role_info,
      Self::TeamProposal(d) => &d.role_info,
      Self::LeaderFinalProposal(d) => &d.role_info,
      Self::Vote(d) => &d.role_info,
      Self::MissionAction(d) => &d.role_info,
      Self::Assassination(d) => &d.role_info,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct DiscussionData {
  #[serde(default)]
  pub proposed_team: Vec<String>,
  #[serde(default)]
  pub role_info: String,
  #[serde(default)]
  pub game_state: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TeamProposalData {
  pub team_size: usize,
  pub player_names: Vec<String>,
  #[serde(default)]
  pub role_info: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct LeaderFinalData {
  pub team_size: usize,
  pub player_names: Vec<String>,
  #[serde(default)]
  pub initial_team: Vec<String>,
  #[serde(default)]
  pub role_info: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct VoteData {
  #[serde(default)]
  pub proposed_team: Vec<String>,
  #[serde(default)]
  pub role_info: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct MissionActionData {
  #[serde(default)]
  pub role_info: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AssassinationData {
  pub good_players: Vec<String>,
  #[serde(default)]
  pub role_info: String,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserMode {
  Play,
  #[default]
  Watch,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StartMode {
  #[default]
  Quick,
  Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AiBackend {
  Ollama,
  Deepseek,
  Local,
}

impl AiBackend {
  pub fn default_model(self) -> Option<&'static str> {
    match self {
      Self::Ollama => Some("deepseek-r1"),
      Self::Deepseek => Some("deepseek-chat"),
      Self::Local => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
  pub backend: AiBackend,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub model: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub api_key: Option<String>,
}

/// Body of `POST /api/start_game`.
///
/// The two variants serialize to the two request shapes the game server has
/// accepted over time; the caller picks one explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GameConfig {
  Seat {
    user_mode: UserMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
  },
  Backend {
    mode: StartMode,
    ai_config: AiConfig,
  },
}

impl GameConfig {
  /// Blank strings coming from form fields mean "not provided".
  pub fn normalized(self) -> Self {
    fn blank_to_none(v: Option<String>) -> Option<String> {
      v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    }
    match self {
      Self::Seat { user_mode, api_key } => Self::Seat {
        user_mode,
        api_key: blank_to_none(api_key),
      },
      Self::Backend { mode, ai_config } => {
        let model = blank_to_none(ai_config.model)
          .or_else(|| ai_config.backend.default_model().map(str::to_string));
        Self::Backend {
          mode,
          ai_config: AiConfig {
            backend: ai_config.backend,
            model,
            api_key: blank_to_none(ai_config.api_key),
          },
        }
      }
    }
  }
}

#[derive(Debug, Serialize)]
pub struct SubmitActionBody<'a> {
  pub action: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ServerError {
  pub error: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct OllamaStatus {
  pub available: bool,
  #[serde(default)]
  pub models: Vec<String>,
  #[serde(default)]
  pub error: Option<String>,
}

// ---- persisted game logs ----

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Winner {
  Good,
  Evil,
  #[default]
  #[serde(other)]
  Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum MissionOutcome {
  Success,
  Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum Faction {
  Good,
  Evil,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogSummary {
  pub game_id: String,
  #[serde(default)]
  pub winner: Winner,
  #[serde(default)]
  pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct LogList {
  #[serde(default)]
  pub logs: Vec<LogSummary>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GameLog {
  pub game_id: String,
  #[serde(default)]
  pub timestamp: String,
  #[serde(default)]
  pub players: Vec<PlayerRecord>,
  #[serde(default)]
  pub rounds: Vec<Round>,
  #[serde(default)]
  pub final_result: Option<FinalResult>,
  #[serde(default)]
  pub assassination: Option<Assassination>,
}

impl GameLog {
  pub fn winner(&self) -> Winner {
    self
      .final_result
      .as_ref()
      .map(|r| r.winner)
      .unwrap_or_default()
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerRecord {
  pub name: String,
  pub role: String,
  pub faction: Faction,
  #[serde(default)]
  pub ai_type: String,
  #[serde(default)]
  pub ai_config: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Round {
  pub round_number: u32,
  pub team_size: usize,
  #[serde(default)]
  pub proposals: Vec<Proposal>,
  #[serde(default)]
  pub mission: Option<Mission>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Proposal {
  pub leader: String,
  #[serde(default)]
  pub initial_team: Vec<String>,
  #[serde(default)]
  pub forced_mission: bool,
  #[serde(default)]
  pub leader_reasoning: Option<String>,
  #[serde(default)]
  pub discussion: Vec<Comment>,
  #[serde(default)]
  pub leader_final_reasoning: Option<String>,
  #[serde(default)]
  pub final_team: Vec<String>,
  #[serde(default, deserialize_with = "ordered_flags::deserialize")]
  pub votes: Vec<(String, bool)>,
  #[serde(default)]
  pub approved: Option<bool>,
}

impl Proposal {
  /// Team that actually went to the vote, falling back to the opening pick.
  pub fn effective_team(&self) -> &[String] {
    if self.final_team.is_empty() {
      &self.initial_team
    } else {
      &self.final_team
    }
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Comment {
  pub player: String,
  #[serde(default)]
  pub comment: String,
  #[serde(default)]
  pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Mission {
  #[serde(default)]
  pub team: Vec<String>,
  #[serde(default, deserialize_with = "ordered_flags::deserialize")]
  pub actions: Vec<(String, bool)>,
  pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FinalResult {
  #[serde(default)]
  pub winner: Winner,
  #[serde(default)]
  pub mission_results: Vec<MissionOutcome>,
  #[serde(default)]
  pub good_wins: Option<u32>,
  #[serde(default)]
  pub evil_wins: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Assassination {
  pub assassin: String,
  pub target: String,
  #[serde(default)]
  pub target_was_merlin: bool,
  #[serde(default)]
  pub result: String,
}

/// `{player: bool}` objects decoded in document order.
mod ordered_flags {
  use serde::Deserializer;
  use serde::de::{self, MapAccess, Visitor};
  use std::fmt;

  pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, bool)>, D::Error>
  where
    D: Deserializer<'de>,
  {
    struct FlagsVisitor;

    impl<'de> Visitor<'de> for FlagsVisitor {
      type Value = Vec<(String, bool)>;

      fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object mapping player names to booleans")
      }

      fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Vec::new())
      }

      fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
      where
        M: MapAccess<'de>,
      {
        let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((name, flag)) = map.next_entry::<String, bool>()? {
          out.push((name, flag));
        }
        Ok(out)
      }
    }

    deserializer.deserialize_any(FlagsVisitor)
  }
}

// ---- browser <-> server messages ----

#[derive(Debug, Clone)]
pub enum InternalMsg {
  StateUpdated,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientAction {
  Start { config: GameConfig },
  Submit { submission: FormSubmission },
  Refresh,
}
