//! Read-only views over finished game logs.

pub mod stats;
pub mod transcript;

use chrono::{DateTime, NaiveDateTime};

use crate::models::{Assassination, GameLog, LogList, Mission, MissionOutcome, Proposal, Round};
use stats::PlayerSummary;

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
  NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
    .ok()
    .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.naive_local()))
}

/// `Jan 5, 2025, 02:30:45 PM`; unparseable input comes back as is.
pub fn format_timestamp(raw: &str) -> String {
  match parse_timestamp(raw) {
    Some(t) => t.format("%b %-d, %Y, %I:%M:%S %p").to_string(),
    None => raw.to_string(),
  }
}

/// Like [`format_timestamp`] without seconds, for game lists.
pub fn format_timestamp_short(raw: &str) -> String {
  match parse_timestamp(raw) {
    Some(t) => t.format("%b %-d, %Y, %I:%M %p").to_string(),
    None => raw.to_string(),
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
  pub value: String,
  pub label: String,
  pub selected: bool,
  pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameSelector {
  pub options: Vec<SelectOption>,
}

impl GameSelector {
  pub fn build(list: &LogList, current: Option<&str>) -> Self {
    if list.logs.is_empty() {
      return Self {
        options: vec![SelectOption {
          value: String::new(),
          label: "No games available".into(),
          selected: true,
          disabled: true,
        }],
      };
    }

    let known = current.filter(|id| list.logs.iter().any(|l| l.game_id == *id));
    let mut options = Vec::with_capacity(list.logs.len() + 1);
    options.push(SelectOption {
      value: String::new(),
      label: "Select a game...".into(),
      selected: known.is_none(),
      disabled: false,
    });
    options.extend(list.logs.iter().map(|l| SelectOption {
      value: l.game_id.clone(),
      label: format!(
        "{} - {} ({})",
        l.game_id,
        l.winner,
        l.timestamp.as_deref().map(format_timestamp).unwrap_or_default()
      ),
      selected: known == Some(l.game_id.as_str()),
      disabled: false,
    }));
    Self { options }
  }

  pub fn is_empty(&self) -> bool {
    self.options.iter().all(|o| o.value.is_empty())
  }
}

/// A colored label; `class` is `success` or `fail`.
#[derive(Debug, Clone, PartialEq)]
pub struct Badge {
  pub label: String,
  pub class: &'static str,
}

impl Badge {
  fn new(ok: bool, yes: &str, no: &str) -> Self {
    Self {
      label: (if ok { yes } else { no }).to_string(),
      class: if ok { "success" } else { "fail" },
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flag {
  pub player: String,
  pub positive: bool,
  pub label: &'static str,
}

fn flags(entries: &[(String, bool)], yes: &'static str, no: &'static str) -> Vec<Flag> {
  entries
    .iter()
    .map(|(player, positive)| Flag {
      player: player.clone(),
      positive: *positive,
      label: if *positive { yes } else { no },
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
  pub game_id: String,
  pub timestamp: String,
  pub winner: String,
  pub winner_class: String,
  pub mission_results: Vec<Badge>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerCard {
  pub name: String,
  pub role: String,
  pub faction: String,
  pub is_good: bool,
  pub ai_line: String,
  pub summary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentView {
  pub player: String,
  pub tag: Option<String>,
  pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProposalView {
  pub number: usize,
  pub leader: String,
  pub forced: bool,
  pub initial_team: Vec<String>,
  pub leader_reasoning: Option<String>,
  /// `None` for forced missions; an empty list renders "No discussion".
  pub discussion: Option<Vec<CommentView>>,
  pub leader_final_reasoning: Option<String>,
  pub votes: Vec<Flag>,
  pub result: Option<Badge>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissionView {
  pub team: Vec<String>,
  pub actions: Vec<Flag>,
  pub outcome: Badge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundView {
  pub number: u32,
  pub team_size: usize,
  pub outcome: Badge,
  pub proposals: Vec<ProposalView>,
  pub mission: Option<MissionView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssassinationView {
  pub assassin: String,
  pub target: String,
  pub target_was_merlin: &'static str,
  pub result: Badge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogView {
  pub overview: Overview,
  pub players: Vec<PlayerCard>,
  pub rounds: Vec<RoundView>,
  pub assassination: Option<AssassinationView>,
  pub recap: String,
}

fn non_blank(s: &Option<String>) -> Option<String> {
  s.as_ref().filter(|s| !s.trim().is_empty()).cloned()
}

impl LogView {
  pub fn build(log: &GameLog) -> Self {
    Self {
      overview: overview(log),
      players: log
        .players
        .iter()
        .map(|p| PlayerCard {
          name: p.name.clone(),
          role: p.role.clone(),
          faction: p.faction.to_string(),
          is_good: p.faction == crate::models::Faction::Good,
          ai_line: format!("{}: {}", p.ai_type, p.ai_config),
          summary: PlayerSummary::collect(log, &p.name).headline(),
        })
        .collect(),
      rounds: log.rounds.iter().map(round_view).collect(),
      assassination: log.assassination.as_ref().map(assassination_view),
      recap: transcript::history_summary(log),
    }
  }
}

fn overview(log: &GameLog) -> Overview {
  let winner = log.winner();
  Overview {
    game_id: log.game_id.clone(),
    timestamp: format_timestamp(&log.timestamp),
    winner: winner.to_string(),
    winner_class: winner.to_string().to_lowercase(),
    mission_results: log
      .final_result
      .as_ref()
      .map(|r| {
        r.mission_results
          .iter()
          .map(|m| Badge::new(*m == MissionOutcome::Success, "SUCCESS", "FAIL"))
          .collect()
      })
      .unwrap_or_default(),
  }
}

fn round_view(round: &Round) -> RoundView {
  RoundView {
    number: round.round_number,
    team_size: round.team_size,
    // a round without a mission record never succeeded
    outcome: Badge::new(
      round.mission.as_ref().is_some_and(|m| m.success),
      "SUCCESS",
      "FAIL",
    ),
    proposals: round
      .proposals
      .iter()
      .enumerate()
      .map(|(i, p)| proposal_view(i + 1, p))
      .collect(),
    mission: round.mission.as_ref().map(mission_view),
  }
}

fn proposal_view(number: usize, p: &Proposal) -> ProposalView {
  let forced = p.forced_mission;
  let votes = if forced {
    Vec::new()
  } else {
    flags(&p.votes, "APPROVE", "REJECT")
  };
  let result = (!votes.is_empty())
    .then(|| Badge::new(p.approved.unwrap_or(false), "APPROVED", "REJECTED"));

  ProposalView {
    number,
    leader: p.leader.clone(),
    forced,
    initial_team: p.initial_team.clone(),
    leader_reasoning: non_blank(&p.leader_reasoning),
    discussion: (!forced).then(|| {
      p.discussion
        .iter()
        .map(|c| CommentView {
          player: c.player.clone(),
          tag: non_blank(&c.tag),
          text: c.comment.clone(),
        })
        .collect()
    }),
    leader_final_reasoning: non_blank(&p.leader_final_reasoning),
    votes,
    result,
  }
}

fn mission_view(m: &Mission) -> MissionView {
  MissionView {
    team: m.team.clone(),
    actions: flags(&m.actions, "SUCCESS", "FAIL"),
    outcome: Badge::new(m.success, "SUCCESS", "FAIL"),
  }
}

fn assassination_view(a: &Assassination) -> AssassinationView {
  AssassinationView {
    assassin: a.assassin.clone(),
    target: a.target.clone(),
    target_was_merlin: if a.target_was_merlin { "Yes" } else { "No" },
    result: Badge {
      label: a.result.clone(),
      class: if a.result == "GOOD WINS" { "success" } else { "fail" },
    },
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::models::LogSummary;
  use serde_json::json;

  pub fn sample_log() -> GameLog {
    serde_json::from_value(json!({
      "game_id": "20250105_143045",
      "timestamp": "2025-01-05T14:30:45.123456",
      "players": [
        {"name": "Alice", "role": "Merlin", "faction": "Good", "ai_type": "HumanPlayer", "ai_config": ""},
        {"name": "Bob", "role": "Assassin", "faction": "Evil", "ai_type": "DeepSeekAPI", "ai_config": "deepseek-chat"},
        {"name": "Charlie", "role": "Percival", "faction": "Good", "ai_type": "DeepSeekAPI", "ai_config": "deepseek-chat"}
      ],
      "rounds": [
        {
          "round_number": 1,
          "team_size": 2,
          "proposals": [
            {
              "leader": "Alice",
              "initial_team": ["Alice", "Charlie"],
              "leader_reasoning": "I trust Charlie.",
              "discussion": [
                {"player": "Bob", "comment": "Looks fine.", "tag": "support"},
                {"player": "Charlie", "comment": "Agreed."}
              ],
              "final_team": ["Alice", "Charlie"],
              "votes": {"Alice": true, "Bob": false, "Charlie": true},
              "approved": true,
              "forced_mission": false
            }
          ],
          "mission": {"team": ["Alice", "Charlie"], "actions": {"Alice": true, "Charlie": true}, "success": true}
        },
        {
          "round_number": 2,
          "team_size": 3,
          "proposals": [
            {
              "leader": "Bob",
              "initial_team": ["Alice", "Bob", "Charlie"],
              "discussion": [{"player": "Alice", "comment": "No."}],
              "votes": {"Alice": false, "Bob": true, "Charlie": false},
              "approved": false,
              "forced_mission": true
            }
          ],
          "mission": {"team": ["Alice", "Bob", "Charlie"], "actions": {"Alice": true, "Bob": false, "Charlie": true}, "success": false}
        }
      ],
      "assassination": null,
      "final_result": {"winner": "EVIL", "mission_results": ["SUCCESS", "FAIL"], "good_wins": 1, "evil_wins": 1}
    }))
    .unwrap()
  }

  #[test]
  fn missing_assassination_hides_only_that_section() {
    let view = LogView::build(&sample_log());
    assert!(view.assassination.is_none());
    assert_eq!(view.players.len(), 3);
    assert_eq!(view.rounds.len(), 2);
    assert_eq!(view.overview.winner, "EVIL");
    assert_eq!(view.overview.winner_class, "evil");
    let labels: Vec<&str> = view
      .overview
      .mission_results
      .iter()
      .map(|b| b.label.as_str())
      .collect();
    assert_eq!(labels, ["SUCCESS", "FAIL"]);
  }

  #[test]
  fn forced_mission_suppresses_discussion_and_votes() {
    let view = LogView::build(&sample_log());
    let forced = &view.rounds[1].proposals[0];
    assert!(forced.forced);
    assert!(forced.discussion.is_none());
    assert!(forced.votes.is_empty());
    assert!(forced.result.is_none());

    let normal = &view.rounds[0].proposals[0];
    assert!(!normal.forced);
    assert_eq!(normal.discussion.as_ref().map(Vec::len), Some(2));
    assert_eq!(normal.votes.len(), 3);
    assert_eq!(normal.result.as_ref().map(|b| b.label.as_str()), Some("APPROVED"));
    assert_eq!(
      normal.discussion.as_ref().unwrap()[0].tag.as_deref(),
      Some("support")
    );
  }

  #[test]
  fn round_without_mission_shows_fail() {
    let mut log = sample_log();
    log.rounds[0].mission = None;
    let view = LogView::build(&log);
    assert_eq!(view.rounds[0].outcome.class, "fail");
    assert!(view.rounds[0].mission.is_none());
  }

  #[test]
  fn assassination_section_when_present() {
    let mut log = sample_log();
    log.assassination = Some(Assassination {
      assassin: "Bob".into(),
      target: "Charlie".into(),
      target_was_merlin: false,
      result: "GOOD WINS".into(),
    });
    let view = LogView::build(&log).assassination.unwrap();
    assert_eq!(view.target_was_merlin, "No");
    assert_eq!(view.result.class, "success");
  }

  #[test]
  fn empty_log_list_gives_single_disabled_option() {
    let selector = GameSelector::build(&LogList::default(), Some("g1"));
    assert_eq!(selector.options.len(), 1);
    let only = &selector.options[0];
    assert_eq!(only.label, "No games available");
    assert!(only.disabled);
    assert!(selector.is_empty());
  }

  #[test]
  fn selector_marks_current_game() {
    let list = LogList {
      logs: vec![
        LogSummary {
          game_id: "g2".into(),
          winner: crate::models::Winner::Good,
          timestamp: Some("2025-01-05T14:30:45".into()),
        },
        LogSummary {
          game_id: "g1".into(),
          winner: crate::models::Winner::Evil,
          timestamp: None,
        },
      ],
    };
    let selector = GameSelector::build(&list, Some("g1"));
    assert_eq!(selector.options.len(), 3);
    assert!(!selector.options[0].selected);
    assert!(selector.options[2].selected);
    assert_eq!(
      selector.options[1].label,
      "g2 - GOOD (Jan 5, 2025, 02:30:45 PM)"
    );

    let unselected = GameSelector::build(&list, Some("missing"));
    assert!(unselected.options[0].selected);
  }

  #[test]
  fn timestamps_fall_back_to_raw_text() {
    assert_eq!(format_timestamp("yesterday"), "yesterday");
    assert_eq!(
      format_timestamp_short("2025-01-05T09:05:00+00:00"),
      "Jan 5, 2025, 09:05 AM"
    );
  }
}
