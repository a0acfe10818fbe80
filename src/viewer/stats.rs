use std::collections::BTreeMap;
use std::fmt;

use crate::models::{Faction, GameLog, Winner};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProposalRecord {
  pub round: u32,
  pub approved: bool,
}

/// What one player did over a single game.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerSummary {
  pub missions_on: Vec<u32>,
  pub missions_succeeded: Vec<u32>,
  pub missions_failed: Vec<u32>,
  pub proposals_made: Vec<ProposalRecord>,
  pub votes_approve: usize,
  pub votes_reject: usize,
  pub comments: Vec<(u32, String)>,
}

impl PlayerSummary {
  pub fn collect(log: &GameLog, player: &str) -> Self {
    let mut s = Self::default();
    for round in &log.rounds {
      let n = round.round_number;
      for p in &round.proposals {
        if p.leader == player {
          s.proposals_made.push(ProposalRecord {
            round: n,
            approved: p.approved.unwrap_or(false),
          });
        }
        if let Some((_, approve)) = p.votes.iter().find(|(name, _)| name == player) {
          if *approve {
            s.votes_approve += 1;
          } else {
            s.votes_reject += 1;
          }
        }
        s.comments.extend(
          p.discussion
            .iter()
            .filter(|c| c.player == player)
            .map(|c| (n, c.comment.clone())),
        );
      }
      if let Some(m) = &round.mission {
        if m.team.iter().any(|t| t == player) {
          s.missions_on.push(n);
          if m.success {
            s.missions_succeeded.push(n);
          } else {
            s.missions_failed.push(n);
          }
        }
      }
    }
    s
  }

  /// One-line digest for player cards.
  pub fn headline(&self) -> String {
    let missions = if self.missions_on.is_empty() {
      "no missions".to_string()
    } else {
      format!(
        "missions {} ({} succeeded, {} failed)",
        join_rounds(&self.missions_on),
        self.missions_succeeded.len(),
        self.missions_failed.len()
      )
    };
    let proposals = if self.proposals_made.is_empty() {
      "no proposals".to_string()
    } else {
      let rounds: Vec<u32> = self.proposals_made.iter().map(|p| p.round).collect();
      format!(
        "proposals in rounds {} ({} approved)",
        join_rounds(&rounds),
        self.proposals_made.iter().filter(|p| p.approved).count()
      )
    };
    format!(
      "{}, {}, votes {} approve / {} reject, {} comments",
      missions,
      proposals,
      self.votes_approve,
      self.votes_reject,
      self.comments.len()
    )
  }
}

fn join_rounds(rounds: &[u32]) -> String {
  rounds
    .iter()
    .map(u32::to_string)
    .collect::<Vec<_>>()
    .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerRecordStats {
  pub games: usize,
  pub wins: usize,
}

/// Win counts across many games, by faction and by seat name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WinStats {
  pub games: usize,
  pub good_wins: usize,
  pub evil_wins: usize,
  pub undecided: usize,
  pub players: BTreeMap<String, PlayerRecordStats>,
}

impl WinStats {
  pub fn collect<'a>(logs: impl IntoIterator<Item = &'a GameLog>) -> Self {
    let mut stats = Self::default();
    for log in logs {
      stats.games += 1;
      let winner = log.winner();
      match winner {
        Winner::Good => stats.good_wins += 1,
        Winner::Evil => stats.evil_wins += 1,
        Winner::Unknown => stats.undecided += 1,
      }
      for p in &log.players {
        let entry = stats.players.entry(p.name.clone()).or_default();
        entry.games += 1;
        let won = matches!(
          (winner, p.faction),
          (Winner::Good, Faction::Good) | (Winner::Evil, Faction::Evil)
        );
        if won {
          entry.wins += 1;
        }
      }
    }
    stats
  }

  fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
      0.0
    } else {
      part as f64 * 100.0 / whole as f64
    }
  }
}

impl fmt::Display for WinStats {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "=== Evaluation Summary ({} games) ===", self.games)?;
    for (name, p) in &self.players {
      writeln!(
        f,
        "{}: {}/{} wins ({:.2}%)",
        name,
        p.wins,
        p.games,
        Self::rate(p.wins, p.games)
      )?;
    }
    writeln!(f)?;
    writeln!(
      f,
      "Good team win rate: {:.2}%",
      Self::rate(self.good_wins, self.games)
    )?;
    write!(
      f,
      "Evil team win rate: {:.2}%",
      Self::rate(self.evil_wins, self.games)
    )?;
    if self.undecided > 0 {
      write!(f, "\nUnfinished games: {}", self.undecided)?;
    }
    Ok(())
  }
}
