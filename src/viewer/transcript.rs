//! Plain-text renderings of a game log.

use std::fmt::Write;

use crate::models::{GameLog, MissionOutcome};

fn rule(out: &mut String, ch: char) {
  out.extend(std::iter::repeat_n(ch, 80));
  out.push('\n');
}

fn verdict(ok: bool, yes: &'static str, no: &'static str) -> &'static str {
  if ok { yes } else { no }
}

/// Full transcript in the same layout the game server writes next to its
/// JSON logs.
pub fn transcript(log: &GameLog) -> String {
  let mut out = String::new();
  // writing into a String cannot fail
  let _ = write_transcript(&mut out, log);
  out
}

fn write_transcript(out: &mut String, log: &GameLog) -> std::fmt::Result {
  rule(out, '=');
  writeln!(out, "AVALON GAME LOG")?;
  rule(out, '=');
  writeln!(out)?;
  writeln!(out, "Game ID: {}", log.game_id)?;
  writeln!(out, "Timestamp: {}", log.timestamp)?;
  writeln!(out)?;

  rule(out, '-');
  writeln!(out, "PLAYERS")?;
  rule(out, '-');
  for p in &log.players {
    writeln!(
      out,
      "{}: {} ({}) - AI: {} ({})",
      p.name, p.role, p.faction, p.ai_type, p.ai_config
    )?;
  }
  writeln!(out)?;

  for round in &log.rounds {
    rule(out, '-');
    writeln!(
      out,
      "ROUND {} (Team size: {})",
      round.round_number, round.team_size
    )?;
    rule(out, '-');

    for p in &round.proposals {
      writeln!(out, "\nProposal by {}:", p.leader)?;
      writeln!(out, "  Initial team: {}", p.initial_team.join(", "))?;
      if !p.discussion.is_empty() {
        writeln!(out, "  Discussion:")?;
        for c in &p.discussion {
          writeln!(out, "    {}: {}", c.player, c.comment)?;
        }
      }
      writeln!(out, "  Final team: {}", p.effective_team().join(", "))?;
      if !p.forced_mission {
        writeln!(out, "  Votes:")?;
        for (player, vote) in &p.votes {
          writeln!(out, "    {}: {}", player, verdict(*vote, "APPROVE", "REJECT"))?;
        }
      }
      write!(
        out,
        "  Result: {}",
        verdict(p.approved.unwrap_or(false), "APPROVED", "REJECTED")
      )?;
      if p.forced_mission {
        write!(out, " (FORCED MISSION)")?;
      }
      writeln!(out)?;
    }

    if let Some(m) = &round.mission {
      writeln!(out, "\nMission Execution:")?;
      for (player, action) in &m.actions {
        writeln!(out, "  {}: {}", player, verdict(*action, "SUCCESS", "FAIL"))?;
      }
      writeln!(out, "  Result: {}", verdict(m.success, "SUCCESS", "FAIL"))?;
    }
    writeln!(out)?;
  }

  if let Some(a) = &log.assassination {
    rule(out, '-');
    writeln!(out, "ASSASSINATION PHASE")?;
    rule(out, '-');
    writeln!(out, "Assassin: {}", a.assassin)?;
    writeln!(out, "Target: {}", a.target)?;
    writeln!(out, "Target was Merlin: {}", a.target_was_merlin)?;
    writeln!(out, "Result: {}", a.result)?;
    writeln!(out)?;
  }

  rule(out, '=');
  writeln!(out, "FINAL RESULT")?;
  rule(out, '=');
  match &log.final_result {
    Some(r) => {
      let results: Vec<String> = r.mission_results.iter().map(|m| m.to_string()).collect();
      let count = |want: MissionOutcome| {
        r.mission_results.iter().filter(|m| **m == want).count() as u32
      };
      let good = r.good_wins.unwrap_or_else(|| count(MissionOutcome::Success));
      let evil = r.evil_wins.unwrap_or_else(|| count(MissionOutcome::Fail));
      writeln!(out, "Winner: {}", r.winner)?;
      writeln!(out, "Mission Results: {}", results.join(", "))?;
      writeln!(out, "Good Wins: {good} | Evil Wins: {evil}")?;
    }
    None => writeln!(out, "Game did not finish.")?,
  }
  Ok(())
}

/// Round-by-round recap: every proposal, its votes and the mission outcome.
pub fn history_summary(log: &GameLog) -> String {
  if log.rounds.is_empty() {
    return "No previous rounds.".to_string();
  }

  let mut lines = vec!["PREVIOUS ROUNDS:".to_string()];
  for round in &log.rounds {
    lines.push(format!("\n--- Round {} ---", round.round_number));
    for (idx, p) in round.proposals.iter().enumerate() {
      let approved = p.approved.unwrap_or(false);
      lines.push(format!(
        "Proposal {} by {}: {}",
        idx + 1,
        p.leader,
        p.effective_team().join(", ")
      ));
      if !p.forced_mission {
        let pick = |want: bool| {
          p.votes
            .iter()
            .filter(|(_, v)| *v == want)
            .map(|(n, _)| n.as_str())
            .collect::<Vec<_>>()
            .join(", ")
        };
        lines.push(format!(
          "  Votes: APPROVE=[{}], REJECT=[{}]",
          pick(true),
          pick(false)
        ));
      }
      lines.push(format!(
        "  Result: {}",
        verdict(approved, "APPROVED", "REJECTED")
      ));

      if let Some(m) = round.mission.as_ref().filter(|_| approved || p.forced_mission) {
        let ok = m.actions.iter().filter(|(_, a)| *a).count();
        lines.push(format!("  Mission Team: {}", m.team.join(", ")));
        lines.push(format!(
          "  Mission Actions: {} SUCCESS, {} FAIL",
          ok,
          m.actions.len() - ok
        ));
        lines.push(format!(
          "  Mission Result: {}",
          verdict(m.success, "SUCCESS", "FAIL")
        ));
      }
    }
  }
  lines.join("\n")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::viewer::tests::sample_log;

  #[test]
  fn transcript_covers_every_section() {
    let text = transcript(&sample_log());
    assert!(text.starts_with(&"=".repeat(80)));
    assert!(text.contains("Game ID: 20250105_143045"));
    assert!(text.contains("Bob: Assassin (Evil) - AI: DeepSeekAPI (deepseek-chat)"));
    assert!(text.contains("ROUND 2 (Team size: 3)"));
    assert!(text.contains("    Bob: REJECT"));
    assert!(text.contains("  Result: REJECTED (FORCED MISSION)"));
    assert!(text.contains("Mission Results: SUCCESS, FAIL"));
    assert!(text.contains("Good Wins: 1 | Evil Wins: 1"));
    assert!(!text.contains("ASSASSINATION PHASE"));
  }

  #[test]
  fn forced_proposal_has_no_vote_block() {
    let text = transcript(&sample_log());
    let forced = text.split("ROUND 2").nth(1).unwrap();
    assert!(!forced.contains("  Votes:"));
  }

  #[test]
  fn history_summary_lists_votes_and_missions() {
    let summary = history_summary(&sample_log());
    assert!(summary.starts_with("PREVIOUS ROUNDS:"));
    assert!(summary.contains("Votes: APPROVE=[Alice, Charlie], REJECT=[Bob]"));
    assert!(summary.contains("Mission Actions: 2 SUCCESS, 1 FAIL"));
  }

  #[test]
  fn history_summary_of_empty_game() {
    let mut log = sample_log();
    log.rounds.clear();
    assert_eq!(history_summary(&log), "No previous rounds.");
  }
}
