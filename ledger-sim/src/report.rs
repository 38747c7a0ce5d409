//! Session output files
//!
//! Level 4 - Utilities

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::session::SessionReport;

const RULE: &str = "============================================================";
const THIN: &str = "------------------------------------------------------------";

/// Directory for one session under `base`
pub fn session_dir(base: &Path, session_id: &str) -> PathBuf {
    base.join(format!("session_{session_id}"))
}

/// Write a game's narrative as `game_NNN.log`
pub fn write_game_log(dir: &Path, game_number: usize, lines: &[String]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(format!("game_{game_number:03}.log"));
    std::fs::write(&path, lines.join("\n"))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Write `session_summary.txt` and `session_data.json`
pub fn write_session_report(dir: &Path, report: &SessionReport) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let summary_path = dir.join("session_summary.txt");
    std::fs::write(&summary_path, format_summary(report))
        .with_context(|| format!("Failed to write {}", summary_path.display()))?;

    let json_path = dir.join("session_data.json");
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&json_path, json)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;

    Ok(())
}

fn percent(n: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        n as f64 / total as f64 * 100.0
    }
}

/// Human-readable session summary
pub fn format_summary(report: &SessionReport) -> String {
    let mut s = String::new();
    // fmt::Write for String never fails
    if write_summary(&mut s, report).is_err() {
        s.clear();
    }
    s
}

fn write_summary(s: &mut String, report: &SessionReport) -> fmt::Result {
    let games = report.games_played;

    writeln!(s, "{RULE}\nTRAINING SESSION SUMMARY\n{RULE}\n")?;
    writeln!(s, "Session ID: {}", report.session_id)?;
    writeln!(s, "Timestamp: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(s, "Games Played: {games}\n")?;

    writeln!(s, "{THIN}\nOVERALL RESULTS\n{THIN}")?;
    writeln!(
        s,
        "Player 1 Wins: {} ({:.1}%)",
        report.p1_wins,
        percent(report.p1_wins, games)
    )?;
    writeln!(
        s,
        "Player 2 Wins: {} ({:.1}%)",
        report.p2_wins,
        percent(report.p2_wins, games)
    )?;
    writeln!(s, "Ties: {} ({:.1}%)", report.ties, percent(report.ties, games))?;
    writeln!(s, "Average Game Length: {:.1} turns\n", report.average_turns)?;

    writeln!(s, "{THIN}\nAI LEARNING PROGRESS\n{THIN}")?;
    writeln!(s, "AI 1 Final Win Rate: {:.2}%", report.ai1_win_rate * 100.0)?;
    writeln!(s, "AI 2 Final Win Rate: {:.2}%", report.ai2_win_rate * 100.0)?;
    writeln!(s, "AI 1 Games Played: {}", report.ai1_games_played)?;
    writeln!(s, "AI 2 Games Played: {}\n", report.ai2_games_played)?;

    for (label, weights) in [
        ("AI 1", &report.ai1_final_weights),
        ("AI 2", &report.ai2_final_weights),
    ] {
        writeln!(s, "{THIN}\n{label} FINAL WEIGHTS (v{})\n{THIN}", weights.version)?;
        let mut entries: Vec<_> = weights.iter().collect();
        entries.sort_by_key(|(f, _)| f.name());
        for (factor, value) in entries {
            writeln!(s, "  {:25}: {:8.2}", factor.name(), value)?;
        }
        writeln!(s)?;
    }

    writeln!(s, "{THIN}\nGAME-BY-GAME RESULTS\n{THIN}")?;
    writeln!(
        s,
        "{:<6} {:<8} {:<7} {:<9} {:<9} {:<12} {:<12}",
        "Game", "Winner", "Turns", "P1 Left", "P2 Left", "P1 WinRate", "P2 WinRate"
    )?;
    writeln!(s, "{THIN}")?;
    for g in &report.game_results {
        let winner = g.winner.map_or("TIE".to_string(), |p| p.to_string());
        writeln!(
            s,
            "{:<6} {:<8} {:<7} {:<9} {:<9} {:<12} {:<12}",
            g.game_number,
            winner,
            g.turns,
            g.p1_units_left,
            g.p2_units_left,
            format!("{:.2}%", g.ai1_win_rate_after * 100.0),
            format!("{:.2}%", g.ai2_win_rate_after * 100.0),
        )?;
    }

    Ok(())
}
