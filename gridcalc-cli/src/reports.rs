use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;

use gridcalc_engine::{
    PointsBand, PointsProjection, SimulationReport, VictoryReport, VictoryScenario,
};

/// Everything one invocation produced, in the order it is rendered.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub season: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
    pub remaining_events: usize,
    pub simulation: SimulationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub victory: Option<VictoryReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<PointsProjection>,
}

pub fn generate_json_report<W: Write + ?Sized>(out: &mut W, report: &RunReport) -> Result<()> {
    let json_output = serde_json::to_string_pretty(report)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_console_report<W: Write + ?Sized>(out: &mut W, report: &RunReport) -> Result<()> {
    writeln!(out)?;
    let title = if report.season.is_empty() {
        "Championship".to_string()
    } else {
        report.season.clone()
    };
    writeln!(out, "{}", format!("🏆 {title} Title Odds").bright_cyan().bold())?;
    writeln!(out, "{}", "=".repeat(30).cyan())?;
    if let Some(as_of) = report.as_of {
        writeln!(out, "Standings as of {as_of}")?;
    }
    writeln!(out, "Remaining events: {}", report.remaining_events)?;
    writeln!(out)?;

    for (rank, entry) in report.simulation.probabilities.iter().enumerate() {
        let line = format!(
            "{:>3}. {:<24} {:>7.2}%  ({} wins)",
            rank + 1,
            entry.name,
            entry.win_probability_percent,
            entry.wins
        );
        if rank == 0 && entry.wins > 0 {
            writeln!(out, "{}", line.bright_green().bold())?;
        } else if entry.wins == 0 {
            writeln!(out, "{}", line.dimmed())?;
        } else {
            writeln!(out, "{line}")?;
        }
    }

    let diagnostics = &report.simulation.diagnostics;
    writeln!(out)?;
    writeln!(
        out,
        "Iterations: {}  Workers: {}  Mode: {}  RNG draws: {}",
        diagnostics.iterations, diagnostics.workers, diagnostics.mode, diagnostics.rng_draws
    )?;
    if diagnostics.fallback_orders > 0 {
        writeln!(
            out,
            "{}",
            format!(
                "⚠️  {} finishing orders ignored their constraints (retry budget exhausted)",
                diagnostics.fallback_orders
            )
            .yellow()
        )?;
    }

    if let Some(victory) = &report.victory {
        write_console_victory(out, victory)?;
    }
    if let Some(projection) = &report.projection {
        write_console_projection(out, projection)?;
    }
    Ok(())
}

fn write_console_victory<W: Write + ?Sized>(out: &mut W, victory: &VictoryReport) -> Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "{}",
        format!("🧭 Path to Victory: {}", victory.name)
            .bright_yellow()
            .bold()
    )?;
    writeln!(out, "{}", "=".repeat(30).yellow())?;
    writeln!(
        out,
        "Maximum reachable: {} pts (leader on {})",
        victory.max_possible_points, victory.leader_points
    )?;

    if !victory.is_possible {
        let reason = victory.reason.as_deref().unwrap_or("no viable scenario");
        writeln!(out, "{} {}", "❌ Not possible:".red().bold(), reason)?;
        return Ok(());
    }

    writeln!(out, "{}", "✅ Still possible".green().bold())?;
    if let Some(best) = &victory.scenario {
        writeln!(out, "Easiest route: {}", scenario_headline(best))?;
        for rival in &best.rivals {
            writeln!(
                out,
                "   • {}: {} (drop {} of max {}) [{}]",
                rival.name.bold(),
                rival.requirement,
                rival.must_drop,
                rival.max_points,
                rival.severity
            )?;
        }
    }
    let others = victory.alternatives.len().saturating_sub(1);
    if others > 0 {
        writeln!(out, "Alternatives:")?;
        for scenario in victory.alternatives.iter().skip(1) {
            writeln!(out, "   - {}", scenario_headline(scenario))?;
        }
    }
    Ok(())
}

fn scenario_headline(scenario: &VictoryScenario) -> String {
    let noun = if scenario.target_wins == 1 {
        "race"
    } else {
        "races"
    };
    format!(
        "win {} {noun} for {} pts, {} ({:.2})",
        scenario.target_wins, scenario.target_total, scenario.difficulty, scenario.difficulty_score
    )
}

fn write_console_projection<W: Write + ?Sized>(
    out: &mut W,
    projection: &PointsProjection,
) -> Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "{}",
        format!("📈 Points Projection ({} runs)", projection.runs)
            .bright_blue()
            .bold()
    )?;
    writeln!(out, "{}", "=".repeat(30).blue())?;
    if !projection.history_steps.is_empty() {
        writeln!(out, "Completed: {}", projection.history_steps.join(" → "))?;
        for entry in &projection.competitors {
            let points: Vec<String> = entry.history.iter().map(u32::to_string).collect();
            writeln!(out, "   {:<24} {}", entry.name, points.join(" → ").dimmed())?;
        }
    }
    let Some(final_label) = projection.steps.last() else {
        return Ok(());
    };
    writeln!(out, "After {final_label}:")?;
    for entry in &projection.competitors {
        let (Some(current), Some(last)) = (entry.steps.first(), entry.steps.last()) else {
            continue;
        };
        writeln!(
            out,
            "   {:<24} now {:>4}  median {:>6.1}  IQR {:.1}-{:.1}  range {}-{}",
            entry.name,
            current.min,
            last.median,
            last.lower_quartile,
            last.upper_quartile,
            last.min,
            last.max
        )?;
    }
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(out: &mut W, report: &RunReport) -> Result<()> {
    if report.season.is_empty() {
        writeln!(out, "# Championship Title Odds\n")?;
    } else {
        writeln!(out, "# {} Title Odds\n", report.season)?;
    }

    writeln!(out, "## Summary\n")?;
    if let Some(as_of) = report.as_of {
        writeln!(out, "- **Standings as of**: {as_of}")?;
    }
    let diagnostics = &report.simulation.diagnostics;
    writeln!(out, "- **Remaining events**: {}", report.remaining_events)?;
    writeln!(out, "- **Iterations**: {}", diagnostics.iterations)?;
    writeln!(out, "- **Sampling mode**: {}", diagnostics.mode)?;
    writeln!(out, "- **Fallback orders**: {}\n", diagnostics.fallback_orders)?;

    writeln!(out, "## Probabilities\n")?;
    writeln!(out, "| # | Competitor | Wins | Probability |")?;
    writeln!(out, "|---|---|---:|---:|")?;
    for (rank, entry) in report.simulation.probabilities.iter().enumerate() {
        writeln!(
            out,
            "| {} | {} | {} | {:.2}% |",
            rank + 1,
            entry.name,
            entry.wins,
            entry.win_probability_percent
        )?;
    }
    writeln!(out)?;

    if let Some(victory) = &report.victory {
        write_markdown_victory(out, victory)?;
    }
    if let Some(projection) = &report.projection {
        write_markdown_projection(out, projection)?;
    }
    Ok(())
}

fn write_markdown_victory<W: Write + ?Sized>(out: &mut W, victory: &VictoryReport) -> Result<()> {
    writeln!(out, "## Path to Victory: {}\n", victory.name)?;
    writeln!(
        out,
        "- **Maximum reachable**: {} pts",
        victory.max_possible_points
    )?;
    writeln!(out, "- **Leader**: {} pts", victory.leader_points)?;
    if !victory.is_possible {
        let reason = victory.reason.as_deref().unwrap_or("no viable scenario");
        writeln!(out, "- **Possible**: no ({reason})\n")?;
        return Ok(());
    }
    writeln!(out, "- **Possible**: yes\n")?;

    for (idx, scenario) in victory.alternatives.iter().enumerate() {
        let marker = if idx == 0 { " (easiest)" } else { "" };
        writeln!(out, "### {}{marker}\n", scenario_headline(scenario))?;
        if scenario.rivals.is_empty() {
            writeln!(out, "_No rival needs to drop points._\n")?;
            continue;
        }
        writeln!(out, "| Rival | Must drop | Severity | Requirement |")?;
        writeln!(out, "|---|---:|---|---|")?;
        for rival in &scenario.rivals {
            writeln!(
                out,
                "| {} | {} | {} | {} |",
                rival.name, rival.must_drop, rival.severity, rival.requirement
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_markdown_projection<W: Write + ?Sized>(
    out: &mut W,
    projection: &PointsProjection,
) -> Result<()> {
    writeln!(out, "## Points Projection ({} runs)\n", projection.runs)?;
    writeln!(
        out,
        "Actual points after each completed weekend, then the median after each remaining step.\n"
    )?;
    write!(out, "| Competitor |")?;
    for step in projection.history_steps.iter().chain(&projection.steps) {
        write!(out, " {step} |")?;
    }
    writeln!(out)?;
    write!(out, "|---|")?;
    for _ in projection.history_steps.iter().chain(&projection.steps) {
        write!(out, "---:|")?;
    }
    writeln!(out)?;
    for entry in &projection.competitors {
        write!(out, "| {} |", entry.name)?;
        for idx in 0..projection.history_steps.len() {
            match entry.history.get(idx) {
                Some(points) => write!(out, " {points} |")?,
                None => write!(out, " - |")?,
            }
        }
        for band in &entry.steps {
            write!(out, " {} |", band_cell(band))?;
        }
        writeln!(out)?;
    }
    writeln!(out)?;
    Ok(())
}

fn band_cell(band: &PointsBand) -> String {
    if band.min == band.max {
        band.min.to_string()
    } else {
        format!("{:.1}", band.median)
    }
}
