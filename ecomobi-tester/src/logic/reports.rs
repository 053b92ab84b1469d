use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use super::ScenarioResult;

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    total: usize,
    passed: usize,
    results: &'a [ScenarioResult],
}

fn success_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = (passed as f64 / total as f64) * 100.0;
    rate
}

pub fn generate_console_report<W: Write + ?Sized>(
    out: &mut W,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Test Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=======================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "Total scenarios: {total_tests}")?;
    writeln!(out, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(out, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(
        out,
        "Success rate: {:.1}%",
        success_rate(passed_tests, total_tests)
    )?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(out, "{} {}", status, result.scenario_name.bold())?;
        writeln!(
            out,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;
        for note in &result.notes {
            writeln!(out, "   {note}")?;
        }

        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    let fastest = results.iter().min_by_key(|r| r.average_duration);
    let slowest = results.iter().max_by_key(|r| r.average_duration);
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(out, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        writeln!(
            out,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            out,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
    }
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(out: &mut W, results: &[ScenarioResult]) -> Result<()> {
    let report = JsonReport {
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        total: results.len(),
        passed: results.iter().filter(|r| r.passed).count(),
        results,
    };
    let json_output = serde_json::to_string_pretty(&report)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    out: &mut W,
    results: &[ScenarioResult],
) -> Result<()> {
    writeln!(out, "# Eco-Mobilite Test Results\n")?;

    if results.is_empty() {
        writeln!(out, "_No scenarios executed._")?;
        return Ok(());
    }

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenarios**: {total_tests}")?;
    writeln!(out, "- **Passed**: {passed_tests}")?;
    writeln!(out, "- **Failed**: {}", total_tests - passed_tests)?;
    writeln!(
        out,
        "- **Success rate**: {:.1}%\n",
        success_rate(passed_tests, total_tests)
    )?;

    writeln!(out, "## Detailed Results\n")?;

    for result in results {
        let status = if result.passed { "✅" } else { "❌" };

        writeln!(out, "### {} {}\n", status, result.scenario_name)?;
        writeln!(
            out,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "- **Average time**: {:?}", result.average_duration)?;
        for note in &result.notes {
            writeln!(out, "- {note}")?;
        }

        if !result.failures.is_empty() {
            writeln!(out, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}
