use colored::{ColoredString, Colorize};
use langshift_core::migration::TerminalState;
use langshift_core::report::BatchReport;

fn state_label(state: Option<TerminalState>) -> ColoredString {
    match state {
        Some(TerminalState::Success) => "success".green(),
        Some(TerminalState::Failed) => "failed".red(),
        Some(TerminalState::Rejected) => "rejected".yellow(),
        Some(TerminalState::Aborted) => "aborted".red().bold(),
        None => "unfinished".dimmed(),
    }
}

pub fn print_report(report: &BatchReport) {
    println!("\n{}", "📋 Summary".bold());

    for session in &report.sessions {
        println!(
            "  {} {} [{}] {} attempt(s), {} ms",
            state_label(session.terminal_state),
            session.source_artifact_id,
            session.model_id,
            session.attempts,
            session.elapsed_ms
        );
        if session.terminal_state != Some(TerminalState::Success) {
            if let Some(error) = &session.error {
                println!("      {}", error.dimmed());
            }
        }
    }

    for failure in &report.load_failures {
        println!("  {} {failure}", "not loaded".yellow());
    }

    if report.model_times_ms.len() > 1 {
        println!("\n{}", "⏱  Time per model".bold());
        for (model, millis) in &report.model_times_ms {
            println!("  {model}: {:.1}s", *millis as f64 / 1000.0);
        }
    }

    if !report.post_batch.is_empty() {
        println!("\n{}", "🔎 Post-batch".bold());
        for outcome in &report.post_batch {
            let label = if outcome.result.passed {
                "passed".green()
            } else {
                "failed".red()
            };
            println!("  {label} {}", outcome.name);
        }
    }

    println!(
        "\n{} succeeded, {} failed, {} rejected, {} aborted; {} request(s) in {:.1}s",
        report.count(TerminalState::Success).to_string().green(),
        report.count(TerminalState::Failed).to_string().red(),
        report.count(TerminalState::Rejected),
        report.count(TerminalState::Aborted),
        report.total_requests,
        report.elapsed().as_secs_f64()
    );
}
