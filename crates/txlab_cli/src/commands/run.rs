//! The `run` command.

use txlab_scenarios::{run_catalog, ScenarioOutcome, ScenarioReport};

/// Runs the catalog (or one scenario) and prints the narration.
pub fn run(scenario: Option<&str>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let reports = run_catalog(scenario);
    if reports.is_empty() {
        if let Some(name) = scenario {
            return Err(format!("unknown scenario: {name} (see `txlab list`)").into());
        }
    }

    match format {
        "json" => print_json(&reports)?,
        "text" => print_text(&reports),
        other => return Err(format!("unknown format: {other} (expected text or json)").into()),
    }
    Ok(())
}

fn print_text(reports: &[ScenarioReport]) {
    for report in reports {
        println!("== {} ==", report.name);
        for line in &report.narration {
            println!("   {line}");
        }
        match &report.outcome {
            ScenarioOutcome::Demonstrated => println!("   -> demonstrated"),
            ScenarioOutcome::Unexpected { detail } => println!("   -> UNEXPECTED: {detail}"),
        }
        println!();
    }

    let deviations = reports
        .iter()
        .filter(|r| r.outcome != ScenarioOutcome::Demonstrated)
        .count();
    println!(
        "{} scenario(s) run, {} deviation(s)",
        reports.len(),
        deviations
    );
}

fn print_json(reports: &[ScenarioReport]) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(reports)?);
    Ok(())
}
