use crate::context::AppContext;
use anyhow::Result;
use colored::Colorize;
use std::process::ExitCode;

pub fn run(context: &AppContext) -> Result<ExitCode> {
    if context.config.models.is_empty() {
        println!("No models registered. Add [[model]] entries to config.toml.");
        return Ok(ExitCode::SUCCESS);
    }

    for registration in &context.config.models {
        println!(
            "{}  {} {}",
            registration.id.bold(),
            registration.provider.to_string().cyan(),
            registration.model.dimmed()
        );
    }
    Ok(ExitCode::SUCCESS)
}
