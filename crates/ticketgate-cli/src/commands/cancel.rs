//! Ticket cancellation command.

use clap::Args;

use crate::output::{self, OutputFormat};
use ticketgate_core::error::AppError;

/// Arguments for the cancel command
#[derive(Debug, Args)]
pub struct CancelArgs {
    /// Ticket code
    pub code: String,
    /// Skip confirmation prompt
    #[arg(long)]
    pub force: bool,
}

/// Execute the cancel command
pub async fn execute(
    args: &CancelArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    if !args.force {
        let confirm = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Cancel ticket {}? It will no longer be accepted at any gate.",
                args.code
            ))
            .default(false)
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

        if !confirm {
            println!("Aborted.");
            return Ok(());
        }
    }

    let services = super::build_services(config_path).await?;
    let ticket = services.engine.cancel(&args.code).await?;

    match format {
        OutputFormat::Json => output::print_json(&ticket, "{}"),
        OutputFormat::Table => {
            output::print_success(&format!("Ticket {} is {}", ticket.ticket_code, ticket.status))
        }
    }
    Ok(())
}
