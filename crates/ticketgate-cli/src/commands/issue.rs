//! Ticket issuance command.

use clap::Args;

use crate::output::{self, OutputFormat};
use ticketgate_core::error::AppError;
use ticketgate_core::types::TransactionId;
use ticketgate_entity::ticket::GroupTicket;

/// Arguments for the issue command
#[derive(Debug, Args)]
pub struct IssueArgs {
    /// Transaction ID (UUID) of a completed purchase
    pub transaction_id: String,
}

/// Execute the issue command
pub async fn execute(
    args: &IssueArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let transaction_id: TransactionId = super::parse_id(&args.transaction_id, "transaction ID")?;
    let services = super::build_services(config_path).await?;

    let ticket = services.issuer.issue_for_transaction(transaction_id).await?;
    print_ticket(&ticket, format);
    Ok(())
}

/// Print a ticket header in the selected format
pub fn print_ticket(ticket: &GroupTicket, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(ticket, "{}"),
        OutputFormat::Table => {
            output::print_success(&format!("Ticket {}", ticket.ticket_code));
            output::print_kv("Ticket ID", &ticket.id.to_string());
            output::print_kv("Transaction", &ticket.transaction_id.to_string());
            output::print_kv("Status", ticket.status.as_str());
            output::print_kv("Valid from", &ticket.valid_from.to_rfc3339());
            output::print_kv("Valid until", &ticket.valid_until.to_rfc3339());
            output::print_kv("Used", &ticket.used_count.to_string());
        }
    }
}
