//! Redemption history commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use ticketgate_core::error::AppError;
use ticketgate_core::types::{PageRequest, UserId};
use ticketgate_entity::redemption::RedemptionAttempt;

/// Arguments for history commands
#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// History subcommand
    #[command(subcommand)]
    pub command: HistoryCommand,
}

/// History subcommands
#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// Scans performed by an operator, newest first
    Scanner {
        /// Scanner user ID (UUID)
        id: String,
        /// Page number
        #[arg(long, default_value_t = 1)]
        page: u64,
        /// Page size
        #[arg(long, default_value_t = 25)]
        page_size: u64,
    },
    /// Scans made with a ticket code, newest first
    Ticket {
        /// Ticket code
        code: String,
    },
}

/// Attempt display row
#[derive(Debug, Serialize, Tabled)]
struct AttemptRow {
    /// Recorded at
    recorded_at: String,
    /// Ticket code
    ticket_code: String,
    /// Attraction
    attraction_id: String,
    /// Qty
    qty: i32,
    /// Outcome
    outcome: String,
    /// Reason
    reason: String,
    /// Remaining
    remaining: String,
}

impl From<&RedemptionAttempt> for AttemptRow {
    fn from(a: &RedemptionAttempt) -> Self {
        Self {
            recorded_at: a.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ticket_code: a.ticket_code.clone(),
            attraction_id: a.attraction_id.to_string(),
            qty: a.requested_qty,
            outcome: a.outcome.to_string(),
            reason: output::or_dash(a.reject_reason),
            remaining: output::or_dash(a.remaining_qty),
        }
    }
}

/// Execute history commands
pub async fn execute(
    args: &HistoryArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let services = super::build_services(config_path).await?;

    match &args.command {
        HistoryCommand::Scanner {
            id,
            page,
            page_size,
        } => {
            let scanner: UserId = super::parse_id(id, "scanner user ID")?;
            let page = PageRequest::new(*page, *page_size);
            let attempts = services.history.for_scanner(scanner, &page).await?;

            match format {
                OutputFormat::Json => output::print_json(&attempts, "{}"),
                OutputFormat::Table => {
                    let rows: Vec<AttemptRow> =
                        attempts.items.iter().map(AttemptRow::from).collect();
                    output::print_list(&rows, format);
                    println!(
                        "Page {}/{} ({} total)",
                        attempts.page, attempts.total_pages, attempts.total_items
                    );
                }
            }
        }
        HistoryCommand::Ticket { code } => {
            let attempts = services.history.for_ticket(code).await?;
            let rows: Vec<AttemptRow> = attempts.iter().map(AttemptRow::from).collect();
            output::print_list(&rows, format);
        }
    }
    Ok(())
}
