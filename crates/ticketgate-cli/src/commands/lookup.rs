//! Ticket lookup and validation commands.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use ticketgate_core::error::AppError;
use ticketgate_core::types::AttractionId;
use ticketgate_service::TicketSnapshot;
use ticketgate_service::lookup::AttractionEntitlement;

/// Arguments for the lookup command
#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Ticket code
    pub code: String,
}

/// Arguments for the validate command
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Ticket code
    pub code: String,
    /// Restrict the check to one attraction (UUID)
    #[arg(long)]
    pub attraction: Option<String>,
}

/// Attraction display row
#[derive(Debug, Serialize, Tabled)]
struct AttractionRow {
    /// Attraction
    name: String,
    /// Total
    total: i32,
    /// Used
    used: i32,
    /// Remaining
    remaining: i32,
    /// Visit date
    visit_date: String,
    /// Redeemable
    can_redeem: bool,
}

impl From<&AttractionEntitlement> for AttractionRow {
    fn from(entry: &AttractionEntitlement) -> Self {
        Self {
            name: entry.name.clone(),
            total: entry.total_qty,
            used: entry.used_qty,
            remaining: entry.remaining_qty,
            visit_date: output::or_dash(entry.visit_date),
            can_redeem: entry.can_redeem,
        }
    }
}

/// Execute the lookup command
pub async fn execute(
    args: &LookupArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let services = super::build_services(config_path).await?;
    let snapshot = services.lookup.lookup(&args.code).await?;

    match format {
        OutputFormat::Json => output::print_json(&snapshot, "{}"),
        OutputFormat::Table => print_snapshot(&snapshot),
    }
    Ok(())
}

/// Execute the validate command
pub async fn execute_validate(
    args: &ValidateArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let attraction = args
        .attraction
        .as_deref()
        .map(|value| super::parse_id::<AttractionId>(value, "attraction ID"))
        .transpose()?;

    let services = super::build_services(config_path).await?;
    let report = services.lookup.validate(&args.code, attraction).await?;

    match format {
        OutputFormat::Json => output::print_json(&report, "{}"),
        OutputFormat::Table => {
            print_snapshot(&report.snapshot);
            println!();
            if report.is_valid {
                output::print_success("Ticket is valid");
            }
            for error in &report.errors {
                output::print_error(error);
            }
            for warning in &report.warnings {
                output::print_warning(warning);
            }
        }
    }
    Ok(())
}

fn print_snapshot(snapshot: &TicketSnapshot) {
    output::print_kv("Ticket", &snapshot.ticket_code);
    output::print_kv("Status", snapshot.status.as_str());
    output::print_kv("Valid from", &snapshot.valid_from.to_rfc3339());
    output::print_kv("Valid until", &snapshot.valid_until.to_rfc3339());
    output::print_kv("Used", &snapshot.used_count.to_string());
    output::print_kv(
        "Last used",
        &output::or_dash(snapshot.last_used_at.map(|t| t.to_rfc3339())),
    );
    output::print_kv(
        "Usage",
        &format!(
            "{}/{} ({:.1}%)",
            snapshot.summary.used_qty, snapshot.summary.total_qty, snapshot.summary.usage_percentage
        ),
    );
    println!();

    let rows: Vec<AttractionRow> = snapshot.attractions.iter().map(AttractionRow::from).collect();
    output::print_list(&rows, OutputFormat::Table);
}
