//! Gate redemption command.

use clap::Args;
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use ticketgate_core::error::AppError;
use ticketgate_core::types::{AttractionId, UserId};
use ticketgate_service::RedeemRequest;

/// Arguments for the redeem command
#[derive(Debug, Args)]
pub struct RedeemArgs {
    /// Ticket code
    pub code: String,
    /// Attraction ID (UUID)
    #[arg(long)]
    pub attraction: String,
    /// Number of entries to admit
    #[arg(long, default_value_t = 1)]
    pub qty: i32,
    /// Scanner operator user ID (UUID)
    #[arg(long)]
    pub scanner: String,
    /// Idempotency key; reuse it to safely retry the same scan
    #[arg(long)]
    pub key: Option<String>,
}

/// Execute the redeem command
pub async fn execute(
    args: &RedeemArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let request = RedeemRequest {
        ticket_code: args.code.clone(),
        attraction_id: super::parse_id::<AttractionId>(&args.attraction, "attraction ID")?,
        requested_qty: args.qty,
        idempotency_key: args
            .key
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        scanner_user_id: super::parse_id::<UserId>(&args.scanner, "scanner user ID")?,
    };
    let key = request.idempotency_key.clone();

    let services = super::build_services(config_path).await?;
    let outcome = services.engine.redeem(request).await?;

    match format {
        OutputFormat::Json => output::print_json(&outcome, "{}"),
        OutputFormat::Table => {
            match outcome.message() {
                None => output::print_success("Entry granted"),
                Some(reason) => output::print_error(&format!("Entry refused: {reason}")),
            }
            output::print_kv("Outcome", outcome.outcome.as_str());
            output::print_kv("Remaining", &output::or_dash(outcome.remaining_qty));
            output::print_kv(
                "Ticket status",
                &output::or_dash(outcome.ticket_status.map(|s| s.as_str())),
            );
            output::print_kv("Idempotency key", &key);
            if outcome.replayed {
                output::print_warning("Replayed an earlier scan with the same key");
            }
        }
    }
    Ok(())
}
