//! CLI command definitions and dispatch.

pub mod cancel;
pub mod history;
pub mod issue;
pub mod lookup;
pub mod migrate;
pub mod redeem;

use std::str::FromStr;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use ticketgate_core::config::AppConfig;
use ticketgate_core::error::AppError;
use ticketgate_core::traits::{Clock, ScanPayloadEncoder, SystemClock};
use ticketgate_database::store::{AttractionDirectory, PurchaseSource, TicketStore};
use ticketgate_database::{DatabasePool, PgAttractionDirectory, PgPurchaseSource, PgTicketStore};
use ticketgate_service::{
    InlinePayloadEncoder, RedemptionEngine, ScanHistoryService, ScanLookupService, TicketIssuer,
};

/// TicketGate: group ticket issuance and gate redemption
#[derive(Debug, Parser)]
#[command(name = "ticketgate", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Issue the ticket for a completed transaction
    Issue(issue::IssueArgs),
    /// Show a ticket and its remaining entries
    Lookup(lookup::LookupArgs),
    /// Check whether a ticket can be redeemed
    Validate(lookup::ValidateArgs),
    /// Redeem entries at a gate
    Redeem(redeem::RedeemArgs),
    /// Cancel an unused ticket
    Cancel(cancel::CancelArgs),
    /// Redemption history
    History(history::HistoryArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &self.config, self.format).await,
            Commands::Issue(args) => issue::execute(args, &self.config, self.format).await,
            Commands::Lookup(args) => lookup::execute(args, &self.config, self.format).await,
            Commands::Validate(args) => {
                lookup::execute_validate(args, &self.config, self.format).await
            }
            Commands::Redeem(args) => redeem::execute(args, &self.config, self.format).await,
            Commands::Cancel(args) => cancel::execute(args, &self.config, self.format).await,
            Commands::History(args) => history::execute(args, &self.config, self.format).await,
        }
    }
}

/// Services wired against PostgreSQL.
pub struct Services {
    /// Ticket issuer.
    pub issuer: TicketIssuer,
    /// Redemption engine.
    pub engine: RedemptionEngine,
    /// Lookup service.
    pub lookup: ScanLookupService,
    /// History service.
    pub history: ScanHistoryService,
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load_from(config_path)
}

/// Helper: create database pool from config
pub async fn create_db_pool(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}

/// Helper: build every service from the configuration file
pub async fn build_services(config_path: &str) -> Result<Services, AppError> {
    let config = load_config(config_path)?;
    let pool = create_db_pool(&config).await?.pool().clone();

    let store: Arc<dyn TicketStore> = Arc::new(PgTicketStore::new(pool.clone()));
    let purchases: Arc<dyn PurchaseSource> = Arc::new(PgPurchaseSource::new(pool.clone()));
    let attractions: Arc<dyn AttractionDirectory> = Arc::new(PgAttractionDirectory::new(pool));
    let encoder: Arc<dyn ScanPayloadEncoder> = Arc::new(InlinePayloadEncoder::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    Ok(Services {
        issuer: TicketIssuer::new(
            store.clone(),
            purchases,
            encoder,
            clock.clone(),
            config.issuance.clone(),
        ),
        engine: RedemptionEngine::new(store.clone(), clock.clone(), config.redemption.clone()),
        lookup: ScanLookupService::new(store.clone(), attractions, clock),
        history: ScanHistoryService::new(store),
    })
}

/// Helper: parse a typed identifier argument
pub fn parse_id<T>(value: &str, what: &str) -> Result<T, AppError>
where
    T: FromStr<Err = uuid::Error>,
{
    value
        .trim()
        .parse()
        .map_err(|e| AppError::validation(format!("Invalid {what} '{value}': {e}")))
}
