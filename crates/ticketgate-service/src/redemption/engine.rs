//! The redemption state machine.
//!
//! Every scan is evaluated inside one ticket-scoped unit of work: the ticket
//! row is locked, the idempotency key is checked, the ticket and quota line
//! are validated, the line is decremented with a compare-and-swap, and the
//! attempt is appended. Rejections are recorded the same way.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time;
use tracing::{error, info, warn};
use validator::Validate;

use ticketgate_core::config::RedemptionConfig;
use ticketgate_core::error::AppError;
use ticketgate_core::result::AppResult;
use ticketgate_core::traits::Clock;
use ticketgate_core::types::RedemptionId;
use ticketgate_database::store::{abandon, TicketStore, TicketUnitOfWork};
use ticketgate_entity::quota::QuotaLine;
use ticketgate_entity::redemption::{RedemptionAttempt, RedemptionResult, RejectReason};
use ticketgate_entity::ticket::{GroupTicket, TicketStatus, derive_status};

use super::request::{RedeemRequest, RedemptionOutcome};
use super::retry::RetryPolicy;
use crate::issuance::code::normalize;

/// Consumes ticket quota at the gate.
#[derive(Clone)]
pub struct RedemptionEngine {
    /// Ticket persistence.
    store: Arc<dyn TicketStore>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Redemption settings.
    config: RedemptionConfig,
    /// Conflict retry schedule.
    retry: RetryPolicy,
}

impl std::fmt::Debug for RedemptionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedemptionEngine")
            .field("config", &self.config)
            .finish()
    }
}

/// Result of evaluating a scan inside a unit of work.
enum Evaluation {
    /// A new attempt was written; the unit must commit.
    Recorded(RedemptionOutcome),
    /// The key was already recorded; nothing was written.
    Replayed(RedemptionOutcome),
}

impl RedemptionEngine {
    /// Creates a new redemption engine.
    pub fn new(store: Arc<dyn TicketStore>, clock: Arc<dyn Clock>, config: RedemptionConfig) -> Self {
        let retry = RetryPolicy::from_config(&config);
        Self {
            store,
            clock,
            config,
            retry,
        }
    }

    /// Redeems `requested_qty` entries of an attraction from a ticket.
    ///
    /// Business refusals come back as a `REJECTED` outcome, never as an
    /// error. Lost races are retried internally; once retries are exhausted
    /// the request fails with `Internal` and nothing is committed.
    pub async fn redeem(&self, request: RedeemRequest) -> AppResult<RedemptionOutcome> {
        request
            .validate()
            .map_err(|e| AppError::validation(format!("Invalid redemption request: {e}")))?;
        let code = normalize(&request.ticket_code);
        if code.is_empty() {
            return Err(AppError::validation("Ticket code is blank"));
        }

        let mut retries = 0;
        loop {
            match self.try_redeem(&request, &code).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_conflict() && retries < self.retry.max_retries => {
                    retries += 1;
                    let delay = self.retry.delay(retries);
                    warn!(
                        ticket_code = %code,
                        idempotency_key = %request.idempotency_key,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Redemption conflict, retrying"
                    );
                    time::sleep(delay).await;
                }
                Err(e) if e.is_conflict() => {
                    error!(
                        ticket_code = %code,
                        idempotency_key = %request.idempotency_key,
                        retries,
                        error = %e,
                        "Redemption conflict retries exhausted"
                    );
                    return Err(AppError::internal(format!(
                        "Redemption could not complete after {retries} retries: {}",
                        e.message
                    )));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Cancels (refunds) an unused ticket.
    ///
    /// Cancelling an already cancelled ticket returns it unchanged. A ticket
    /// that is not active, or has any entry consumed, is a conflict.
    pub async fn cancel(&self, ticket_code: &str) -> AppResult<GroupTicket> {
        let code = normalize(ticket_code);
        if code.is_empty() {
            return Err(AppError::validation("Ticket code is blank"));
        }
        let now = self.clock.now();

        let mut uow = self.store.begin().await?;
        match cancel_in(uow.as_mut(), &code, now).await {
            Ok((ticket, true)) => {
                uow.commit().await?;
                info!(
                    ticket_id = %ticket.id,
                    ticket_code = %ticket.ticket_code,
                    "Ticket cancelled"
                );
                Ok(ticket)
            }
            Ok((ticket, false)) => {
                uow.rollback().await?;
                info!(ticket_code = %ticket.ticket_code, "Ticket already cancelled");
                Ok(ticket)
            }
            Err(e) => {
                abandon(uow).await;
                Err(e)
            }
        }
    }

    /// One attempt at evaluating the scan in its own unit of work.
    async fn try_redeem(&self, request: &RedeemRequest, code: &str) -> AppResult<RedemptionOutcome> {
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        match evaluate(uow.as_mut(), request, code, now).await {
            Ok(Evaluation::Recorded(outcome)) => {
                uow.commit().await?;
                log_outcome(request, code, &outcome);
                Ok(outcome)
            }
            Ok(Evaluation::Replayed(outcome)) => {
                uow.rollback().await?;
                info!(
                    ticket_code = %code,
                    idempotency_key = %request.idempotency_key,
                    outcome = %outcome.outcome,
                    "Replayed recorded redemption"
                );
                Ok(outcome)
            }
            Err(e) => {
                abandon(uow).await;
                Err(e)
            }
        }
    }
}

/// Steps 1-10 of a redemption against an open unit of work.
async fn evaluate(
    uow: &mut dyn TicketUnitOfWork,
    request: &RedeemRequest,
    code: &str,
    now: DateTime<Utc>,
) -> AppResult<Evaluation> {
    let ticket = uow.lock_ticket_by_code(code).await?;

    if let Some(prior) = uow.find_attempt_by_key(&request.idempotency_key).await? {
        if !prior.matches_request(code, request.attraction_id, request.requested_qty) {
            warn!(
                idempotency_key = %request.idempotency_key,
                recorded_code = %prior.ticket_code,
                recorded_attraction = %prior.attraction_id,
                recorded_qty = prior.requested_qty,
                "Idempotency key reused with different arguments; replaying recorded outcome"
            );
        }
        return Ok(Evaluation::Replayed(RedemptionOutcome::from_attempt(&prior, true)));
    }

    let Some(mut ticket) = ticket else {
        let attempt = new_attempt(request, code, None, now)
            .rejected(RejectReason::TicketNotFound, None, None);
        return record(uow, attempt).await;
    };

    let lines = uow.quota_lines(ticket.id).await?;
    let line = lines
        .iter()
        .find(|l| l.attraction_id == request.attraction_id)
        .cloned();
    let line_remaining = line.as_ref().map(|l| l.remaining_qty);

    if !ticket.status.accepts_redemption() {
        let attempt = new_attempt(request, code, Some(&ticket), now).rejected(
            RejectReason::TicketInvalid,
            line_remaining,
            Some(ticket.status),
        );
        return record(uow, attempt).await;
    }

    if ticket.is_past_validity(now) {
        ticket.status = TicketStatus::Expired;
        ticket.updated_at = now;
        uow.update_ticket_state(&ticket).await?;
        info!(ticket_id = %ticket.id, "Ticket expired on scan");

        let attempt = new_attempt(request, code, Some(&ticket), now).rejected(
            RejectReason::TicketExpired,
            line_remaining,
            Some(ticket.status),
        );
        return record(uow, attempt).await;
    }

    if ticket.is_before_validity(now) {
        let attempt = new_attempt(request, code, Some(&ticket), now).rejected(
            RejectReason::TicketNotYetValid,
            line_remaining,
            Some(ticket.status),
        );
        return record(uow, attempt).await;
    }

    let Some(line) = line else {
        let attempt = new_attempt(request, code, Some(&ticket), now).rejected(
            RejectReason::LineNotFound,
            None,
            Some(ticket.status),
        );
        return record(uow, attempt).await;
    };

    if request.requested_qty > line.remaining_qty {
        let attempt = new_attempt(request, code, Some(&ticket), now).rejected(
            RejectReason::QuotaExhausted,
            Some(line.remaining_qty),
            Some(ticket.status),
        );
        return record(uow, attempt).await;
    }

    let mut consumed = line.clone();
    consumed
        .consume(request.requested_qty, now)
        .map_err(|e| AppError::internal(format!("Quota rule violated: {e}")))?;
    if !uow.apply_consumption(&consumed, line.remaining_qty).await? {
        return Err(AppError::conflict(format!(
            "Quota line for attraction {} changed concurrently",
            line.attraction_id
        )));
    }

    let lines: Vec<QuotaLine> = lines
        .into_iter()
        .map(|l| {
            if l.attraction_id == consumed.attraction_id {
                consumed.clone()
            } else {
                l
            }
        })
        .collect();
    ticket.used_count = lines.iter().map(|l| l.used_qty).sum();
    ticket.last_used_at = Some(now);
    ticket.status = derive_status(ticket.status, &lines);
    ticket.updated_at = now;
    uow.update_ticket_state(&ticket).await?;

    let attempt = RedemptionAttempt {
        outcome: RedemptionResult::Redeemed,
        remaining_qty: Some(consumed.remaining_qty),
        ticket_status: Some(ticket.status),
        ..new_attempt(request, code, Some(&ticket), now)
    };
    record(uow, attempt).await
}

/// Appends the attempt and turns it into the scanner response.
async fn record(
    uow: &mut dyn TicketUnitOfWork,
    attempt: RedemptionAttempt,
) -> AppResult<Evaluation> {
    uow.insert_attempt(&attempt).await?;
    Ok(Evaluation::Recorded(RedemptionOutcome::from_attempt(
        &attempt, false,
    )))
}

/// Skeleton attempt for a request; the outcome is filled in by the caller.
fn new_attempt(
    request: &RedeemRequest,
    code: &str,
    ticket: Option<&GroupTicket>,
    now: DateTime<Utc>,
) -> RedemptionAttempt {
    RedemptionAttempt {
        id: RedemptionId::new(),
        ticket_id: ticket.map(|t| t.id),
        ticket_code: code.to_string(),
        attraction_id: request.attraction_id,
        requested_qty: request.requested_qty,
        outcome: RedemptionResult::Rejected,
        reject_reason: None,
        idempotency_key: request.idempotency_key.clone(),
        scanner_user_id: request.scanner_user_id,
        remaining_qty: None,
        ticket_status: None,
        recorded_at: now,
    }
}

trait RejectExt {
    fn rejected(
        self,
        reason: RejectReason,
        remaining_qty: Option<i32>,
        ticket_status: Option<TicketStatus>,
    ) -> Self;
}

impl RejectExt for RedemptionAttempt {
    fn rejected(
        self,
        reason: RejectReason,
        remaining_qty: Option<i32>,
        ticket_status: Option<TicketStatus>,
    ) -> Self {
        Self {
            outcome: RedemptionResult::Rejected,
            reject_reason: Some(reason),
            remaining_qty,
            ticket_status,
            ..self
        }
    }
}

/// Locks the ticket and moves it to `CANCELLED`. The flag is `false` when
/// the ticket was already cancelled and nothing was written.
async fn cancel_in(
    uow: &mut dyn TicketUnitOfWork,
    code: &str,
    now: DateTime<Utc>,
) -> AppResult<(GroupTicket, bool)> {
    let mut ticket = uow
        .lock_ticket_by_code(code)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Ticket {code} not found")))?;

    match ticket.status {
        TicketStatus::Cancelled => return Ok((ticket, false)),
        TicketStatus::Active => {}
        other => {
            return Err(AppError::conflict(format!(
                "Ticket {code} is {other} and cannot be cancelled"
            )));
        }
    }

    let lines = uow.quota_lines(ticket.id).await?;
    if lines.iter().any(|l| l.used_qty > 0) {
        return Err(AppError::conflict(format!(
            "Ticket {code} has already been redeemed and cannot be cancelled"
        )));
    }

    ticket.status = TicketStatus::Cancelled;
    ticket.updated_at = now;
    uow.update_ticket_state(&ticket).await?;
    Ok((ticket, true))
}

fn log_outcome(request: &RedeemRequest, code: &str, outcome: &RedemptionOutcome) {
    match outcome.reject_reason {
        None => info!(
            ticket_code = %code,
            attraction_id = %request.attraction_id,
            requested_qty = request.requested_qty,
            remaining_qty = ?outcome.remaining_qty,
            ticket_status = ?outcome.ticket_status,
            scanner_user_id = %request.scanner_user_id,
            "Ticket redeemed"
        ),
        Some(reason) => warn!(
            ticket_code = %code,
            attraction_id = %request.attraction_id,
            requested_qty = request.requested_qty,
            reason = %reason,
            scanner_user_id = %request.scanner_user_id,
            "Redemption rejected"
        ),
    }
}
