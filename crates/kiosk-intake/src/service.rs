//! The coin intake loop.
//!
//! [`CoinIntake`] consumes [`TransportEvent`]s from the connection manager,
//! runs each line through the [`CoinDecoder`] and executes the resulting
//! effects in order:
//!
//! - a credit updates the [`Ledger`], appends a `coin_accepted` audit entry,
//!   then broadcasts `balance` followed by `coin_accepted`;
//! - a rejection appends a `coin_rejected` audit entry and broadcasts a
//!   `parser_warning`, as does a coin the balance cannot absorb
//!   (`balance_overflow`);
//! - timer effects arm or cancel the single fragment deadline.
//!
//! A line is never decoded while an earlier deadline is overdue, so a late
//! continuation digit cannot join a fragment whose window has closed.

use std::sync::Arc;
use std::time::Duration;

use kiosk_core::constants::DEFAULT_FLUSH_INTERVAL_MS;
use kiosk_core::{Amount, ConnectionState, ConnectionStatus};
use kiosk_hardware::TransportEvent;
use kiosk_protocol::{Acceptance, CoinDecoder, DecoderConfig, DecoderStats, Effect, Rejection};
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::audit::AuditSink;
use crate::events::{EventBus, KioskEvent};
use crate::ledger::Ledger;

/// Warning and audit reason for a coin the balance cannot absorb.
const BALANCE_OVERFLOW: &str = "balance_overflow";

/// Configuration for the intake loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeConfig {
    /// Decoder denominations and fragment window.
    pub decoder: DecoderConfig,

    /// How often a dirty ledger retries its store write.
    pub flush_interval: Duration,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            decoder: DecoderConfig::default(),
            flush_interval: Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
        }
    }
}

impl IntakeConfig {
    pub fn decoder(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }
}

/// Sequential consumer of acceptor lines.
pub struct CoinIntake {
    decoder: CoinDecoder,
    ledger: Arc<Ledger>,
    events: EventBus,
    audit: Arc<dyn AuditSink>,
    timer: Option<(u64, Instant)>,
    stats: watch::Sender<DecoderStats>,
    flush_interval: Duration,
}

impl CoinIntake {
    pub fn new(
        config: IntakeConfig,
        ledger: Arc<Ledger>,
        events: EventBus,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let (stats, _) = watch::channel(DecoderStats::default());
        Self {
            decoder: CoinDecoder::with_config(config.decoder),
            ledger,
            events,
            audit,
            timer: None,
            stats,
            flush_interval: config.flush_interval.max(Duration::from_millis(1)),
        }
    }

    /// Live decoder counters, updated after every processed line.
    pub fn stats(&self) -> watch::Receiver<DecoderStats> {
        self.stats.subscribe()
    }

    pub fn decoder(&self) -> &CoinDecoder {
        &self.decoder
    }

    /// Deadline of the pending fragment, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.timer.map(|(_, deadline)| deadline)
    }

    /// Decode one line and execute its effects.
    pub async fn handle_line(&mut self, line: &str) {
        self.expire_due().await;

        let effects = self.decoder.process_line(line, Instant::now().into_std());
        self.apply(effects).await;
    }

    /// Forward a connection change and settle any fragment the lost
    /// transport can no longer complete.
    pub async fn handle_status(&mut self, status: &ConnectionStatus) {
        self.events
            .emit(KioskEvent::ConnectionStatus(status.summary()));

        if status.state == ConnectionState::Error
            && let Some(message) = &status.last_error
        {
            self.audit.append(
                "connection_error",
                format!("Coin acceptor error: {}", message),
                json!({ "port_path": status.port_path, "error": message }),
            );
        }

        if !status.is_connected() && !self.decoder.is_idle() {
            debug!(state = %status.state, "Transport down; resolving pending fragment");
            let effects = self.decoder.flush(Instant::now().into_std());
            self.apply(effects).await;
        }
    }

    /// Fire the fragment timer if its deadline has passed.
    pub async fn expire_due(&mut self) {
        if let Some((generation, deadline)) = self.timer
            && deadline <= Instant::now()
        {
            self.timer = None;
            let effects = self.decoder.expire(generation, Instant::now().into_std());
            self.apply(effects).await;
        }
    }

    /// Run until the transport channel closes, then settle any pending
    /// fragment and flush the ledger.
    pub async fn run(mut self, mut transport: mpsc::Receiver<TransportEvent>) -> DecoderStats {
        let mut flush = time::interval(self.flush_interval);
        flush.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            denominations = %self.decoder.config().denominations,
            fragment_timeout_ms = self.decoder.config().fragment_timeout.as_millis() as u64,
            "Coin intake started"
        );

        loop {
            let timer = self.timer;
            let deadline = timer.map_or_else(Instant::now, |(_, deadline)| deadline);

            tokio::select! {
                biased;

                _ = time::sleep_until(deadline), if timer.is_some() => {
                    self.expire_due().await;
                }

                event = transport.recv() => match event {
                    Some(TransportEvent::Line(line)) => self.handle_line(&line).await,
                    Some(TransportEvent::Status(status)) => self.handle_status(&status).await,
                    None => break,
                },

                _ = flush.tick() => self.flush_ledger().await,
            }
        }

        let effects = self.decoder.flush(Instant::now().into_std());
        self.apply(effects).await;
        self.flush_ledger().await;

        let stats = *self.decoder.stats();
        info!(
            lines = stats.lines,
            credited = stats.credited,
            rejected = stats.rejected,
            "Coin intake stopped"
        );
        stats
    }

    async fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Credit(acceptance) => self.credit(acceptance).await,
                Effect::Reject(rejection) => self.reject(rejection),
                Effect::ArmTimer {
                    generation,
                    deadline,
                } => {
                    self.timer = Some((generation, Instant::from_std(deadline)));
                }
                Effect::CancelTimer { generation } => {
                    if self.timer.is_some_and(|(armed, _)| armed == generation) {
                        self.timer = None;
                    }
                }
            }
        }

        self.stats.send_replace(*self.decoder.stats());
    }

    async fn credit(&mut self, acceptance: Acceptance) {
        let value = Amount::from(acceptance.denomination);

        let receipt = match self.ledger.credit(value).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!(value = %value, raw = %acceptance.raw, error = %e, "Failed to credit coin");
                self.refuse_credit(acceptance, e.to_string());
                return;
            }
        };

        info!(
            value = %value,
            balance = %receipt.balance,
            kind = %acceptance.kind,
            persisted = receipt.persisted,
            "Coin accepted"
        );

        self.audit.append(
            "coin_accepted",
            format!("Coin accepted: {}", value),
            json!({
                "value": value.value(),
                "balance": receipt.balance.value(),
                "raw": acceptance.raw,
                "kind": acceptance.kind,
                "persisted": receipt.persisted,
            }),
        );

        self.events.emit(KioskEvent::Balance {
            balance: receipt.balance,
        });
        self.events.emit(KioskEvent::CoinAccepted {
            value: acceptance.denomination.value(),
            balance: receipt.balance,
        });
    }

    fn reject(&mut self, rejection: Rejection) {
        let reason = rejection.reason;
        warn!(raw = %rejection.raw, reason = %reason, "Coin rejected");

        self.audit.append(
            "coin_rejected",
            format!("Coin rejected: {}", rejection.raw),
            json!({ "raw": rejection.raw, "reason": reason.code() }),
        );

        self.events.emit(KioskEvent::ParserWarning {
            code: reason.code().to_string(),
            message: reason.message().to_string(),
            raw: rejection.raw,
        });
    }

    /// A valid coin the ledger could not hold. The balance is unchanged.
    fn refuse_credit(&self, acceptance: Acceptance, error: String) {
        let value = acceptance.denomination.value();

        self.audit.append(
            "coin_rejected",
            format!("Coin not credited: {}", value),
            json!({
                "raw": acceptance.raw,
                "value": value,
                "reason": BALANCE_OVERFLOW,
                "error": error,
            }),
        );

        self.events.emit(KioskEvent::ParserWarning {
            code: BALANCE_OVERFLOW.to_string(),
            message: format!("Coin of {} could not be added to the balance: {}", value, error),
            raw: acceptance.raw,
        });
    }

    async fn flush_ledger(&self) {
        if !self.ledger.is_dirty().await {
            return;
        }
        if let Err(e) = self.ledger.flush().await {
            warn!(error = %e, "Balance still not persisted");
        }
    }
}
