//! The kiosk balance.
//!
//! One [`Ledger`] owns the in-memory balance and writes it through to an
//! [`AnyBalanceStore`] on every change. Every mutation holds the same lock
//! across the in-memory update and the store write, so concurrent credits
//! and debits are applied in order and no write is lost.
//!
//! A failed write never loses money: the in-memory balance keeps the change,
//! the ledger is marked dirty, and [`Ledger::flush`] retries later.
//!
//! A ledger built with [`Ledger::with_events`] broadcasts `balance` after
//! every debit and reset. Credits are broadcast by the intake loop once
//! their audit entry is queued.

use kiosk_core::Amount;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::events::{EventBus, KioskEvent};
use crate::store::{AnyBalanceStore, BalanceStore};

/// Outcome of a credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreditReceipt {
    /// Balance after the credit.
    pub balance: Amount,

    /// Whether the new balance reached the store.
    pub persisted: bool,
}

#[derive(Debug)]
struct LedgerState {
    balance: Amount,
    dirty: bool,
}

/// Single-writer balance with write-through persistence.
#[derive(Debug)]
pub struct Ledger {
    state: Mutex<LedgerState>,
    store: AnyBalanceStore,
    events: Option<EventBus>,
}

impl Ledger {
    /// Load the persisted balance and wrap it.
    pub async fn open(store: impl Into<AnyBalanceStore>) -> Result<Self> {
        let store = store.into();
        let balance = store.load().await?;
        info!(balance = %balance, "Ledger opened");

        Ok(Self {
            state: Mutex::new(LedgerState {
                balance,
                dirty: false,
            }),
            store,
            events: None,
        })
    }

    /// Broadcast the balance to `events` after each debit and reset.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn balance(&self) -> Amount {
        self.state.lock().await.balance
    }

    /// Whether the in-memory balance is ahead of the store.
    pub async fn is_dirty(&self) -> bool {
        self.state.lock().await.dirty
    }

    /// Add a validated coin to the balance.
    ///
    /// Fails only on overflow. A store failure is reported through
    /// [`CreditReceipt::persisted`], not as an error.
    pub async fn credit(&self, amount: Amount) -> Result<CreditReceipt> {
        let mut state = self.state.lock().await;
        let balance = state.balance.checked_add(amount)?;
        state.balance = balance;

        let persisted = self.write_through(&mut state).await;
        debug!(amount = %amount, balance = %balance, persisted, "Balance credited");

        Ok(CreditReceipt { balance, persisted })
    }

    /// Spend from the balance.
    ///
    /// Rejects the debit with `InsufficientFunds` and leaves the balance
    /// untouched if it would go negative.
    pub async fn debit(&self, amount: Amount) -> Result<Amount> {
        let mut state = self.state.lock().await;
        let balance = state.balance.checked_sub(amount)?;
        state.balance = balance;

        self.write_through(&mut state).await;
        debug!(amount = %amount, balance = %balance, "Balance debited");
        self.broadcast(balance);

        Ok(balance)
    }

    /// Zero the balance and return what it held.
    pub async fn reset(&self) -> Result<Amount> {
        let mut state = self.state.lock().await;
        let previous = state.balance;
        state.balance = Amount::ZERO;

        self.write_through(&mut state).await;
        info!(previous = %previous, "Balance reset");
        self.broadcast(Amount::ZERO);

        Ok(previous)
    }

    /// Retry the store write if an earlier one failed.
    ///
    /// A clean ledger does not touch the store. On error the ledger stays
    /// dirty.
    pub async fn flush(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.dirty {
            return Ok(());
        }

        self.store.store(state.balance).await?;
        state.dirty = false;
        info!(balance = %state.balance, "Pending balance persisted");

        Ok(())
    }

    fn broadcast(&self, balance: Amount) {
        if let Some(events) = &self.events {
            events.emit(KioskEvent::Balance { balance });
        }
    }

    async fn write_through(&self, state: &mut LedgerState) -> bool {
        match self.store.store(state.balance).await {
            Ok(()) => {
                state.dirty = false;
                true
            }
            Err(e) => {
                state.dirty = true;
                warn!(balance = %state.balance, error = %e, "Failed to persist balance; will retry");
                false
            }
        }
    }
}
