//! Deposits and withdrawals of simulated funds.
//!
//! Deposits are gated by a payment method on file; both directions emit
//! one immutable transaction row in the same database transaction as the
//! balance change.

use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::adapters::postgres::{fetch_user_for_update, insert_transaction, update_user_funds};
use crate::adapters::PostgresStore;
use crate::domain::{round_money, Transaction, TransactionKind};
use crate::error::{BourseError, Result};

#[derive(Clone)]
pub struct FundsLedger {
    store: PostgresStore,
}

impl FundsLedger {
    pub fn new(store: PostgresStore) -> Self {
        Self { store }
    }

    /// Credit funds against a stored card. The card is resolved before
    /// any mutation: an explicit id must belong to the user, otherwise
    /// the user's default is charged; neither existing rejects with
    /// `NoPaymentMethod`.
    #[instrument(skip(self))]
    pub async fn deposit(
        &self,
        user_id: i64,
        amount: Decimal,
        payment_method_id: Option<i64>,
    ) -> Result<Transaction> {
        let amount = round_money(amount);
        if amount <= Decimal::ZERO {
            return Err(BourseError::InvalidAmount(format!(
                "deposit amount must be positive, got {amount}"
            )));
        }

        let method = self
            .store
            .resolve_payment_method(user_id, payment_method_id)
            .await?;

        let mut tx = self.store.pool().begin().await?;
        let user = fetch_user_for_update(&mut *tx, user_id).await?;
        let new_funds = round_money(user.funds + amount);
        update_user_funds(&mut *tx, user.id, new_funds).await?;
        let record = insert_transaction(
            &mut *tx,
            user.id,
            TransactionKind::Deposit,
            amount,
            new_funds,
            &format!("Deposit via {}", method.label()),
        )
        .await?;
        tx.commit().await?;

        info!(user_id, %amount, balance_after = %new_funds, "Deposited funds");
        Ok(record)
    }

    /// Debit funds. Rejects rather than letting the balance go negative.
    #[instrument(skip(self))]
    pub async fn withdraw(&self, user_id: i64, amount: Decimal) -> Result<Transaction> {
        let amount = round_money(amount);
        if amount <= Decimal::ZERO {
            return Err(BourseError::InvalidAmount(format!(
                "withdrawal amount must be positive, got {amount}"
            )));
        }

        let mut tx = self.store.pool().begin().await?;
        let user = fetch_user_for_update(&mut *tx, user_id).await?;
        if amount > user.funds {
            return Err(BourseError::InsufficientFunds {
                needed: amount,
                available: user.funds,
            });
        }

        let new_funds = round_money(user.funds - amount);
        update_user_funds(&mut *tx, user.id, new_funds).await?;
        let record = insert_transaction(
            &mut *tx,
            user.id,
            TransactionKind::Withdraw,
            amount,
            new_funds,
            "Withdrawal",
        )
        .await?;
        tx.commit().await?;

        info!(user_id, %amount, balance_after = %new_funds, "Withdrew funds");
        Ok(record)
    }
}
