//! Order lifecycle: placement at a locked price, settlement, cancellation.
//!
//! Placement snapshots the market price and writes a PENDING order with no
//! economic effect. Settlement re-validates against live funds, volume, and
//! holdings inside one database transaction, applies the trade, and flips
//! the order to its terminal status. Terminal orders never change again.

use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::adapters::postgres::{
    fetch_holding_for_update, fetch_order_for_update, fetch_stock_for_update,
    fetch_user_for_update, insert_transaction, mark_order_settled, update_stock_volume,
    update_user_funds,
};
use crate::adapters::PostgresStore;
use crate::domain::{
    reject, round_money, round_quantity, Order, OrderSide, OrderStatus, SettleOutcome,
    TransactionKind,
};
use crate::error::{BourseError, Result};

use super::position;

#[derive(Clone)]
pub struct OrderEngine {
    store: PostgresStore,
}

impl OrderEngine {
    pub fn new(store: PostgresStore) -> Self {
        Self { store }
    }

    /// Accept a trade request at the current market price.
    ///
    /// The price snapshot and the order insert happen in one statement, so
    /// a concurrent feed tick cannot slip between them. No balance,
    /// holding, or volume changes until settlement.
    #[instrument(skip(self))]
    pub async fn place(
        &self,
        user_id: i64,
        stock_id: i64,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<Order> {
        let quantity = round_quantity(quantity);
        if quantity <= Decimal::ZERO {
            return Err(BourseError::InvalidQuantity(format!(
                "quantity must be positive, got {quantity}"
            )));
        }

        // Surface a uniform NotFound for unknown users before writing.
        self.store.get_user(user_id).await?;

        let order = self
            .store
            .insert_order_at_market(user_id, stock_id, side, quantity)
            .await?
            .ok_or(BourseError::NotFound {
                entity: "stock",
                id: stock_id,
            })?;

        info!(
            order_id = order.id,
            user_id,
            stock_id,
            side = %side,
            %quantity,
            price_locked = %order.price_locked,
            "Placed order"
        );
        Ok(order)
    }

    /// Execute a pending order against current account and market state.
    ///
    /// Everything from the status check to the transaction record commits
    /// atomically. Rejections roll the transaction back untouched and are
    /// safe to re-submit; settling a non-pending order rejects with
    /// "not pending" rather than erroring.
    #[instrument(skip(self))]
    pub async fn settle(&self, order_id: i64) -> Result<SettleOutcome> {
        let mut tx = self.store.pool().begin().await?;

        // Row locks taken in a fixed order: order, then user, then stock.
        // Concurrent settlements of one order serialize on the first lock;
        // the loser re-reads a terminal status here.
        let order = fetch_order_for_update(&mut *tx, order_id).await?;
        if order.status != OrderStatus::Pending {
            return Ok(SettleOutcome::Rejected {
                reason: reject::NOT_PENDING,
            });
        }

        let user = fetch_user_for_update(&mut *tx, order.user_id).await?;
        let stock = fetch_stock_for_update(&mut *tx, order.stock_id).await?;

        let notional = order.notional();
        let new_funds = match order.side {
            OrderSide::Buy => {
                if stock.volume < order.quantity {
                    return Ok(SettleOutcome::Rejected {
                        reason: reject::INSUFFICIENT_VOLUME,
                    });
                }
                if user.funds < notional {
                    return Ok(SettleOutcome::Rejected {
                        reason: reject::INSUFFICIENT_FUNDS,
                    });
                }

                let new_funds = round_money(user.funds - notional);
                update_user_funds(&mut *tx, user.id, new_funds).await?;
                update_stock_volume(
                    &mut *tx,
                    stock.id,
                    round_quantity(stock.volume - order.quantity),
                )
                .await?;
                position::adjust(&mut *tx, user.id, stock.id, order.quantity).await?;
                insert_transaction(
                    &mut *tx,
                    user.id,
                    TransactionKind::Buy,
                    notional,
                    new_funds,
                    &format!(
                        "Bought {} {} @ {}",
                        order.quantity, stock.symbol, order.price_locked
                    ),
                )
                .await?;
                new_funds
            }
            OrderSide::Sell => {
                let held = fetch_holding_for_update(&mut *tx, user.id, stock.id)
                    .await?
                    .map(|h| h.quantity)
                    .unwrap_or(Decimal::ZERO);
                if held < order.quantity {
                    return Ok(SettleOutcome::Rejected {
                        reason: reject::NOT_ENOUGH_SHARES,
                    });
                }

                position::adjust(&mut *tx, user.id, stock.id, -order.quantity).await?;
                update_stock_volume(
                    &mut *tx,
                    stock.id,
                    round_quantity(stock.volume + order.quantity),
                )
                .await?;
                let new_funds = round_money(user.funds + notional);
                update_user_funds(&mut *tx, user.id, new_funds).await?;
                insert_transaction(
                    &mut *tx,
                    user.id,
                    TransactionKind::Sell,
                    notional,
                    new_funds,
                    &format!(
                        "Sold {} {} @ {}",
                        order.quantity, stock.symbol, order.price_locked
                    ),
                )
                .await?;
                new_funds
            }
        };

        let updated = mark_order_settled(&mut *tx, order.id, OrderStatus::Executed).await?;
        if updated == 0 {
            // Lost a race despite the row lock; nothing is committed.
            return Ok(SettleOutcome::Rejected {
                reason: reject::NOT_PENDING,
            });
        }

        tx.commit().await?;
        info!(
            order_id,
            side = %order.side,
            notional = %notional,
            balance_after = %new_funds,
            "Settled order"
        );
        Ok(SettleOutcome::Executed)
    }

    /// Void a pending order. No economic effect was applied at placement,
    /// so none is reversed; the order just becomes CANCELED.
    #[instrument(skip(self))]
    pub async fn cancel(&self, order_id: i64) -> Result<SettleOutcome> {
        let mut tx = self.store.pool().begin().await?;

        let order = fetch_order_for_update(&mut *tx, order_id).await?;
        if order.status != OrderStatus::Pending {
            return Ok(SettleOutcome::Rejected {
                reason: reject::NOT_PENDING,
            });
        }

        let updated = mark_order_settled(&mut *tx, order.id, OrderStatus::Canceled).await?;
        if updated == 0 {
            return Ok(SettleOutcome::Rejected {
                reason: reject::NOT_PENDING,
            });
        }

        tx.commit().await?;
        info!(order_id, "Canceled order");
        Ok(SettleOutcome::Canceled)
    }
}
