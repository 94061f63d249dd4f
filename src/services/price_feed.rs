//! Background market price drift.
//!
//! On a fixed cadence every stock's price moves by a bounded uniform draw
//! plus a small constant upward drift, floored and rounded to cents. Each
//! tick is one database transaction over the whole catalog. Orders are
//! untouched: settlement reads `price_locked`, never the live price.

use rand::Rng;
use rust_decimal::Decimal;
use sqlx::Row;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::adapters::PostgresStore;
use crate::config::FeedConfig;
use crate::domain::drifted_price;
use crate::error::Result;

pub struct PriceFeed {
    store: PostgresStore,
    config: FeedConfig,
}

impl PriceFeed {
    pub fn new(store: PostgresStore, config: FeedConfig) -> Self {
        Self { store, config }
    }

    /// Run the feed on its own task. The loop outlives any single tick
    /// failure: a failed tick is logged and the next one runs on
    /// schedule.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                tick_secs = self.config.tick_secs,
                noise_bound = self.config.noise_bound,
                drift = self.config.drift,
                "Price feed started"
            );

            let mut ticker = interval(Duration::from_secs(self.config.tick_secs));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so prices hold
            // for one full interval after startup.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match self.tick().await {
                    Ok(count) => debug!(stocks = count, "Applied price tick"),
                    Err(e) => error!(error = %e, "Price tick failed"),
                }
            }
        })
    }

    /// Apply one batch of price moves. All stocks update in a single
    /// transaction; a failure leaves every price as it was.
    pub async fn tick(&self) -> Result<usize> {
        let mut tx = self.store.pool().begin().await?;

        let rows = sqlx::query("SELECT id, price FROM stocks ORDER BY id FOR UPDATE")
            .fetch_all(&mut *tx)
            .await?;

        for row in &rows {
            let id: i64 = row.get("id");
            let price: Decimal = row.get("price");

            let noise = {
                let mut rng = rand::thread_rng();
                rng.gen_range(-self.config.noise_bound..=self.config.noise_bound)
            };
            let next = drifted_price(price, noise, self.config.drift, self.config.price_floor);

            if next != price {
                sqlx::query("UPDATE stocks SET price = $1, updated_at = NOW() WHERE id = $2")
                    .bind(next)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(rows.len())
    }
}
