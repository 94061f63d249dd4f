//! Holding quantity adjustment inside an open settlement transaction.

use rust_decimal::Decimal;
use sqlx::postgres::PgConnection;

use crate::adapters::postgres::fetch_holding_for_update;
use crate::domain::round_quantity;
use crate::error::Result;

/// Apply a quantity delta to the (user, stock) holding.
///
/// An existing holding gets `quantity + delta` rounded to 6 dp and is
/// deleted when the result is <= 0. A missing holding is created when
/// `delta > 0` and left absent otherwise.
///
/// Precondition: callers passing a negative delta must already have
/// validated, under the same transaction's row locks, that the holding
/// covers it. No sufficiency check happens here; the order engine is the
/// only negative-delta caller.
pub(crate) async fn adjust(
    conn: &mut PgConnection,
    user_id: i64,
    stock_id: i64,
    delta: Decimal,
) -> Result<()> {
    match fetch_holding_for_update(conn, user_id, stock_id).await? {
        Some(holding) => {
            let next = round_quantity(holding.quantity + delta);
            if next <= Decimal::ZERO {
                sqlx::query("DELETE FROM holdings WHERE id = $1")
                    .bind(holding.id)
                    .execute(conn)
                    .await?;
            } else {
                sqlx::query("UPDATE holdings SET quantity = $1, updated_at = NOW() WHERE id = $2")
                    .bind(next)
                    .bind(holding.id)
                    .execute(conn)
                    .await?;
            }
        }
        None if delta > Decimal::ZERO => {
            sqlx::query(
                r#"
                INSERT INTO holdings (user_id, stock_id, quantity)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(user_id)
            .bind(stock_id)
            .bind(round_quantity(delta))
            .execute(conn)
            .await?;
        }
        // Absent holding, non-positive delta: nothing to do.
        None => {}
    }

    Ok(())
}
