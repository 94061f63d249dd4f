use crate::domain::{
    CardBrand, Holding, Order, OrderSide, OrderStatus, PaymentMethod, Role, Stock, Transaction,
    TransactionKind, User,
};
use crate::error::{BourseError, Result};
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{info, instrument};

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

const USER_COLUMNS: &str = "id, username, email, credential_hash, role, funds, created_at";
const STOCK_COLUMNS: &str = "id, symbol, name, price, volume, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, user_id, stock_id, side, quantity, price_locked, status, \
                             created_at, executed_at, canceled_at";
const PAYMENT_COLUMNS: &str =
    "id, user_id, brand, last4, exp_month, exp_year, is_default, token, created_at";

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a store from an existing connection pool (zero-cost reuse)
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ==================== Users ====================

    /// Register an account. Funds are seeded by the schema default.
    #[instrument(skip(self, credential_hash))]
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        credential_hash: &str,
        role: Role,
    ) -> Result<User> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (username, email, credential_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(username)
        .bind(email)
        .bind(credential_hash)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
                BourseError::Validation("username or email already registered".to_string())
            } else {
                e.into()
            }
        })?;

        user_from_row(&row)
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(BourseError::NotFound { entity: "user", id })?;

        user_from_row(&row)
    }

    // ==================== Stocks ====================

    /// Create a catalog entry. Rejects before insert when the symbol is taken.
    #[instrument(skip(self))]
    pub async fn create_stock(
        &self,
        symbol: &str,
        name: &str,
        price: Decimal,
        volume: Decimal,
    ) -> Result<Stock> {
        let taken = sqlx::query("SELECT 1 AS one FROM stocks WHERE symbol = $1")
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await?;
        if taken.is_some() {
            return Err(BourseError::DuplicateSymbol(symbol.to_string()));
        }

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO stocks (symbol, name, price, volume)
            VALUES ($1, $2, $3, $4)
            RETURNING {STOCK_COLUMNS}
            "#,
        ))
        .bind(symbol)
        .bind(name)
        .bind(price)
        .bind(volume)
        .fetch_one(&self.pool)
        .await?;

        stock_from_row(&row)
    }

    pub async fn get_stock(&self, id: i64) -> Result<Stock> {
        let row = sqlx::query(&format!("SELECT {STOCK_COLUMNS} FROM stocks WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(BourseError::NotFound { entity: "stock", id })?;

        stock_from_row(&row)
    }

    pub async fn list_stocks(&self) -> Result<Vec<Stock>> {
        let rows = sqlx::query(&format!(
            "SELECT {STOCK_COLUMNS} FROM stocks ORDER BY symbol ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(stock_from_row).collect()
    }

    /// Admin edit of a catalog entry. Unset fields keep their value.
    #[instrument(skip(self))]
    pub async fn update_stock(
        &self,
        id: i64,
        name: Option<&str>,
        price: Option<Decimal>,
        volume: Option<Decimal>,
    ) -> Result<Stock> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE stocks SET
                name = COALESCE($2, name),
                price = COALESCE($3, price),
                volume = COALESCE($4, volume),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {STOCK_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(name)
        .bind(price)
        .bind(volume)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BourseError::NotFound { entity: "stock", id })?;

        stock_from_row(&row)
    }

    /// Delete a catalog entry. Forbidden while any holding or order row
    /// still references the stock; order history is never cascaded away.
    #[instrument(skip(self))]
    pub async fn delete_stock(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let referenced = sqlx::query(
            r#"
            SELECT EXISTS (SELECT 1 FROM holdings WHERE stock_id = $1)
                OR EXISTS (SELECT 1 FROM orders WHERE stock_id = $1) AS referenced
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?
        .get::<bool, _>("referenced");

        if referenced {
            return Err(BourseError::StockInUse(id));
        }

        let result = sqlx::query("DELETE FROM stocks WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BourseError::NotFound { entity: "stock", id });
        }

        tx.commit().await?;
        info!("Deleted stock {}", id);
        Ok(())
    }

    // ==================== Orders ====================

    /// Insert a PENDING order, snapshotting the live stock price into
    /// `price_locked` in the same statement. Returns `None` when the
    /// stock does not exist.
    pub(crate) async fn insert_order_at_market(
        &self,
        user_id: i64,
        stock_id: i64,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (user_id, stock_id, side, quantity, price_locked)
            SELECT $1, id, $2, $3, price FROM stocks WHERE id = $4
            RETURNING {ORDER_COLUMNS}
            "#,
        ))
        .bind(user_id)
        .bind(side.as_str())
        .bind(quantity)
        .bind(stock_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    pub async fn get_order(&self, id: i64) -> Result<Order> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(BourseError::NotFound { entity: "order", id })?;

        order_from_row(&row)
    }

    /// A user's orders, most recent first.
    pub async fn list_orders(&self, user_id: i64) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(order_from_row).collect()
    }

    // ==================== Holdings ====================

    /// A user's current positions. Empty positions do not exist as rows,
    /// so no filtering is needed.
    pub async fn list_holdings(&self, user_id: i64) -> Result<Vec<Holding>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, stock_id, quantity, updated_at
            FROM holdings
            WHERE user_id = $1
            ORDER BY stock_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(holding_from_row).collect()
    }

    /// The (user, stock) holding, if any.
    pub async fn get_holding(&self, user_id: i64, stock_id: i64) -> Result<Option<Holding>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, stock_id, quantity, updated_at
            FROM holdings
            WHERE user_id = $1 AND stock_id = $2
            "#,
        )
        .bind(user_id)
        .bind(stock_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(holding_from_row).transpose()
    }

    // ==================== Transactions ====================

    /// A user's transactions, most recent first.
    pub async fn list_transactions(&self, user_id: i64) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, kind, amount, balance_after, note, created_at
            FROM transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(transaction_from_row).collect()
    }

    // ==================== Payment methods ====================

    /// Store a card. The first card on file always becomes the default;
    /// setting a new default clears the previous one in the same
    /// transaction.
    #[instrument(skip(self, token))]
    pub async fn add_payment_method(
        &self,
        user_id: i64,
        brand: CardBrand,
        last4: &str,
        exp_month: i16,
        exp_year: i16,
        token: &str,
        make_default: bool,
    ) -> Result<PaymentMethod> {
        let mut tx = self.pool.begin().await?;

        let has_any = sqlx::query("SELECT 1 AS one FROM payment_methods WHERE user_id = $1 LIMIT 1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        let is_default = make_default || !has_any;

        if is_default && has_any {
            sqlx::query("UPDATE payment_methods SET is_default = FALSE WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO payment_methods (user_id, brand, last4, exp_month, exp_year, is_default, token)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PAYMENT_COLUMNS}
            "#,
        ))
        .bind(user_id)
        .bind(brand.as_str())
        .bind(last4)
        .bind(exp_month)
        .bind(exp_year)
        .bind(is_default)
        .bind(token)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        payment_method_from_row(&row)
    }

    pub async fn list_payment_methods(&self, user_id: i64) -> Result<Vec<PaymentMethod>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM payment_methods
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(payment_method_from_row).collect()
    }

    #[instrument(skip(self))]
    pub async fn set_default_payment_method(&self, user_id: i64, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE payment_methods SET is_default = FALSE WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let result =
            sqlx::query("UPDATE payment_methods SET is_default = TRUE WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(BourseError::NotFound {
                entity: "payment method",
                id,
            });
        }

        tx.commit().await?;
        Ok(())
    }

    /// Remove a card. Removing the default leaves the user with no
    /// default; no other card is silently promoted.
    #[instrument(skip(self))]
    pub async fn remove_payment_method(&self, user_id: i64, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM payment_methods WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BourseError::NotFound {
                entity: "payment method",
                id,
            });
        }
        Ok(())
    }

    /// Resolve the card a deposit should charge: the explicit id when
    /// given (and owned by the user), otherwise the user's default.
    /// Either miss is `NoPaymentMethod`.
    pub async fn resolve_payment_method(
        &self,
        user_id: i64,
        id: Option<i64>,
    ) -> Result<PaymentMethod> {
        let row = match id {
            Some(id) => {
                sqlx::query(&format!(
                    "SELECT {PAYMENT_COLUMNS} FROM payment_methods WHERE id = $1 AND user_id = $2"
                ))
                .bind(id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {PAYMENT_COLUMNS} FROM payment_methods WHERE user_id = $1 AND is_default"
                ))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        let row = row.ok_or(BourseError::NoPaymentMethod)?;
        payment_method_from_row(&row)
    }
}

// ==================== In-transaction helpers ====================
//
// These run inside a caller-owned transaction and take row locks; the
// engine opens the transaction, calls them in a fixed order (order, user,
// stock), and commits or rolls back as one unit.

pub(crate) async fn fetch_order_for_update(conn: &mut PgConnection, id: i64) -> Result<Order> {
    let row = sqlx::query(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or(BourseError::NotFound { entity: "order", id })?;

    order_from_row(&row)
}

pub(crate) async fn fetch_user_for_update(conn: &mut PgConnection, id: i64) -> Result<User> {
    let row = sqlx::query(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or(BourseError::NotFound { entity: "user", id })?;

    user_from_row(&row)
}

pub(crate) async fn fetch_stock_for_update(conn: &mut PgConnection, id: i64) -> Result<Stock> {
    let row = sqlx::query(&format!(
        "SELECT {STOCK_COLUMNS} FROM stocks WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or(BourseError::NotFound { entity: "stock", id })?;

    stock_from_row(&row)
}

pub(crate) async fn fetch_holding_for_update(
    conn: &mut PgConnection,
    user_id: i64,
    stock_id: i64,
) -> Result<Option<Holding>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, stock_id, quantity, updated_at
        FROM holdings
        WHERE user_id = $1 AND stock_id = $2
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .bind(stock_id)
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(holding_from_row).transpose()
}

pub(crate) async fn update_user_funds(
    conn: &mut PgConnection,
    id: i64,
    funds: Decimal,
) -> Result<()> {
    sqlx::query("UPDATE users SET funds = $1 WHERE id = $2")
        .bind(funds)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

pub(crate) async fn update_stock_volume(
    conn: &mut PgConnection,
    id: i64,
    volume: Decimal,
) -> Result<()> {
    sqlx::query("UPDATE stocks SET volume = $1, updated_at = NOW() WHERE id = $2")
        .bind(volume)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

pub(crate) async fn insert_transaction(
    conn: &mut PgConnection,
    user_id: i64,
    kind: TransactionKind,
    amount: Decimal,
    balance_after: Decimal,
    note: &str,
) -> Result<Transaction> {
    let row = sqlx::query(
        r#"
        INSERT INTO transactions (user_id, kind, amount, balance_after, note)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, kind, amount, balance_after, note, created_at
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(amount)
    .bind(balance_after)
    .bind(note)
    .fetch_one(conn)
    .await?;

    transaction_from_row(&row)
}

/// Flip a PENDING order to a terminal status. The `status = 'PENDING'`
/// guard is the compare-and-swap: a concurrent settlement that lost the
/// row lock race sees zero rows affected.
pub(crate) async fn mark_order_settled(
    conn: &mut PgConnection,
    id: i64,
    status: OrderStatus,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE orders SET
            status = $1,
            executed_at = CASE WHEN $1 = 'EXECUTED' THEN NOW() ELSE executed_at END,
            canceled_at = CASE WHEN $1 = 'CANCELED' THEN NOW() ELSE canceled_at END
        WHERE id = $2 AND status = 'PENDING'
        "#,
    )
    .bind(status.as_str())
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

// ==================== Row mapping ====================

fn parse<T: for<'a> TryFrom<&'a str, Error = String>>(value: String) -> Result<T> {
    T::try_from(value.as_str()).map_err(BourseError::Internal)
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        credential_hash: row.get("credential_hash"),
        role: parse::<Role>(row.get("role"))?,
        funds: row.get("funds"),
        created_at: row.get("created_at"),
    })
}

fn stock_from_row(row: &PgRow) -> Result<Stock> {
    Ok(Stock {
        id: row.get("id"),
        symbol: row.get("symbol"),
        name: row.get("name"),
        price: row.get("price"),
        volume: row.get("volume"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn order_from_row(row: &PgRow) -> Result<Order> {
    Ok(Order {
        id: row.get("id"),
        user_id: row.get("user_id"),
        stock_id: row.get("stock_id"),
        side: parse(row.get("side"))?,
        quantity: row.get("quantity"),
        price_locked: row.get("price_locked"),
        status: parse(row.get("status"))?,
        created_at: row.get("created_at"),
        executed_at: row.get("executed_at"),
        canceled_at: row.get("canceled_at"),
    })
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction> {
    Ok(Transaction {
        id: row.get("id"),
        user_id: row.get("user_id"),
        kind: parse(row.get("kind"))?,
        amount: row.get("amount"),
        balance_after: row.get("balance_after"),
        note: row.get("note"),
        created_at: row.get("created_at"),
    })
}

fn payment_method_from_row(row: &PgRow) -> Result<PaymentMethod> {
    Ok(PaymentMethod {
        id: row.get("id"),
        user_id: row.get("user_id"),
        brand: parse(row.get("brand"))?,
        last4: row.get("last4"),
        exp_month: row.get("exp_month"),
        exp_year: row.get("exp_year"),
        is_default: row.get("is_default"),
        token: row.get("token"),
        created_at: row.get("created_at"),
    })
}

fn holding_from_row(row: &PgRow) -> Result<Holding> {
    Ok(Holding {
        id: row.get("id"),
        user_id: row.get("user_id"),
        stock_id: row.get("stock_id"),
        quantity: row.get("quantity"),
        updated_at: row.get("updated_at"),
    })
}
