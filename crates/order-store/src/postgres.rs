use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};

use common::{Delivery, Item, Payment};

use crate::{Order, OrderRepository, OrderUid, Result, StoreError};

const ORDER_COLUMNS: &str = "order_uid, track_number, entry, locale, internal_signature, \
     customer_id, delivery_service, shardkey, sm_id, date_created, oof_shard";

const DELIVERY_COLUMNS: &str = "order_uid, name, phone, zip, city, address, region, email";

const PAYMENT_COLUMNS: &str = "order_uid, transaction, request_id, currency, provider, amount, \
     payment_dt, bank, delivery_cost, goods_total, custom_fee";

const ITEM_COLUMNS: &str = "order_uid, chrt_id, track_number, price, rid, name, sale, size, \
     total_price, nm_id, brand, status";

/// PostgreSQL-backed order repository.
///
/// An order is spread over four tables (`orders`, `deliveries`, `payments`,
/// `items`); writes go through a single transaction.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Creates a new repository on top of an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool and verifies the connection.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .max_lifetime(Duration::from_secs(300))
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Closes the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        Ok(Order {
            order_uid: OrderUid::new(row.try_get::<String, _>("order_uid")?),
            track_number: row.try_get("track_number")?,
            entry: row.try_get("entry")?,
            locale: row.try_get("locale")?,
            internal_signature: row.try_get("internal_signature")?,
            customer_id: row.try_get("customer_id")?,
            delivery_service: row.try_get("delivery_service")?,
            shardkey: row.try_get("shardkey")?,
            sm_id: row.try_get("sm_id")?,
            date_created: row.try_get("date_created")?,
            oof_shard: row.try_get("oof_shard")?,
            ..Default::default()
        })
    }

    fn row_to_delivery(row: &PgRow) -> Result<Delivery> {
        Ok(Delivery {
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            zip: row.try_get("zip")?,
            city: row.try_get("city")?,
            address: row.try_get("address")?,
            region: row.try_get("region")?,
            email: row.try_get("email")?,
        })
    }

    fn row_to_payment(row: &PgRow) -> Result<Payment> {
        Ok(Payment {
            transaction: row.try_get("transaction")?,
            request_id: row.try_get("request_id")?,
            currency: row.try_get("currency")?,
            provider: row.try_get("provider")?,
            amount: row.try_get("amount")?,
            payment_dt: row.try_get("payment_dt")?,
            bank: row.try_get("bank")?,
            delivery_cost: row.try_get("delivery_cost")?,
            goods_total: row.try_get("goods_total")?,
            custom_fee: row.try_get("custom_fee")?,
        })
    }

    fn row_to_item(row: &PgRow) -> Result<Item> {
        Ok(Item {
            chrt_id: row.try_get("chrt_id")?,
            track_number: row.try_get("track_number")?,
            price: row.try_get("price")?,
            rid: row.try_get("rid")?,
            name: row.try_get("name")?,
            sale: row.try_get("sale")?,
            size: row.try_get("size")?,
            total_price: row.try_get("total_price")?,
            nm_id: row.try_get("nm_id")?,
            brand: row.try_get("brand")?,
            status: row.try_get("status")?,
        })
    }

    async fn insert_nested(tx: &mut Transaction<'_, Postgres>, order: &Order) -> Result<()> {
        let uid = order.order_uid.as_str();
        let delivery = &order.delivery;
        sqlx::query(
            r#"
            INSERT INTO deliveries (order_uid, name, phone, zip, city, address, region, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(uid)
        .bind(&delivery.name)
        .bind(&delivery.phone)
        .bind(&delivery.zip)
        .bind(&delivery.city)
        .bind(&delivery.address)
        .bind(&delivery.region)
        .bind(&delivery.email)
        .execute(&mut **tx)
        .await?;

        let payment = &order.payment;
        sqlx::query(
            r#"
            INSERT INTO payments (order_uid, transaction, request_id, currency, provider,
                                  amount, payment_dt, bank, delivery_cost, goods_total, custom_fee)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(uid)
        .bind(&payment.transaction)
        .bind(&payment.request_id)
        .bind(&payment.currency)
        .bind(&payment.provider)
        .bind(payment.amount)
        .bind(payment.payment_dt)
        .bind(&payment.bank)
        .bind(payment.delivery_cost)
        .bind(payment.goods_total)
        .bind(payment.custom_fee)
        .execute(&mut **tx)
        .await?;

        for (index, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO items (order_uid, item_index, chrt_id, track_number, price, rid, name,
                                   sale, size, total_price, nm_id, brand, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(uid)
            .bind(index as i32)
            .bind(item.chrt_id)
            .bind(&item.track_number)
            .bind(item.price)
            .bind(&item.rid)
            .bind(&item.name)
            .bind(item.sale)
            .bind(&item.size)
            .bind(item.total_price)
            .bind(item.nm_id)
            .bind(&item.brand)
            .bind(item.status)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    #[tracing::instrument(skip(self, order), fields(order_uid = %order.order_uid))]
    async fn create(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (order_uid, track_number, entry, locale, internal_signature,
                                customer_id, delivery_service, shardkey, sm_id, date_created, oof_shard)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.order_uid.as_str())
        .bind(&order.track_number)
        .bind(&order.entry)
        .bind(&order.locale)
        .bind(&order.internal_signature)
        .bind(&order.customer_id)
        .bind(&order.delivery_service)
        .bind(&order.shardkey)
        .bind(order.sm_id)
        .bind(order.date_created)
        .bind(&order.oof_shard)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_pkey")
            {
                return StoreError::AlreadyExists(order.order_uid.clone());
            }
            StoreError::Database(e)
        })?;

        Self::insert_nested(&mut tx, order).await?;

        // Dropping the transaction without commit rolls everything back.
        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, order_uid), fields(order_uid = %order_uid))]
    async fn read(&self, order_uid: &OrderUid) -> Result<Order> {
        let uid = order_uid.as_str();

        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_uid = $1"
        ))
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(order_uid.clone()))?;
        let mut order = Self::row_to_order(&row)?;

        let row = sqlx::query(&format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE order_uid = $1"
        ))
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::Incomplete {
            order_uid: order_uid.clone(),
            missing: "delivery",
        })?;
        order.delivery = Self::row_to_delivery(&row)?;

        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_uid = $1"
        ))
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::Incomplete {
            order_uid: order_uid.clone(),
            missing: "payment",
        })?;
        order.payment = Self::row_to_payment(&row)?;

        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE order_uid = $1 ORDER BY item_index ASC"
        ))
        .bind(uid)
        .fetch_all(&self.pool)
        .await?;
        order.items = rows
            .iter()
            .map(Self::row_to_item)
            .collect::<Result<Vec<_>>>()?;
        if order.items.is_empty() {
            return Err(StoreError::Incomplete {
                order_uid: order_uid.clone(),
                missing: "items",
            });
        }

        Ok(order)
    }

    /// Loads every aggregate with one scan per table instead of one
    /// round trip per order. Orders missing their delivery, their payment
    /// or all of their items are skipped and logged.
    #[tracing::instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<Order>> {
        let headers = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY order_uid ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut deliveries = HashMap::new();
        let sql = format!("SELECT {DELIVERY_COLUMNS} FROM deliveries");
        let mut rows = sqlx::query(&sql).fetch(&self.pool);
        while let Some(row) = rows.try_next().await? {
            let uid: String = row.try_get("order_uid")?;
            deliveries.insert(uid, Self::row_to_delivery(&row)?);
        }
        drop(rows);

        let mut payments = HashMap::new();
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments");
        let mut rows = sqlx::query(&sql).fetch(&self.pool);
        while let Some(row) = rows.try_next().await? {
            let uid: String = row.try_get("order_uid")?;
            payments.insert(uid, Self::row_to_payment(&row)?);
        }
        drop(rows);

        let mut items: HashMap<String, Vec<Item>> = HashMap::new();
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY order_uid ASC, item_index ASC");
        let mut rows = sqlx::query(&sql).fetch(&self.pool);
        while let Some(row) = rows.try_next().await? {
            let uid: String = row.try_get("order_uid")?;
            items.entry(uid).or_default().push(Self::row_to_item(&row)?);
        }
        drop(rows);

        let mut orders = Vec::with_capacity(headers.len());
        for row in &headers {
            let mut order = Self::row_to_order(row)?;
            let uid = order.order_uid.as_str();

            let (Some(delivery), Some(payment), Some(order_items)) = (
                deliveries.remove(uid),
                payments.remove(uid),
                items.remove(uid).filter(|items| !items.is_empty()),
            ) else {
                tracing::warn!(order_uid = %order.order_uid, "skipping incomplete order");
                metrics::counter!("order_store_incomplete_orders_skipped").increment(1);
                continue;
            };

            order.delivery = delivery;
            order.payment = payment;
            order.items = order_items;
            orders.push(order);
        }

        tracing::debug!(orders = orders.len(), "loaded all orders");
        Ok(orders)
    }
}
