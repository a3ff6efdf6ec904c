//! 订单仓储的 PostgreSQL 实现
//!
//! 订单主表与收货/支付子表一对一、条目表一对多；写入在单事务内完成，
//! 重复标识符由主键唯一约束裁决（先写者胜，后写者得到 AlreadyExists）。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use order_shared::error::{OrderError, Result};

use super::traits::OrderRepository;
use crate::models::{Delivery, Item, Order, Payment};

/// 订单仓储
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_items(&self, uid: Uuid) -> Result<Vec<Item>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT chrt_id, track_number, price, rid, name, sale, size,
                   total_price, nm_id, brand, status
            FROM order_items
            WHERE order_uid = $1
            ORDER BY id ASC
            "#,
        )
        .bind(uid)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ItemRow::into_item).collect())
    }
}

/// orders 与 deliveries/payments 连接后的扁平行
#[derive(sqlx::FromRow)]
struct OrderRow {
    uid: Uuid,
    track_number: String,
    entry: String,
    locale: String,
    internal_signature: String,
    customer_id: String,
    delivery_service: String,
    shard_key: String,
    sm_id: i64,
    date_created: DateTime<Utc>,
    oof_shard: String,
    delivery_name: String,
    delivery_phone: String,
    delivery_zip: String,
    delivery_city: String,
    delivery_address: String,
    delivery_region: String,
    delivery_email: String,
    payment_transaction: String,
    payment_request_id: String,
    payment_currency: String,
    payment_provider: String,
    payment_amount: i64,
    payment_dt: i64,
    payment_bank: String,
    payment_delivery_cost: i64,
    payment_goods_total: i64,
    payment_custom_fee: i64,
}

impl OrderRow {
    fn into_order(self, items: Vec<Item>) -> Order {
        Order {
            order_uid: self.uid,
            track_number: self.track_number,
            entry: self.entry,
            locale: self.locale,
            internal_signature: self.internal_signature,
            customer_id: self.customer_id,
            delivery_service: self.delivery_service,
            shard_key: self.shard_key,
            sm_id: self.sm_id,
            date_created: Some(self.date_created),
            oof_shard: self.oof_shard,
            delivery: Delivery {
                name: self.delivery_name,
                phone: self.delivery_phone,
                zip: self.delivery_zip,
                city: self.delivery_city,
                address: self.delivery_address,
                region: self.delivery_region,
                email: self.delivery_email,
            },
            payment: Payment {
                transaction: self.payment_transaction,
                request_id: self.payment_request_id,
                currency: self.payment_currency,
                provider: self.payment_provider,
                amount: self.payment_amount,
                payment_dt: self.payment_dt,
                bank: self.payment_bank,
                delivery_cost: self.payment_delivery_cost,
                goods_total: self.payment_goods_total,
                custom_fee: self.payment_custom_fee,
            },
            items,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    chrt_id: i64,
    track_number: String,
    price: i64,
    rid: String,
    name: String,
    sale: i64,
    size: String,
    total_price: i64,
    nm_id: i64,
    brand: String,
    status: i32,
}

impl ItemRow {
    fn into_item(self) -> Item {
        Item {
            chrt_id: self.chrt_id,
            track_number: self.track_number,
            price: self.price,
            rid: self.rid,
            name: self.name,
            sale: self.sale,
            size: self.size,
            total_price: self.total_price,
            nm_id: self.nm_id,
            brand: self.brand,
            status: self.status,
        }
    }
}

const SELECT_ORDER: &str = r#"
SELECT o.uid, o.track_number, o.entry, o.locale, o.internal_signature,
       o.customer_id, o.delivery_service, o.shard_key, o.sm_id,
       o.date_created, o.oof_shard,
       d.name AS delivery_name, d.phone AS delivery_phone, d.zip AS delivery_zip,
       d.city AS delivery_city, d.address AS delivery_address,
       d.region AS delivery_region, d.email AS delivery_email,
       p.transaction AS payment_transaction, p.request_id AS payment_request_id,
       p.currency AS payment_currency, p.provider AS payment_provider,
       p.amount AS payment_amount, p.payment_dt AS payment_dt,
       p.bank AS payment_bank, p.delivery_cost AS payment_delivery_cost,
       p.goods_total AS payment_goods_total, p.custom_fee AS payment_custom_fee
FROM orders o
JOIN deliveries d ON d.id = o.delivery_id
JOIN payments p ON p.id = o.payment_id
"#;

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn get_by_uid(&self, uid: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{SELECT_ORDER} WHERE o.uid = $1"))
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            None => Ok(None),
            Some(row) => {
                let items = self.fetch_items(row.uid).await?;
                Ok(Some(row.into_order(items)))
            }
        }
    }

    async fn get_recent(&self, limit: i64) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_ORDER} ORDER BY o.date_created DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.fetch_items(row.uid).await?;
            orders.push(row.into_order(items));
        }
        Ok(orders)
    }

    async fn create(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let delivery_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO deliveries (name, phone, zip, city, address, region, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&order.delivery.name)
        .bind(&order.delivery.phone)
        .bind(&order.delivery.zip)
        .bind(&order.delivery.city)
        .bind(&order.delivery.address)
        .bind(&order.delivery.region)
        .bind(&order.delivery.email)
        .fetch_one(&mut *tx)
        .await?;

        let payment_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO payments (transaction, request_id, currency, provider, amount,
                                  payment_dt, bank, delivery_cost, goods_total, custom_fee)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(&order.payment.transaction)
        .bind(&order.payment.request_id)
        .bind(&order.payment.currency)
        .bind(&order.payment.provider)
        .bind(order.payment.amount)
        .bind(order.payment.payment_dt)
        .bind(&order.payment.bank)
        .bind(order.payment.delivery_cost)
        .bind(order.payment.goods_total)
        .bind(order.payment.custom_fee)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO orders (uid, track_number, entry, locale, internal_signature,
                                customer_id, delivery_service, shard_key, sm_id,
                                date_created, oof_shard, delivery_id, payment_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(order.order_uid)
        .bind(&order.track_number)
        .bind(&order.entry)
        .bind(&order.locale)
        .bind(&order.internal_signature)
        .bind(&order.customer_id)
        .bind(&order.delivery_service)
        .bind(&order.shard_key)
        .bind(order.sm_id)
        .bind(order.date_created)
        .bind(&order.oof_shard)
        .bind(delivery_id)
        .bind(payment_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, order.order_uid))?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_uid, chrt_id, track_number, price, rid,
                                         name, sale, size, total_price, nm_id, brand, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(order.order_uid)
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
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// 主键冲突映射为业务可见的 AlreadyExists，其余照常视为数据库错误
fn map_insert_error(err: sqlx::Error, uid: Uuid) -> OrderError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => OrderError::AlreadyExists {
            id: uid.to_string(),
        },
        _ => OrderError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_row_assembly() {
        let row = OrderRow {
            uid: Uuid::parse_str("b563feb7-b2b8-4b6a-9d7a-000000000001").unwrap(),
            track_number: "WBILMTESTTRACK".to_string(),
            entry: "WBIL".to_string(),
            locale: "en".to_string(),
            internal_signature: String::new(),
            customer_id: "test".to_string(),
            delivery_service: "meest".to_string(),
            shard_key: "9".to_string(),
            sm_id: 99,
            date_created: "2021-11-26T06:22:19Z".parse().unwrap(),
            oof_shard: "1".to_string(),
            delivery_name: "Test Testov".to_string(),
            delivery_phone: "+9720000000".to_string(),
            delivery_zip: "2639809".to_string(),
            delivery_city: "Kiryat Mozkin".to_string(),
            delivery_address: "Ploshad Mira 15".to_string(),
            delivery_region: "Kraiot".to_string(),
            delivery_email: "test@gmail.com".to_string(),
            payment_transaction: "b563feb7b2b84b6test".to_string(),
            payment_request_id: String::new(),
            payment_currency: "USD".to_string(),
            payment_provider: "wbpay".to_string(),
            payment_amount: 1817,
            payment_dt: 1637907727,
            payment_bank: "alpha".to_string(),
            payment_delivery_cost: 1500,
            payment_goods_total: 317,
            payment_custom_fee: 0,
        };

        let order = row.into_order(vec![]);
        assert_eq!(order.shard_key, "9");
        assert_eq!(order.delivery.city, "Kiryat Mozkin");
        assert_eq!(order.payment.goods_total, 317);
        assert!(order.date_created.is_some());
    }
}
