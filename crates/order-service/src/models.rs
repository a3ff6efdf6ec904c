//! 订单数据模型
//!
//! `Order` 与事件流上的 JSON 负载逐字段对应；缺失字段按零值反序列化
//! （nil uuid / 空串 / 0），由批量校验器统一报告，而不是在反序列化层拒绝。
//! 格式非法（类型不符、JSON 语法错误）仍然直接反序列化失败。
//!
//! `OrderView` 是唯一会进入缓存或返回给调用方的读优化投影。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{
    alpha_if_present, alphanum_if_present, digits_if_present, email_if_present, phone_if_present,
    uuid_present,
};

/// 收货信息
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Delivery {
    #[validate(length(min = 1, code = "required"))]
    pub name: String,
    /// phone 与 email 互为兜底：二者至少要有一个，互备规则在报告阶段合成
    #[validate(custom(function = phone_if_present))]
    pub phone: String,
    #[validate(custom(function = digits_if_present))]
    pub zip: String,
    #[validate(length(min = 1, code = "required"))]
    pub city: String,
    #[validate(length(min = 1, code = "required"))]
    pub address: String,
    pub region: String,
    #[validate(custom(function = email_if_present))]
    pub email: String,
}

/// 支付信息
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Payment {
    #[validate(custom(function = alphanum_if_present))]
    pub transaction: String,
    pub request_id: String,
    #[validate(custom(function = alpha_if_present))]
    pub currency: String,
    #[validate(length(min = 1, code = "required"))]
    pub provider: String,
    #[validate(range(min = 1, code = "required"))]
    pub amount: i64,
    #[validate(range(min = 1, code = "required"))]
    pub payment_dt: i64,
    #[validate(length(min = 1, code = "required"))]
    pub bank: String,
    #[validate(range(min = 1, code = "required"))]
    pub delivery_cost: i64,
    #[validate(range(min = 1, code = "required"))]
    pub goods_total: i64,
    pub custom_fee: i64,
}

/// 订单条目
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Item {
    #[validate(range(min = 1, code = "required"))]
    pub chrt_id: i64,
    #[validate(custom(function = alphanum_if_present))]
    pub track_number: String,
    #[validate(range(min = 1, code = "required"))]
    pub price: i64,
    #[validate(custom(function = alphanum_if_present))]
    pub rid: String,
    #[validate(custom(function = alphanum_if_present))]
    pub name: String,
    pub sale: i64,
    pub size: String,
    #[validate(range(min = 1, code = "required"))]
    pub total_price: i64,
    #[validate(range(min = 1, code = "required"))]
    pub nm_id: i64,
    #[validate(length(min = 1, code = "required"))]
    pub brand: String,
    #[validate(range(min = 1, code = "required"))]
    pub status: i32,
}

/// 订单记录：持久化实体，创建后不再变更
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Order {
    #[validate(custom(function = uuid_present))]
    pub order_uid: Uuid,
    #[validate(length(min = 1, code = "required"))]
    pub track_number: String,
    #[validate(length(min = 1, code = "required"))]
    pub entry: String,
    pub locale: String,
    pub internal_signature: String,
    #[validate(length(min = 1, code = "required"))]
    pub customer_id: String,
    #[validate(length(min = 1, code = "required"))]
    pub delivery_service: String,
    #[serde(rename = "shardkey")]
    #[validate(length(min = 1, code = "required"))]
    pub shard_key: String,
    #[validate(range(min = 1, code = "required"))]
    pub sm_id: i64,
    #[validate(required)]
    pub date_created: Option<DateTime<Utc>>,
    #[validate(length(min = 1, code = "required"))]
    pub oof_shard: String,
    #[validate(nested)]
    pub delivery: Delivery,
    #[validate(nested)]
    pub payment: Payment,
    #[validate(nested)]
    pub items: Vec<Item>,
}

impl Order {
    /// 派生只读投影；条目顺序保持事件中的插入顺序
    pub fn to_view(&self) -> OrderView {
        OrderView {
            delivery_service: self.delivery_service.clone(),
            // 校验通过的订单 date_created 必为 Some
            date_created: self.date_created.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            delivery: DeliveryView {
                name: self.delivery.name.clone(),
                phone: self.delivery.phone.clone(),
                zip: self.delivery.zip.clone(),
                city: self.delivery.city.clone(),
                address: self.delivery.address.clone(),
                region: self.delivery.region.clone(),
                email: self.delivery.email.clone(),
            },
            payment: PaymentView {
                currency: self.payment.currency.clone(),
                provider: self.payment.provider.clone(),
                amount: self.payment.amount,
                delivery_cost: self.payment.delivery_cost,
                goods_total: self.payment.goods_total,
            },
            items: self
                .items
                .iter()
                .map(|item| ItemView {
                    name: item.name.clone(),
                    total_price: item.total_price,
                    brand: item.brand.clone(),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// 读优化投影
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryView {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentView {
    pub currency: String,
    pub provider: String,
    pub amount: i64,
    pub delivery_cost: i64,
    pub goods_total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub name: String,
    pub total_price: i64,
    pub brand: String,
}

/// 订单的读优化投影，缓存和读接口返回的唯一形态
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderView {
    pub delivery_service: String,
    pub date_created: DateTime<Utc>,
    pub delivery: DeliveryView,
    pub payment: PaymentView,
    pub items: Vec<ItemView>,
}

// ---------------------------------------------------------------------------
// 测试夹具
// ---------------------------------------------------------------------------

/// 单元测试共用的合法订单夹具
#[cfg(test)]
pub(crate) fn valid_order_fixture() -> Order {
    Order {
        order_uid: Uuid::parse_str("b563feb7-b2b8-4b6a-9d7a-000000000001").unwrap(),
        track_number: "WBILMTESTTRACK".to_string(),
        entry: "WBIL".to_string(),
        locale: "en".to_string(),
        internal_signature: String::new(),
        customer_id: "test".to_string(),
        delivery_service: "meest".to_string(),
        shard_key: "9".to_string(),
        sm_id: 99,
        date_created: Some("2021-11-26T06:22:19Z".parse().unwrap()),
        oof_shard: "1".to_string(),
        delivery: Delivery {
            name: "Test Testov".to_string(),
            phone: "+9720000000".to_string(),
            zip: "2639809".to_string(),
            city: "Kiryat Mozkin".to_string(),
            address: "Ploshad Mira 15".to_string(),
            region: "Kraiot".to_string(),
            email: "test@gmail.com".to_string(),
        },
        payment: Payment {
            transaction: "b563feb7b2b84b6test".to_string(),
            request_id: String::new(),
            currency: "USD".to_string(),
            provider: "wbpay".to_string(),
            amount: 1817,
            payment_dt: 1637907727,
            bank: "alpha".to_string(),
            delivery_cost: 1500,
            goods_total: 317,
            custom_fee: 0,
        },
        items: vec![Item {
            chrt_id: 9934930,
            track_number: "WBILMTESTTRACK".to_string(),
            price: 453,
            rid: "ab4219087a764ae0btest".to_string(),
            name: "Mascaras".to_string(),
            sale: 30,
            size: "0".to_string(),
            total_price: 317,
            nm_id: 2389212,
            brand: "Vivienne Sabo".to_string(),
            status: 202,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_view_projects_subset() {
        let order = valid_order_fixture();
        let view = order.to_view();

        assert_eq!(view.delivery_service, "meest");
        assert_eq!(view.date_created, order.date_created.unwrap());
        assert_eq!(view.delivery.city, "Kiryat Mozkin");
        assert_eq!(view.payment.currency, "USD");
        assert_eq!(view.payment.amount, 1817);
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].name, "Mascaras");
        assert_eq!(view.items[0].total_price, 317);
        assert_eq!(view.items[0].brand, "Vivienne Sabo");
    }

    #[test]
    fn test_to_view_preserves_item_order() {
        let mut order = valid_order_fixture();
        let mut second = order.items[0].clone();
        second.name = "Lipstick".to_string();
        order.items.push(second);

        let view = order.to_view();
        assert_eq!(view.items[0].name, "Mascaras");
        assert_eq!(view.items[1].name, "Lipstick");
    }

    #[test]
    fn test_deserialize_wire_names() {
        let json = r#"{
            "order_uid": "b563feb7-b2b8-4b6a-9d7a-000000000001",
            "shardkey": "9",
            "sm_id": 99
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.shard_key, "9");
        assert_eq!(order.sm_id, 99);
        // 缺失字段按零值填充，由校验层报告
        assert!(order.track_number.is_empty());
        assert!(order.date_created.is_none());
        assert!(order.items.is_empty());
    }

    #[test]
    fn test_deserialize_missing_uid_defaults_to_nil() {
        let order: Order = serde_json::from_str("{}").unwrap();
        assert!(order.order_uid.is_nil());
    }

    #[test]
    fn test_deserialize_rejects_malformed_json() {
        let result: Result<Order, _> = serde_json::from_str(r#"{"sm_id": "not a number"}"#);
        assert!(result.is_err());
    }
}
