//! 订单批量校验
//!
//! 对 `Order` 执行一次完整校验，收集全部违规而非首个，
//! 渲染为确定顺序的多行报告（顶层字段 -> delivery -> payment -> items 按下标），
//! 每行格式为 `字段路径: 规则名`。
//!
//! validator 的错误容器按哈希键组织，顺序不稳定，因此渲染按显式的
//! 字段顺序表遍历；phone/email 互备规则 validator 没有对应物，在
//! 报告阶段合成两条违规。

use std::sync::LazyLock;

use regex::Regex;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use order_shared::error::OrderError;

use crate::models::Order;

// ---------------------------------------------------------------------------
// 字段级校验函数（derive 引用）
// ---------------------------------------------------------------------------

static E164_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").unwrap());
static ALPHANUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+$").unwrap());
static ALPHA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z]+$").unwrap());
static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+$").unwrap());

/// 标识符必须存在（serde 对缺失字段填 nil uuid）
pub fn uuid_present(uid: &uuid::Uuid) -> Result<(), ValidationError> {
    if uid.is_nil() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

/// 非空时必须为 E.164 风格电话号码
pub fn phone_if_present(phone: &str) -> Result<(), ValidationError> {
    if phone.is_empty() || E164_RE.is_match(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("e164"))
    }
}

/// 非空时必须为合法邮箱
pub fn email_if_present(email: &str) -> Result<(), ValidationError> {
    use validator::ValidateEmail;

    if email.is_empty() || email.validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email"))
    }
}

/// 非空时只允许数字
pub fn digits_if_present(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || DIGITS_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("numeric"))
    }
}

/// 非空时只允许字母与数字
pub fn alphanum_if_present(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || ALPHANUM_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("alphanum"))
    }
}

/// 非空时只允许字母
pub fn alpha_if_present(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || ALPHA_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("alpha"))
    }
}

// ---------------------------------------------------------------------------
// 报告渲染
// ---------------------------------------------------------------------------

/// 报告中顶层字段的输出顺序
const ORDER_FIELDS: &[&str] = &[
    "order_uid",
    "track_number",
    "entry",
    "customer_id",
    "delivery_service",
    "shard_key",
    "sm_id",
    "date_created",
    "oof_shard",
];

const DELIVERY_FIELDS: &[&str] = &["name", "phone", "zip", "city", "address", "email"];

const PAYMENT_FIELDS: &[&str] = &[
    "transaction",
    "currency",
    "provider",
    "amount",
    "payment_dt",
    "bank",
    "delivery_cost",
    "goods_total",
];

const ITEM_FIELDS: &[&str] = &[
    "chrt_id",
    "track_number",
    "price",
    "rid",
    "name",
    "total_price",
    "nm_id",
    "brand",
    "status",
];

/// 校验订单并返回有序的批量违规报告
///
/// 校验通过返回 Ok；否则返回 `OrderError::Validation`，
/// 报告包含全部违规，每行 `字段路径: 规则名`。
pub fn validate_order(order: &Order) -> Result<(), OrderError> {
    let derive_errors = order.validate().err();
    let mut lines: Vec<String> = Vec::new();

    // 1. 顶层字段
    if let Some(errors) = &derive_errors {
        push_field_lines(&mut lines, errors, "", ORDER_FIELDS);
    }

    // 2. delivery：字段错误与互备规则按固定位置交织
    let delivery_errors = derive_errors
        .as_ref()
        .and_then(|errors| nested_struct(errors, "delivery"));
    let contact_missing = order.delivery.phone.is_empty() && order.delivery.email.is_empty();

    for field in DELIVERY_FIELDS {
        if let Some(errors) = delivery_errors {
            push_field_lines(&mut lines, errors, "delivery.", &[field]);
        }
        if contact_missing {
            match *field {
                "phone" => lines.push("delivery.phone: required_without_email".to_string()),
                "email" => lines.push("delivery.email: required_without_phone".to_string()),
                _ => {}
            }
        }
    }

    // 3. payment
    if let Some(errors) = derive_errors
        .as_ref()
        .and_then(|errors| nested_struct(errors, "payment"))
    {
        push_field_lines(&mut lines, errors, "payment.", PAYMENT_FIELDS);
    }

    // 4. items 按下标（BTreeMap 迭代天然有序）
    if let Some(ValidationErrorsKind::List(item_errors)) = derive_errors
        .as_ref()
        .and_then(|errors| kind_for(errors, "items"))
    {
        for (index, errors) in item_errors {
            push_field_lines(&mut lines, errors, &format!("items[{index}]."), ITEM_FIELDS);
        }
    }

    if lines.is_empty() {
        Ok(())
    } else {
        Err(OrderError::Validation(lines.join("\n")))
    }
}

fn kind_for<'a>(errors: &'a ValidationErrors, field: &str) -> Option<&'a ValidationErrorsKind> {
    errors
        .errors()
        .iter()
        .find_map(|(name, kind)| (name.as_ref() == field).then_some(kind))
}

fn nested_struct<'a>(errors: &'a ValidationErrors, field: &str) -> Option<&'a ValidationErrors> {
    match kind_for(errors, field) {
        Some(ValidationErrorsKind::Struct(nested)) => Some(nested),
        _ => None,
    }
}

/// 按字段顺序表输出 `前缀字段: 规则` 行
fn push_field_lines(
    lines: &mut Vec<String>,
    errors: &ValidationErrors,
    prefix: &str,
    fields: &[&str],
) {
    for field in fields {
        if let Some(ValidationErrorsKind::Field(field_errors)) = kind_for(errors, field) {
            for error in field_errors {
                lines.push(format!("{prefix}{field}: {}", error.code));
            }
        }
    }
}
