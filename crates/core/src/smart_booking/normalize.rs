//! Turns loosely-typed model output into a booking suggestion.
//!
//! Every field falls back to a default independently, so a reply that gets
//! the amount right but mangles the date still yields a usable amount.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use tally_shared::types::{CategoryId, Money};

use crate::ledger::{Category, PaymentMethod, TransactionKind};

/// Category name used when the model gives none.
pub const FALLBACK_CATEGORY: &str = "其他";

/// A pre-filled transaction proposed by the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingSuggestion {
    /// Amount in minor units, never negative.
    pub amount: i64,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Category name as suggested.
    pub category: String,
    /// Matching category of the user, if any.
    pub category_id: Option<CategoryId>,
    /// Short description.
    pub note: String,
    /// Transaction date.
    pub date: NaiveDate,
    /// Payment method.
    pub payment_method: PaymentMethod,
    /// Model confidence in `[0, 1]`.
    pub confidence: f64,
}

impl BookingSuggestion {
    /// The record returned when the model gives nothing usable.
    #[must_use]
    pub fn fallback(today: NaiveDate) -> Self {
        Self {
            amount: 0,
            kind: TransactionKind::Expense,
            category: FALLBACK_CATEGORY.to_string(),
            category_id: None,
            note: String::new(),
            date: today,
            payment_method: PaymentMethod::Cash,
            confidence: 0.0,
        }
    }

    /// Overlays the fields present in `fields` on the fallback record.
    #[must_use]
    pub fn from_fields(fields: &Map<String, Value>, today: NaiveDate) -> Self {
        let mut suggestion = Self::fallback(today);

        if let Some(amount) = fields.get("amount").and_then(parse_amount) {
            suggestion.amount = amount;
        }
        if let Some(kind) = fields.get("type").and_then(Value::as_str).and_then(parse_kind) {
            suggestion.kind = kind;
        }
        if let Some(category) = non_empty_str(fields.get("category")) {
            suggestion.category = category;
        }
        if let Some(note) = non_empty_str(fields.get("note")) {
            suggestion.note = note;
        }
        if let Some(date) = fields
            .get("date")
            .and_then(Value::as_str)
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
        {
            suggestion.date = date;
        }
        if let Some(method) = fields
            .get("payment_method")
            .and_then(Value::as_str)
            .and_then(parse_payment_method)
        {
            suggestion.payment_method = method;
        }
        suggestion.confidence = fields.get("confidence").map_or(0.0, parse_confidence);

        suggestion
    }

    /// Links the suggestion to the first matching category, see
    /// [`resolve_category`].
    pub fn resolve_against(&mut self, categories: &[Category]) {
        let candidates: Vec<&Category> =
            categories.iter().filter(|c| c.kind == self.kind).collect();
        self.category_id = resolve_category(&self.category, &candidates).map(|c| c.id);
    }
}

/// Finds the category a suggested name refers to.
///
/// Case-insensitive exact match first, then a substring match in either
/// direction. Within each pass the first candidate wins.
#[must_use]
pub fn resolve_category<'a>(suggested: &str, candidates: &[&'a Category]) -> Option<&'a Category> {
    let wanted = suggested.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    candidates
        .iter()
        .find(|c| c.name.to_lowercase() == wanted)
        .or_else(|| {
            candidates.iter().find(|c| {
                let name = c.name.to_lowercase();
                name.contains(&wanted) || wanted.contains(&name)
            })
        })
        .copied()
}

/// Parses a major-unit amount (number or string) into minor units.
///
/// Strings may carry a currency sign or unit (`¥35.5`, `35元`). Negative
/// amounts are taken by magnitude.
#[must_use]
pub fn parse_amount(value: &Value) -> Option<i64> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s
            .trim()
            .trim_start_matches(['¥', '￥', '$'])
            .trim_end_matches('元')
            .replace(',', ""),
        _ => return None,
    };
    let major = Decimal::from_str(text.trim())
        .or_else(|_| Decimal::from_scientific(text.trim()))
        .ok()?;
    Money::from_major(major.abs()).map(Money::minor)
}

/// Clamps a confidence value into `[0, 1]`; anything non-finite or
/// non-numeric is `0`.
#[must_use]
pub fn parse_confidence(value: &Value) -> f64 {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

fn parse_kind(s: &str) -> Option<TransactionKind> {
    match s.trim() {
        "收入" => Some(TransactionKind::Income),
        "支出" => Some(TransactionKind::Expense),
        other => other.parse().ok(),
    }
}

fn parse_payment_method(s: &str) -> Option<PaymentMethod> {
    match s.trim() {
        "现金" => Some(PaymentMethod::Cash),
        "微信" => Some(PaymentMethod::Wechat),
        "支付宝" => Some(PaymentMethod::Alipay),
        "银行卡" => Some(PaymentMethod::Bank),
        other => other.parse().ok(),
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;
    use serde_json::json;
    use tally_shared::types::UserId;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn category(name: &str, kind: TransactionKind) -> Category {
        let now = Utc::now();
        Category {
            id: CategoryId::new(),
            user_id: UserId::new(),
            name: name.to_string(),
            kind,
            icon: "tag".to_string(),
            color: "#999999".to_string(),
            is_default: true,
            sort_order: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[rstest]
    #[case(json!(35), Some(3500))]
    #[case(json!(35.5), Some(3550))]
    #[case(json!(0.005), Some(1))]
    #[case(json!(-12.3), Some(1230))]
    #[case(json!("¥18.8"), Some(1880))]
    #[case(json!("25元"), Some(2500))]
    #[case(json!("1,200.00"), Some(120_000))]
    #[case(json!("abc"), None)]
    #[case(json!(null), None)]
    fn test_parse_amount(#[case] value: Value, #[case] expected: Option<i64>) {
        assert_eq!(parse_amount(&value), expected);
    }

    #[rstest]
    #[case(json!(0.85), 85)]
    #[case(json!(1.7), 100)]
    #[case(json!(-0.2), 0)]
    #[case(json!("0.5"), 50)]
    #[case(json!("NaN"), 0)]
    #[case(json!("inf"), 0)]
    #[case(json!(true), 0)]
    fn test_parse_confidence(#[case] value: Value, #[case] percent: i64) {
        let c = parse_confidence(&value);
        assert!((0.0..=1.0).contains(&c));
        let scaled = Decimal::from_f64_retain(c).unwrap() * Decimal::from(100);
        assert_eq!(scaled.round(), Decimal::from(percent));
    }

    #[test]
    fn test_fallback_record() {
        let s = BookingSuggestion::fallback(today());
        assert_eq!(s.amount, 0);
        assert_eq!(s.kind, TransactionKind::Expense);
        assert_eq!(s.category, "其他");
        assert_eq!(s.note, "");
        assert_eq!(s.date, today());
        assert_eq!(s.payment_method, PaymentMethod::Cash);
        assert!(s.confidence <= 0.0);
    }

    #[test]
    fn test_fields_merge_over_fallback() {
        let map = fields(json!({
            "amount": 35,
            "type": "expense",
            "category": "餐饮",
            "note": "午饭",
            "date": "not a date",
            "payment_method": "微信",
            "confidence": 0.9
        }));
        let s = BookingSuggestion::from_fields(&map, today());

        assert_eq!(s.amount, 3500);
        assert_eq!(s.category, "餐饮");
        assert_eq!(s.note, "午饭");
        assert_eq!(s.date, today());
        assert_eq!(s.payment_method, PaymentMethod::Wechat);
        assert!(s.confidence > 0.89);
    }

    #[test]
    fn test_income_in_chinese() {
        let map = fields(json!({"type": "收入", "date": "2026-02-01"}));
        let s = BookingSuggestion::from_fields(&map, today());
        assert_eq!(s.kind, TransactionKind::Income);
        assert_eq!(s.date, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
    }

    #[rstest]
    #[case("餐饮", Some("餐饮"))]
    #[case("餐", Some("餐饮"))]
    #[case("饮食", None)]
    #[case("饮料", None)]
    #[case("交通出行", Some("交通"))]
    #[case("TAXI", Some("taxi"))]
    #[case("", None)]
    fn test_resolve_category(#[case] suggested: &str, #[case] expected: Option<&str>) {
        let cats = [
            category("餐饮", TransactionKind::Expense),
            category("交通", TransactionKind::Expense),
            category("taxi", TransactionKind::Expense),
        ];
        let refs: Vec<&Category> = cats.iter().collect();
        let found = resolve_category(suggested, &refs).map(|c| c.name.as_str());
        assert_eq!(found, expected);
    }

    #[test]
    fn test_exact_match_beats_earlier_substring() {
        let cats = [
            category("其他收入", TransactionKind::Income),
            category("其他", TransactionKind::Income),
        ];
        let refs: Vec<&Category> = cats.iter().collect();
        assert_eq!(resolve_category("其他", &refs).map(|c| c.name.as_str()), Some("其他"));
    }

    #[test]
    fn test_resolution_respects_kind() {
        let cats = vec![
            category("其他", TransactionKind::Expense),
            category("其他收入", TransactionKind::Income),
        ];
        let mut s = BookingSuggestion::fallback(today());
        s.kind = TransactionKind::Income;
        s.resolve_against(&cats);
        assert_eq!(s.category_id, Some(cats[1].id));
    }
}
