//! System prompts for smart booking.

use chrono::NaiveDate;

use crate::ledger::TransactionKind;

const RECORD_SCHEMA: &str = r#"{
  "amount": 35.5,
  "type": "expense" | "income",
  "category": "<one of the category names>",
  "note": "<short description>",
  "date": "YYYY-MM-DD",
  "payment_method": "cash" | "wechat" | "alipay" | "bank",
  "confidence": 0.0-1.0
}"#;

/// Prompt for turning a sentence such as "午饭 35" into a record.
#[must_use]
pub fn parse_text_prompt(today: NaiveDate, expense: &[String], income: &[String]) -> String {
    format!(
        "你是一个记账助手。从用户的描述中提取一笔收支记录，只输出一个 JSON 对象，不要输出其他内容。\n\
         格式：\n{RECORD_SCHEMA}\n\
         规则：amount 以元为单位；未提到日期时使用今天 {today}；\
         相对日期（昨天、前天）按今天换算；无法确定时降低 confidence。\n\
         支出分类：{}\n收入分类：{}",
        expense.join("、"),
        income.join("、"),
    )
}

/// Prompt for reading a receipt or payment screenshot.
#[must_use]
pub fn recognize_image_prompt(today: NaiveDate, expense: &[String], income: &[String]) -> String {
    format!(
        "你是一个记账助手。识别图片中的小票、账单或支付截图，提取实际支付的总金额，\
         只输出一个 JSON 对象，不要输出其他内容。\n\
         格式：\n{RECORD_SCHEMA}\n\
         规则：amount 以元为单位；图片中没有日期时使用今天 {today}；\
         note 写商户名或主要商品；看不清时降低 confidence。\n\
         支出分类：{}\n收入分类：{}",
        expense.join("、"),
        income.join("、"),
    )
}

/// Prompt for ranking categories for a description.
#[must_use]
pub fn suggest_categories_prompt(kind: TransactionKind, names: &[String]) -> String {
    let label = match kind {
        TransactionKind::Income => "收入",
        TransactionKind::Expense => "支出",
    };
    format!(
        "你是一个记账助手。根据用户描述的这笔{label}，从以下分类中选出最合适的最多 3 个，按匹配程度排序：{}\n\
         只输出 JSON：{{\"categories\": [\"分类名\", ...]}}",
        names.join("、"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_categories_and_date() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let prompt = parse_text_prompt(
            today,
            &["餐饮".to_string(), "交通".to_string()],
            &["工资".to_string()],
        );
        assert!(prompt.contains("2026-03-14"));
        assert!(prompt.contains("餐饮、交通"));
        assert!(prompt.contains("收入分类：工资"));
    }

    #[test]
    fn test_suggest_prompt_mentions_kind() {
        let prompt = suggest_categories_prompt(TransactionKind::Income, &["工资".to_string()]);
        assert!(prompt.contains("收入"));
        assert!(prompt.contains("\"categories\""));
    }
}
