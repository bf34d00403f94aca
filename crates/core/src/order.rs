//! Order numbering, pricing and summaries.

use serde::{Deserialize, Serialize};

use crate::types::{ProductId, Won};

/// Length of a public order number.
pub const ORDER_NUMBER_LEN: usize = 12;

/// Number of product names spelled out in a notification summary.
const SUMMARY_NAME_LIMIT: usize = 2;

/// Generate a public order number from a random UUID.
#[must_use]
pub fn order_number() -> String {
    let mut number = uuid::Uuid::new_v4().to_string();
    number.truncate(ORDER_NUMBER_LEN);
    number
}

/// Summarize ordered product names for a notification message.
///
/// ```
/// use onandhome_core::order::summarize_product_names;
///
/// assert_eq!(summarize_product_names(&["TV", "Fan", "PC"]), "TV, Fan 외 1건");
/// assert_eq!(summarize_product_names(&["TV"]), "TV");
/// ```
#[must_use]
pub fn summarize_product_names<S: AsRef<str>>(names: &[S]) -> String {
    let shown: Vec<&str> = names
        .iter()
        .take(SUMMARY_NAME_LIMIT)
        .map(AsRef::as_ref)
        .collect();
    let mut summary = shown.join(", ");

    let remaining = names.len().saturating_sub(SUMMARY_NAME_LIMIT);
    if remaining > 0 {
        summary.push_str(&format!(" 외 {remaining}건"));
    }
    summary
}

/// A priced order line, before it is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
    /// Ordered product.
    pub product_id: ProductId,
    /// Product name snapshot.
    pub product_name: String,
    /// Unit price charged.
    pub order_price: Won,
    /// Units ordered.
    pub count: u32,
}

impl PricedLine {
    /// `order_price × count`.
    #[must_use]
    pub fn subtotal(&self) -> Won {
        self.order_price.times(self.count)
    }
}

/// Sum of all line subtotals.
#[must_use]
pub fn order_total(lines: &[PricedLine]) -> Won {
    lines.iter().map(PricedLine::subtotal).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_shape() {
        let number = order_number();
        assert_eq!(number.len(), ORDER_NUMBER_LEN);
        assert!(number.chars().all(|c| c.is_ascii_hexdigit() || c == '-'));
        assert_ne!(number, order_number());
    }

    #[test]
    fn test_summarize_product_names() {
        let empty: [&str; 0] = [];
        assert_eq!(summarize_product_names(&empty), "");
        assert_eq!(summarize_product_names(&["냉장고", "세탁기"]), "냉장고, 세탁기");
        assert_eq!(
            summarize_product_names(&["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()]),
            "a, b 외 2건"
        );
    }

    #[test]
    fn test_order_total() {
        let lines = vec![
            PricedLine {
                product_id: ProductId::new(1),
                product_name: "TV".into(),
                order_price: Won::new(850_000),
                count: 2,
            },
            PricedLine {
                product_id: ProductId::new(2),
                product_name: "PC".into(),
                order_price: Won::new(1_200_000),
                count: 1,
            },
        ];
        assert_eq!(order_total(&lines), Won::new(2_900_000));
        assert_eq!(order_total(&[]), Won::ZERO);
    }
}
