//! Status enums for orders, payments and products.

use serde::{Deserialize, Serialize};

/// Lifecycle of an order.
///
/// ```text
/// PAYMENT_PENDING ──► ORDERED ──► PREPARING ──► DELIVERING ──► DELIVERED
///        │               │            │              │
///        └───────────────┴────────────┴──────────────┴──► CANCELED
/// ```
///
/// `ORDERED` may also skip straight to `DELIVERING`. `DELIVERED` and
/// `CANCELED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Bank transfer chosen, waiting for the deposit to be confirmed.
    PaymentPending,
    /// Paid and accepted.
    Ordered,
    /// Being packed.
    Preparing,
    /// Handed to the carrier.
    Delivering,
    /// Received by the customer.
    Delivered,
    /// Canceled by the customer or an admin.
    Canceled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::PaymentPending,
        Self::Ordered,
        Self::Preparing,
        Self::Delivering,
        Self::Delivered,
        Self::Canceled,
    ];

    /// Human-readable tracking label shown to customers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PaymentPending => "입금대기",
            Self::Ordered => "주문 완료",
            Self::Preparing => "상품준비중",
            Self::Delivering => "배송중",
            Self::Delivered => "배송완료",
            Self::Canceled => "주문 취소",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Canceled)
    }

    /// Whether the order can move from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::PaymentPending, Self::Ordered | Self::Canceled)
                | (
                    Self::Ordered,
                    Self::Preparing | Self::Delivering | Self::Canceled
                )
                | (Self::Preparing, Self::Delivering | Self::Canceled)
                | (Self::Delivering, Self::Delivered | Self::Canceled)
        )
    }

    /// Whether the order still counts toward revenue.
    #[must_use]
    pub const fn counts_as_revenue(self) -> bool {
        !matches!(self, Self::Canceled)
    }

    /// The `SCREAMING_SNAKE_CASE` wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PaymentPending => "PAYMENT_PENDING",
            Self::Ordered => "ORDERED",
            Self::Preparing => "PREPARING",
            Self::Delivering => "DELIVERING",
            Self::Delivered => "DELIVERED",
            Self::Canceled => "CANCELED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Card payment, settled at checkout.
    #[default]
    Card,
    /// Bank transfer, settled when an admin confirms the deposit.
    BankTransfer,
}

impl PaymentMethod {
    /// Parse a client-supplied method, falling back to [`PaymentMethod::Card`]
    /// for missing, blank or unknown values.
    #[must_use]
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("BANK_TRANSFER") => Self::BankTransfer,
            _ => Self::Card,
        }
    }

    /// Status a freshly created order starts in.
    #[must_use]
    pub const fn initial_status(self) -> OrderStatus {
        match self {
            Self::Card => OrderStatus::Ordered,
            Self::BankTransfer => OrderStatus::PaymentPending,
        }
    }

    /// Whether payment is settled at the moment the order is placed.
    #[must_use]
    pub const fn settles_at_checkout(self) -> bool {
        matches!(self, Self::Card)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Card => write!(f, "CARD"),
            Self::BankTransfer => write!(f, "BANK_TRANSFER"),
        }
    }
}

/// Sales status of a product, stored as its Korean label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProductStatus {
    /// Listed and purchasable.
    #[default]
    #[serde(rename = "판매중")]
    OnSale,
    /// Listed but out of stock.
    #[serde(rename = "품절")]
    SoldOut,
    /// Hidden from sale.
    #[serde(rename = "판매중지")]
    Suspended,
}

impl ProductStatus {
    /// The stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnSale => "판매중",
            Self::SoldOut => "품절",
            Self::Suspended => "판매중지",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "판매중" | "ON_SALE" => Ok(Self::OnSale),
            "품절" | "SOLD_OUT" => Ok(Self::SoldOut),
            "판매중지" | "SUSPENDED" => Ok(Self::Suspended),
            other => Err(format!("invalid product status: {other}")),
        }
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ProductStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ProductStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ProductStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_transitions() {
        use OrderStatus::*;

        assert!(PaymentPending.can_transition_to(Ordered));
        assert!(PaymentPending.can_transition_to(Canceled));
        assert!(!PaymentPending.can_transition_to(Delivering));

        assert!(Ordered.can_transition_to(Preparing));
        assert!(Ordered.can_transition_to(Delivering));
        assert!(Preparing.can_transition_to(Delivering));
        assert!(Delivering.can_transition_to(Delivered));
        assert!(Delivering.can_transition_to(Canceled));

        assert!(!Delivered.can_transition_to(Canceled));
        assert!(!Canceled.can_transition_to(Ordered));
        assert!(!Ordered.can_transition_to(Ordered));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in OrderStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in OrderStatus::ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_order_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::PaymentPending).unwrap(),
            "\"PAYMENT_PENDING\""
        );
        assert_eq!(
            "delivering".parse::<OrderStatus>().unwrap(),
            OrderStatus::Delivering
        );
        assert!("SHIPPED".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_payment_method_lenient_parse() {
        assert_eq!(
            PaymentMethod::parse_lenient(Some("BANK_TRANSFER")),
            PaymentMethod::BankTransfer
        );
        assert_eq!(PaymentMethod::parse_lenient(Some("")), PaymentMethod::Card);
        assert_eq!(PaymentMethod::parse_lenient(Some("PAYPAL")), PaymentMethod::Card);
        assert_eq!(PaymentMethod::parse_lenient(None), PaymentMethod::Card);
    }

    #[test]
    fn test_payment_method_initial_status() {
        assert_eq!(
            PaymentMethod::BankTransfer.initial_status(),
            OrderStatus::PaymentPending
        );
        assert_eq!(PaymentMethod::Card.initial_status(), OrderStatus::Ordered);
    }

    #[test]
    fn test_product_status_labels() {
        assert_eq!(ProductStatus::default().as_str(), "판매중");
        assert_eq!("품절".parse::<ProductStatus>().unwrap(), ProductStatus::SoldOut);
        assert_eq!(
            serde_json::to_string(&ProductStatus::Suspended).unwrap(),
            "\"판매중지\""
        );
    }
}
