//! Cross-module business rules that do not need a database.
//!
//! These exercise the same functions the order and notification services
//! call, wired together the way a checkout uses them.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use onandhome_core::cart::{
    CartError, CartLine, CartSelection, CartSummary, checkout_items, normalize_quantity,
};
use onandhome_core::catalog::{CATEGORY_TREE, group, is_known_sub_category, parent_of};
use onandhome_core::order::{PricedLine, order_total, summarize_product_names};
use onandhome_core::{
    CartItemId, NotificationType, OrderStatus, PaymentMethod, ProductId, RecipientProfile,
    UserRole, Won,
};

fn line(id: i32, price: i64, sale: Option<i64>, qty: u32) -> CartLine {
    CartLine::new(
        CartItemId::new(id),
        ProductId::new(id * 10),
        format!("상품{id}"),
        Won::new(price),
        sale.map(Won::new),
        qty,
    )
    .with_stock(5)
}

#[test]
fn test_selected_cart_lines_become_priced_order() {
    let lines = vec![
        line(1, 1_000_000, Some(890_000), 1),
        line(2, 250_000, None, 2),
        line(3, 50_000, Some(0), 3),
    ];
    let selection = CartSelection::from_ids([CartItemId::new(1), CartItemId::new(3)]);

    let summary = CartSummary::compute(&lines, &selection);
    assert_eq!(summary.selected_count, 2);
    assert_eq!(summary.selected_quantity, 4);
    assert_eq!(summary.total, Won::new(890_000 + 150_000));
    assert!(!summary.all_selected);

    let items = checkout_items(&lines, &selection).unwrap();
    let priced: Vec<PricedLine> = items
        .iter()
        .map(|item| {
            let source = lines.iter().find(|l| l.product_id == item.product_id).unwrap();
            PricedLine {
                product_id: item.product_id,
                product_name: source.name.clone(),
                order_price: source.unit_price(),
                count: item.quantity,
            }
        })
        .collect();

    // The order charges exactly what the cart showed.
    assert_eq!(order_total(&priced), summary.total);

    let names: Vec<&str> = priced.iter().map(|l| l.product_name.as_str()).collect();
    assert_eq!(summarize_product_names(&names), "상품1, 상품3");
}

#[test]
fn test_checkout_rejects_empty_and_unselected_carts() {
    assert_eq!(
        checkout_items(&[], &CartSelection::default()),
        Err(CartError::Empty)
    );

    let lines = vec![line(1, 10_000, None, 1)];
    let mut selection = CartSelection::all(&lines);
    selection.toggle(CartItemId::new(1));
    assert_eq!(
        checkout_items(&lines, &selection),
        Err(CartError::NothingSelected)
    );
}

#[test]
fn test_quantities_are_clamped_to_one() {
    assert_eq!(normalize_quantity(0), 1);
    assert_eq!(normalize_quantity(-4), 1);
    assert_eq!(normalize_quantity(3), 3);
    assert_eq!(line(1, 1_000, None, 0).quantity, 1);
}

#[test]
fn test_stock_overrun_is_visible_on_the_line() {
    let over = line(1, 1_000, None, 6);
    assert!(over.exceeds_stock());
    assert!(!line(2, 1_000, None, 5).exceeds_stock());
}

#[test]
fn test_bank_transfer_order_lifecycle() {
    let mut status = PaymentMethod::BankTransfer.initial_status();
    assert_eq!(status, OrderStatus::PaymentPending);

    for next in [
        OrderStatus::Ordered,
        OrderStatus::Preparing,
        OrderStatus::Delivering,
        OrderStatus::Delivered,
    ] {
        assert!(status.can_transition_to(next), "{status} -> {next}");
        status = next;
    }

    assert!(status.is_terminal());
    assert!(!status.can_transition_to(OrderStatus::Canceled));
}

#[test]
fn test_card_orders_skip_payment_pending() {
    let status = PaymentMethod::parse_lenient(Some("card")).initial_status();
    assert_eq!(status, OrderStatus::Ordered);
    assert!(!status.can_transition_to(OrderStatus::PaymentPending));
    assert_eq!(
        PaymentMethod::parse_lenient(Some("nonsense")),
        PaymentMethod::Card
    );
}

#[test]
fn test_canceled_orders_leave_revenue() {
    let revenue: Vec<OrderStatus> = OrderStatus::ALL
        .into_iter()
        .filter(|s| s.counts_as_revenue())
        .collect();
    assert_eq!(revenue.len(), 5);
    assert!(!revenue.contains(&OrderStatus::Canceled));
}

#[test]
fn test_advertisement_reaches_only_consenting_shoppers() {
    let audience = NotificationType::Advertisement.bulk_audience();
    let shopper = |active, marketing_consent| RecipientProfile {
        role: UserRole::User,
        active,
        marketing_consent,
    };
    let admin = RecipientProfile {
        role: UserRole::Admin,
        active: true,
        marketing_consent: true,
    };

    assert!(audience.includes(&shopper(true, true)));
    assert!(!audience.includes(&shopper(true, false)));
    assert!(!audience.includes(&shopper(false, true)));
    assert!(!audience.includes(&admin));
}

#[test]
fn test_admins_only_receive_admin_receivable_types() {
    let admin = RecipientProfile {
        role: UserRole::Admin,
        active: true,
        marketing_consent: false,
    };
    assert!(NotificationType::AdminOrder.is_deliverable_to(&admin));
    assert!(NotificationType::Order.is_deliverable_to(&admin));
    assert!(!NotificationType::Notice.is_deliverable_to(&admin));
    assert!(!NotificationType::ReviewReply.is_deliverable_to(&admin));
    assert!(NotificationType::Notice.bulk_audience().includes(&RecipientProfile {
        role: UserRole::User,
        active: true,
        marketing_consent: false,
    }));
}

#[test]
fn test_every_sub_category_maps_back_to_its_group() {
    for parent in &CATEGORY_TREE {
        assert_eq!(group(parent.key), Some(parent));
        for sub in parent.sub_categories {
            assert_eq!(parent_of(sub).map(|g| g.key), Some(parent.key));
            assert!(is_known_sub_category(sub));
        }
    }
    assert!(!is_known_sub_category("자동차"));
}
