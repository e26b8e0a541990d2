//! Cart-based metrics.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::{mean, percent, round2};
use crate::model::{Cart, Order, Product};
use crate::types::{CartStatus, OrderStatus, ProductId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbandonedProduct {
    pub product_id: ProductId,
    pub name: String,
    pub category: String,
    /// Items of abandoned carts, whether or not they were removed first.
    pub times_abandoned: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbandonmentRate {
    pub total_carts: usize,
    pub abandoned_carts: usize,
    /// Percentage, two decimals. Zero when there are no carts.
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductConversion {
    pub product_id: ProductId,
    pub name: String,
    pub times_carted: usize,
    pub times_purchased: usize,
    /// Purchases per cart addition, two decimals.
    pub conversion_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionFunnel {
    pub carts_created: usize,
    pub carts_with_items: usize,
    pub converted: usize,
    pub abandoned: usize,
    pub active: usize,
    /// Converted carts as a percentage of all carts.
    pub conversion_rate: Decimal,
}

/// Time from adding a product to a cart until buying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeToPurchase {
    /// Current cart items that were later bought.
    pub matched_items: usize,
    /// Mean minutes per matched item, two decimals. `None` when nothing matched.
    pub average_minutes: Option<Decimal>,
}

pub(super) fn abandoned(products: &[Product], carts: &[Cart], limit: usize) -> Vec<AbandonedProduct> {
    let mut counts: HashMap<&ProductId, usize> = HashMap::new();
    for cart in carts.iter().filter(|c| c.status == CartStatus::Abandoned) {
        for item in &cart.items {
            *counts.entry(&item.product_id).or_default() += 1;
        }
    }

    let mut rows: Vec<AbandonedProduct> = products
        .iter()
        .filter_map(|p| {
            Some(AbandonedProduct {
                product_id: p.id.clone(),
                name: p.name.clone(),
                category: p.category.clone(),
                times_abandoned: *counts.get(&p.id)?,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.times_abandoned
            .cmp(&a.times_abandoned)
            .then_with(|| a.name.cmp(&b.name))
    });
    rows.truncate(limit);
    rows
}

pub(super) fn abandonment_rate(carts: &[Cart]) -> AbandonmentRate {
    let abandoned_carts = carts
        .iter()
        .filter(|c| c.status == CartStatus::Abandoned)
        .count();
    AbandonmentRate {
        total_carts: carts.len(),
        abandoned_carts,
        rate: percent(abandoned_carts, carts.len()),
    }
}

pub(super) fn product_conversion(
    products: &[Product],
    carts: &[Cart],
    orders: &[Order],
    limit: usize,
) -> Vec<ProductConversion> {
    let mut carted: HashMap<&ProductId, usize> = HashMap::new();
    for item in carts.iter().flat_map(|c| &c.items) {
        *carted.entry(&item.product_id).or_default() += 1;
    }
    let mut purchased: HashMap<&ProductId, usize> = HashMap::new();
    for item in orders.iter().flat_map(|o| &o.items) {
        *purchased.entry(&item.product_id).or_default() += 1;
    }

    let mut rows: Vec<ProductConversion> = products
        .iter()
        .filter_map(|p| {
            let times_carted = *carted.get(&p.id)?;
            let times_purchased = purchased.get(&p.id).copied().unwrap_or_default();
            Some(ProductConversion {
                product_id: p.id.clone(),
                name: p.name.clone(),
                times_carted,
                times_purchased,
                conversion_rate: round2(
                    Decimal::from(times_purchased) / Decimal::from(times_carted),
                ),
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.conversion_rate
            .cmp(&a.conversion_rate)
            .then_with(|| a.name.cmp(&b.name))
    });
    rows.truncate(limit);
    rows
}

pub(super) fn conversion_funnel(carts: &[Cart]) -> ConversionFunnel {
    let with_status = |status| carts.iter().filter(|c| c.status == status).count();
    let converted = with_status(CartStatus::Converted);
    ConversionFunnel {
        carts_created: carts.len(),
        carts_with_items: carts.iter().filter(|c| !c.items.is_empty()).count(),
        converted,
        abandoned: with_status(CartStatus::Abandoned),
        active: with_status(CartStatus::Active),
        conversion_rate: percent(converted, carts.len()),
    }
}

/// A current cart item is matched to the earliest non-cancelled order of the
/// cart's owner that contains the product and was placed no earlier than the
/// item was added. Unmatched items are left out.
pub(super) fn time_to_purchase(carts: &[Cart], orders: &[Order]) -> TimeToPurchase {
    let mut purchases: HashMap<(&UserId, &ProductId), Vec<_>> = HashMap::new();
    for order in orders.iter().filter(|o| o.status != OrderStatus::Cancelled) {
        for item in &order.items {
            purchases
                .entry((&order.user_id, &item.product_id))
                .or_default()
                .push(order.order_date);
        }
    }
    for dates in purchases.values_mut() {
        dates.sort_unstable();
    }

    let waits: Vec<Decimal> = carts
        .iter()
        .flat_map(|cart| cart.items.iter().map(move |item| (&cart.user_id, item)))
        .filter(|(_, item)| item.is_current())
        .filter_map(|(user_id, item)| {
            let dates = purchases.get(&(user_id, &item.product_id))?;
            let bought = dates.iter().find(|&&date| date >= item.added_at)?;
            let millis = (*bought - item.added_at).num_milliseconds();
            Some(Decimal::from(millis) / Decimal::from(60_000))
        })
        .collect();

    TimeToPurchase {
        matched_items: waits.len(),
        average_minutes: mean(waits.iter().sum(), waits.len()),
    }
}
