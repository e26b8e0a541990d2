//! Store-wide snapshot.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{carts::abandonment_rate, mean, round2};
use crate::store::Datasets;
use crate::types::{OrderId, OrderStatus, ProductId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentOrder {
    pub order_id: OrderId,
    pub buyer: Option<String>,
    pub order_date: DateTime<Utc>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevenueLeader {
    pub product_id: ProductId,
    pub name: String,
    pub revenue: Decimal,
}

/// Aggregates across every entity. Empty tables give zeros, never errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub active_products: usize,
    pub order_count: usize,
    pub total_revenue: Decimal,
    pub average_order_value: Decimal,
    pub user_count: usize,
    pub review_count: usize,
    pub average_rating: Decimal,
    pub abandonment_rate: Decimal,
    pub recent_orders: Vec<RecentOrder>,
    pub top_products: Vec<RevenueLeader>,
}

pub(super) fn overview(data: &Datasets, limit: usize) -> Overview {
    let total_revenue: Decimal = data.orders.iter().map(|o| o.total_amount).sum();
    let rating_sum: i64 = data.reviews.iter().map(|r| i64::from(r.rating)).sum();
    let names: HashMap<_, _> = data.users.iter().map(|u| (&u.id, u.name.as_str())).collect();

    let mut recent: Vec<RecentOrder> = data
        .orders
        .iter()
        .map(|o| RecentOrder {
            order_id: o.id.clone(),
            buyer: names.get(&o.user_id).map(|n| (*n).to_owned()),
            order_date: o.order_date,
            total_amount: o.total_amount,
            status: o.status,
        })
        .collect();
    recent.sort_by(|a, b| {
        b.order_date
            .cmp(&a.order_date)
            .then_with(|| a.order_id.cmp(&b.order_id))
    });
    recent.truncate(limit);

    let mut revenue: HashMap<&ProductId, Decimal> = HashMap::new();
    for item in data.orders.iter().flat_map(|o| &o.items) {
        *revenue.entry(&item.product_id).or_default() += item.line_total();
    }
    let mut top_products: Vec<RevenueLeader> = data
        .products
        .iter()
        .filter_map(|p| {
            Some(RevenueLeader {
                product_id: p.id.clone(),
                name: p.name.clone(),
                revenue: round2(*revenue.get(&p.id)?),
            })
        })
        .collect();
    top_products.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));
    top_products.truncate(limit);

    Overview {
        active_products: data.products.iter().filter(|p| p.is_active).count(),
        order_count: data.orders.len(),
        total_revenue: round2(total_revenue),
        average_order_value: mean(total_revenue, data.orders.len()).unwrap_or_default(),
        user_count: data.users.len(),
        review_count: data.reviews.len(),
        average_rating: mean(Decimal::from(rating_sum), data.reviews.len()).unwrap_or_default(),
        abandonment_rate: abandonment_rate(&data.carts).rate,
        recent_orders: recent,
        top_products,
    }
}
