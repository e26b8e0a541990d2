//! Order-based metrics.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{Month, mean, percent, round2};
use crate::model::{Order, Product, User};
use crate::types::{OrderId, OrderStatus, ProductId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub name: String,
    pub units_sold: u64,
    pub revenue: Decimal,
    pub order_count: usize,
}

/// Co-purchase pairs. `product_a` always sorts before `product_b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductPair {
    pub product_a: ProductId,
    pub name_a: String,
    pub product_b: ProductId,
    pub name_b: String,
    pub orders: usize,
    /// Share of qualifying orders containing the pair.
    pub percentage: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Affinity {
    /// Orders with at least two distinct products.
    pub qualifying_orders: usize,
    pub pairs: Vec<ProductPair>,
}

impl Affinity {
    /// Look a pair up in either order.
    #[must_use]
    pub fn pair(&self, a: &ProductId, b: &ProductId) -> Option<&ProductPair> {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        self.pairs
            .iter()
            .find(|p| &p.product_a == low && &p.product_b == high)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyOrderValue {
    pub month: Month,
    pub label: String,
    pub order_count: usize,
    pub average_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LargeOrder {
    pub order_id: OrderId,
    pub buyer: Option<String>,
    pub order_date: DateTime<Utc>,
    pub item_count: usize,
    pub total_amount: Decimal,
}

pub(super) fn top_selling(products: &[Product], orders: &[Order], limit: usize) -> Vec<ProductSales> {
    #[derive(Default)]
    struct Tally<'a> {
        units: u64,
        revenue: Decimal,
        orders: HashSet<&'a OrderId>,
    }

    let mut tallies: HashMap<&ProductId, Tally<'_>> = HashMap::new();
    for order in orders.iter().filter(|o| o.status == OrderStatus::Completed) {
        for item in &order.items {
            let tally = tallies.entry(&item.product_id).or_default();
            tally.units += u64::from(item.quantity);
            tally.revenue += item.line_total();
            tally.orders.insert(&order.id);
        }
    }

    let mut rows: Vec<ProductSales> = products
        .iter()
        .filter_map(|p| {
            let tally = tallies.get(&p.id)?;
            Some(ProductSales {
                product_id: p.id.clone(),
                name: p.name.clone(),
                units_sold: tally.units,
                revenue: round2(tally.revenue),
                order_count: tally.orders.len(),
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.units_sold
            .cmp(&a.units_sold)
            .then_with(|| a.name.cmp(&b.name))
    });
    rows.truncate(limit);
    rows
}

pub(super) fn affinity(products: &[Product], orders: &[Order], limit: usize) -> Affinity {
    let names: HashMap<&ProductId, &str> =
        products.iter().map(|p| (&p.id, p.name.as_str())).collect();

    let mut qualifying_orders = 0;
    let mut counts: BTreeMap<(&ProductId, &ProductId), usize> = BTreeMap::new();
    for order in orders {
        let distinct: BTreeSet<&ProductId> = order.items.iter().map(|i| &i.product_id).collect();
        if distinct.len() < 2 {
            continue;
        }
        qualifying_orders += 1;

        let distinct: Vec<&ProductId> = distinct.into_iter().collect();
        for (i, low) in distinct.iter().enumerate() {
            for high in distinct.iter().skip(i + 1) {
                *counts.entry((*low, *high)).or_default() += 1;
            }
        }
    }

    let name_of = |id: &ProductId| names.get(id).map_or_else(String::new, |n| (*n).to_owned());
    let mut pairs: Vec<ProductPair> = counts
        .into_iter()
        .map(|((a, b), count)| ProductPair {
            product_a: a.clone(),
            name_a: name_of(a),
            product_b: b.clone(),
            name_b: name_of(b),
            orders: count,
            percentage: percent(count, qualifying_orders),
        })
        .collect();

    // Stable sort keeps the (a, b) key order among equal counts.
    pairs.sort_by(|x, y| y.orders.cmp(&x.orders));
    pairs.truncate(limit);

    Affinity {
        qualifying_orders,
        pairs,
    }
}

pub(super) fn order_value_by_month(orders: &[Order], limit: usize) -> Vec<MonthlyOrderValue> {
    let mut months: BTreeMap<Month, (Decimal, usize)> = BTreeMap::new();
    for order in orders.iter().filter(|o| o.status == OrderStatus::Completed) {
        let entry = months.entry(Month::of(order.order_date)).or_default();
        entry.0 += order.total_amount;
        entry.1 += 1;
    }

    months
        .into_iter()
        .rev()
        .filter_map(|(month, (total, count))| {
            Some(MonthlyOrderValue {
                month,
                label: month.label(),
                order_count: count,
                average_value: mean(total, count)?,
            })
        })
        .take(limit)
        .collect()
}

pub(super) fn largest_orders(users: &[User], orders: &[Order], limit: usize) -> Vec<LargeOrder> {
    let names: HashMap<_, _> = users.iter().map(|u| (&u.id, u.name.as_str())).collect();

    let mut rows: Vec<LargeOrder> = orders
        .iter()
        .filter(|o| !o.items.is_empty())
        .map(|o| LargeOrder {
            order_id: o.id.clone(),
            buyer: names.get(&o.user_id).map(|n| (*n).to_owned()),
            order_date: o.order_date,
            item_count: o.items.len(),
            total_amount: o.total_amount,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.item_count
            .cmp(&a.item_count)
            .then_with(|| b.order_date.cmp(&a.order_date))
            .then_with(|| a.order_id.cmp(&b.order_id))
    });
    rows.truncate(limit);
    rows
}
