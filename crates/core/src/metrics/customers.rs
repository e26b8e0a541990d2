//! Customer-based metrics: repeat purchasing, segmentation and spending.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{Datelike, Timelike};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{Month, mean, percent, round2};
use crate::model::{Order, Product, Review, User};
use crate::types::{OrderId, ProductId, UserId};

/// Customers with more than one order in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyRepeat {
    pub month: Month,
    pub label: String,
    pub repeat_customers: usize,
}

/// A customer who ordered in at least two distinct months.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoyalCustomer {
    pub user_id: UserId,
    pub name: String,
    pub months_active: usize,
    pub order_count: usize,
}

/// Customer tier by order count and lifetime spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Segment {
    #[serde(rename = "VIP")]
    Vip,
    Regular,
    Casual,
}

impl Segment {
    /// VIP needs 5 orders and 1000 spend, Regular 3 and 500. Bounds are inclusive.
    #[must_use]
    pub fn classify(order_count: usize, total_spent: Decimal) -> Self {
        if order_count >= 5 && total_spent >= Decimal::from(1000) {
            Self::Vip
        } else if order_count >= 3 && total_spent >= Decimal::from(500) {
            Self::Regular
        } else {
            Self::Casual
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SegmentCounts {
    pub vip: usize,
    pub regular: usize,
    pub casual: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerBehavior {
    pub segments: SegmentCounts,
    /// Mean over customers with two or more orders of their average gap in days.
    pub average_days_between_orders: Option<Decimal>,
    /// Product-months with more orders than the product's previous ordered month.
    pub growing_products: usize,
    pub declining_products: usize,
    /// Category with the highest revenue.
    pub top_category: Option<String>,
    /// Percentage of a category's customers with more than one order in it,
    /// averaged over categories that sold anything.
    pub average_category_retention: Option<Decimal>,
    /// Hour (UTC) and weekday of the busiest ordering slot.
    pub peak_hour: Option<u32>,
    pub peak_weekday: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSpending {
    pub user_id: UserId,
    pub name: String,
    pub order_count: usize,
    pub total_spent: Decimal,
    /// Average rating this customer gave; `None` if they never reviewed.
    pub average_rating: Option<Decimal>,
}

#[derive(Default)]
struct History<'a> {
    orders: Vec<&'a Order>,
    spent: Decimal,
}

fn histories(orders: &[Order]) -> HashMap<&UserId, History<'_>> {
    let mut by_user: HashMap<&UserId, History<'_>> = HashMap::new();
    for order in orders {
        let history = by_user.entry(&order.user_id).or_default();
        history.orders.push(order);
        history.spent += order.total_amount;
    }
    by_user
}

pub(super) fn repeat_customers(orders: &[Order], limit: usize) -> Vec<MonthlyRepeat> {
    let mut per_month: BTreeMap<Month, HashMap<&UserId, usize>> = BTreeMap::new();
    for order in orders {
        *per_month
            .entry(Month::of(order.order_date))
            .or_default()
            .entry(&order.user_id)
            .or_default() += 1;
    }

    per_month
        .into_iter()
        .filter_map(|(month, users)| {
            let repeat_customers = users.values().filter(|&&n| n > 1).count();
            (repeat_customers > 0).then(|| MonthlyRepeat {
                month,
                label: month.label(),
                repeat_customers,
            })
        })
        .take(limit)
        .collect()
}

pub(super) fn loyal_customers(users: &[User], orders: &[Order], limit: usize) -> Vec<LoyalCustomer> {
    let histories = histories(orders);
    let mut rows: Vec<LoyalCustomer> = users
        .iter()
        .filter_map(|user| {
            let history = histories.get(&user.id)?;
            let months: BTreeSet<Month> =
                history.orders.iter().map(|o| Month::of(o.order_date)).collect();
            (months.len() >= 2).then(|| LoyalCustomer {
                user_id: user.id.clone(),
                name: user.name.clone(),
                months_active: months.len(),
                order_count: history.orders.len(),
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.months_active
            .cmp(&a.months_active)
            .then_with(|| a.name.cmp(&b.name))
    });
    rows.truncate(limit);
    rows
}

/// Average gap in whole days between first and last order; `None` below two orders.
fn average_interval(orders: &[&Order]) -> Option<Decimal> {
    let first = orders.iter().map(|o| o.order_date).min()?;
    let last = orders.iter().map(|o| o.order_date).max()?;
    let gaps = orders.len().checked_sub(1).filter(|&n| n > 0)?;
    Some(Decimal::from((last - first).num_days()) / Decimal::from(gaps))
}

pub(super) fn behavior(users: &[User], products: &[Product], orders: &[Order]) -> CustomerBehavior {
    let histories = histories(orders);

    let mut segments = SegmentCounts::default();
    let mut intervals = Vec::new();
    for user in users {
        let (count, spent) = histories
            .get(&user.id)
            .map_or((0, Decimal::ZERO), |h| (h.orders.len(), h.spent));
        match Segment::classify(count, spent) {
            Segment::Vip => segments.vip += 1,
            Segment::Regular => segments.regular += 1,
            Segment::Casual => segments.casual += 1,
        }
        if let Some(interval) = histories.get(&user.id).and_then(|h| average_interval(&h.orders)) {
            intervals.push(interval);
        }
    }

    let (growing_products, declining_products) = growth(orders);
    let (peak_hour, peak_weekday) = peak_slot(orders).unzip();

    CustomerBehavior {
        segments,
        average_days_between_orders: mean(intervals.iter().sum(), intervals.len()),
        growing_products,
        declining_products,
        top_category: top_category(products, orders),
        average_category_retention: category_retention(products, orders),
        peak_hour,
        peak_weekday: peak_weekday.map(str::to_owned),
    }
}

/// Month-over-month change in distinct orders per product.
fn growth(orders: &[Order]) -> (usize, usize) {
    let mut monthly: BTreeMap<(&ProductId, Month), HashSet<&OrderId>> = BTreeMap::new();
    for order in orders {
        for item in &order.items {
            monthly
                .entry((&item.product_id, Month::of(order.order_date)))
                .or_default()
                .insert(&order.id);
        }
    }

    let (mut growing, mut declining) = (0, 0);
    let mut previous: Option<(&ProductId, usize)> = None;
    for ((product, _), order_ids) in &monthly {
        let count = order_ids.len();
        match previous {
            Some((prev_product, prev_count)) if prev_product == *product => {
                match count.cmp(&prev_count) {
                    Ordering::Greater => growing += 1,
                    Ordering::Less => declining += 1,
                    Ordering::Equal => {}
                }
            }
            _ => {}
        }
        previous = Some((*product, count));
    }
    (growing, declining)
}

fn top_category(products: &[Product], orders: &[Order]) -> Option<String> {
    let categories: HashMap<&ProductId, &str> = products
        .iter()
        .map(|p| (&p.id, p.category.as_str()))
        .collect();

    let mut revenue: BTreeMap<&str, Decimal> = BTreeMap::new();
    for item in orders.iter().flat_map(|o| &o.items) {
        if let Some(category) = categories.get(&item.product_id) {
            *revenue.entry(*category).or_default() += item.line_total();
        }
    }

    // max_by keeps the last maximum; iterate in reverse so ties go to the first name.
    revenue
        .into_iter()
        .rev()
        .max_by(|a, b| a.1.cmp(&b.1))
        .map(|(category, _)| category.to_owned())
}

/// Orders of every status count; a category without repeat buyers scores 0.
fn category_retention(products: &[Product], orders: &[Order]) -> Option<Decimal> {
    let categories: HashMap<&ProductId, &str> = products
        .iter()
        .map(|p| (&p.id, p.category.as_str()))
        .collect();

    let mut buyers: BTreeMap<&str, HashMap<&UserId, HashSet<&OrderId>>> = BTreeMap::new();
    for order in orders {
        for item in &order.items {
            if let Some(category) = categories.get(&item.product_id) {
                buyers
                    .entry(*category)
                    .or_default()
                    .entry(&order.user_id)
                    .or_default()
                    .insert(&order.id);
            }
        }
    }

    let shares: Vec<Decimal> = buyers
        .values()
        .map(|customers| {
            let repeat = customers.values().filter(|ids| ids.len() > 1).count();
            percent(repeat, customers.len())
        })
        .collect();
    mean(shares.iter().sum(), shares.len())
}

/// Weekday names indexed from Sunday, matching SQL `EXTRACT(DOW ...)`.
const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

fn peak_slot(orders: &[Order]) -> Option<(u32, &'static str)> {
    let mut slots: BTreeMap<(u32, u32), usize> = BTreeMap::new();
    for order in orders {
        let date = order.order_date;
        *slots
            .entry((date.hour(), date.weekday().num_days_from_sunday()))
            .or_default() += 1;
    }

    // max_by keeps the last maximum; iterate in reverse so ties go to the earliest slot.
    let ((hour, day), _) = slots.into_iter().rev().max_by(|a, b| a.1.cmp(&b.1))?;
    let name = *WEEKDAYS.get(usize::try_from(day).ok()?)?;
    Some((hour, name))
}

pub(super) fn spending(
    users: &[User],
    orders: &[Order],
    reviews: &[Review],
    limit: usize,
) -> Vec<CustomerSpending> {
    let histories = histories(orders);
    let mut ratings: HashMap<&UserId, (i64, usize)> = HashMap::new();
    for review in reviews {
        let entry = ratings.entry(&review.user_id).or_default();
        entry.0 += i64::from(review.rating);
        entry.1 += 1;
    }

    let mut rows: Vec<CustomerSpending> = users
        .iter()
        .map(|user| {
            let (order_count, total_spent) = histories
                .get(&user.id)
                .map_or((0, Decimal::ZERO), |h| (h.orders.len(), h.spent));
            CustomerSpending {
                user_id: user.id.clone(),
                name: user.name.clone(),
                order_count,
                total_spent: round2(total_spent),
                average_rating: ratings
                    .get(&user.id)
                    .and_then(|(sum, count)| mean(Decimal::from(*sum), *count)),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_spent
            .cmp(&a.total_spent)
            .then_with(|| a.name.cmp(&b.name))
    });
    rows.truncate(limit);
    rows
}
