//! Synthetic demo data.
//!
//! Generates a referentially consistent [`Snapshot`]: every order, cart and
//! review points at a generated user and product, and every order total
//! equals the sum of its lines. A fixed `seed` reproduces the same data
//! apart from the generated identifiers.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::model::{Cart, CartItem, Order, OrderItem, Product, Review, Snapshot, User};
use crate::types::{
    CartId, CartItemId, CartStatus, Email, OrderId, OrderItemId, OrderStatus, Price, ProductId,
    Rating, ReviewId, UserId,
};

const FIRST_NAMES: &[&str] = &[
    "Ada", "Ben", "Carla", "Dmitri", "Elena", "Farid", "Grace", "Hiro", "Imani", "Jonas", "Kira",
    "Luis", "Maya", "Noah", "Olga", "Priya", "Quinn", "Rosa", "Sami", "Tariq",
];
const LAST_NAMES: &[&str] = &[
    "Adams", "Baker", "Chen", "Diaz", "Evans", "Fischer", "Garcia", "Hughes", "Ito", "Jensen",
    "Khan", "Lopez", "Moreau", "Nakamura", "Okafor", "Petrov",
];
const CATEGORIES: &[&str] = &["Electronics", "Clothing", "Home", "Books", "Sports", "Beauty"];
const ADJECTIVES: &[&str] = &[
    "Compact", "Deluxe", "Eco", "Ergonomic", "Classic", "Smart", "Rugged", "Portable", "Premium",
    "Minimal",
];
const NOUNS: &[&str] = &[
    "Lamp", "Backpack", "Headphones", "Jacket", "Blender", "Novel", "Yoga Mat", "Serum", "Kettle",
    "Speaker", "Sneakers", "Notebook",
];
const SIGNUP_SOURCES: &[&str] = &["organic", "referral", "social", "paid"];
const COMMENTS: &[&str] = &[
    "Exactly as described.",
    "Would buy again.",
    "Arrived late but works fine.",
    "Not worth the price.",
    "Great quality for the money.",
];

/// How much data to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedConfig {
    pub users: usize,
    pub products: usize,
    pub orders: usize,
    pub reviews: usize,
    pub carts: usize,
    /// RNG seed; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            users: 100,
            products: 50,
            orders: 200,
            reviews: 300,
            carts: 150,
            seed: None,
        }
    }
}

/// Generate a snapshot whose timestamps fall within the year before `now`.
///
/// Timestamps are whole milliseconds so a mirrored copy compares equal.
#[must_use]
pub fn generate(config: &SeedConfig, now: DateTime<Utc>) -> Snapshot {
    let mut rng = config
        .seed
        .map_or_else(|| StdRng::from_rng(&mut rand::rng()), StdRng::seed_from_u64);
    let mut generator = Generator {
        rng: &mut rng,
        now: crate::model::truncate_to_millis(now),
    };

    let users: Vec<User> = (0..config.users).filter_map(|n| generator.user(n)).collect();
    let products: Vec<Product> = (0..config.products).map(|_| generator.product()).collect();
    let orders = (0..config.orders)
        .filter_map(|_| generator.order(&users, &products))
        .collect();
    let carts = (0..config.carts)
        .filter_map(|_| generator.cart(&users, &products))
        .collect();
    let reviews = (0..config.reviews)
        .filter_map(|_| generator.review(&users, &products))
        .collect();

    Snapshot {
        users,
        products,
        carts,
        orders,
        reviews,
    }
}

struct Generator<'a> {
    rng: &'a mut StdRng,
    now: DateTime<Utc>,
}

impl Generator<'_> {
    fn pick<'s>(&mut self, options: &'s [&'s str]) -> &'s str {
        options.choose(self.rng).copied().unwrap_or_default()
    }

    fn within_last_year(&mut self) -> DateTime<Utc> {
        self.now - Duration::seconds(self.rng.random_range(0..365 * 24 * 3600))
    }

    fn user(&mut self, n: usize) -> Option<User> {
        let first = self.pick(FIRST_NAMES);
        let last = self.pick(LAST_NAMES);
        // The index keeps emails unique however the names repeat.
        let address = format!(
            "{}.{}{n}@example.com",
            first.to_lowercase(),
            last.to_lowercase()
        );
        Some(User {
            id: UserId::generate(),
            name: format!("{first} {last}"),
            email: Email::parse(&address).ok()?,
            signup_source: self.pick(SIGNUP_SOURCES).to_owned(),
            created_at: self.within_last_year(),
        })
    }

    fn product(&mut self) -> Product {
        let name = format!("{} {}", self.pick(ADJECTIVES), self.pick(NOUNS));
        let cents = self.rng.random_range(1_000..=100_000);
        Product {
            id: ProductId::generate(),
            description: Some(format!("{name} for everyday use.")),
            name,
            category: self.pick(CATEGORIES).to_owned(),
            price: Price::from_cents(cents),
            // Roughly one product in four is retired.
            is_active: self.rng.random_ratio(3, 4),
            created_at: self.within_last_year(),
        }
    }

    /// `None` when there are no users or no products to order.
    fn order(&mut self, users: &[User], products: &[Product]) -> Option<Order> {
        let user = users.choose(self.rng)?;
        let order_id = OrderId::generate();
        let count = self.rng.random_range(1..=5).min(products.len());
        let items: Vec<OrderItem> = products
            .choose_multiple(self.rng, count)
            .map(|product| OrderItem {
                id: OrderItemId::generate(),
                order_id: order_id.clone(),
                product_id: product.id.clone(),
                quantity: self.rng.random_range(1..=3),
                unit_price: product.price,
            })
            .collect();
        if items.is_empty() {
            return None;
        }
        let total_amount: Decimal = items.iter().map(OrderItem::line_total).sum();

        let status = match self.rng.random_range(0..8) {
            0 | 1 => OrderStatus::Cancelled,
            2 => OrderStatus::Pending,
            _ => OrderStatus::Completed,
        };
        Some(Order {
            id: order_id,
            user_id: user.id.clone(),
            order_date: self.within_last_year(),
            status,
            total_amount,
            items,
        })
    }

    fn cart(&mut self, users: &[User], products: &[Product]) -> Option<Cart> {
        if products.is_empty() {
            return None;
        }
        let user = users.choose(self.rng)?;
        let cart_id = CartId::generate();
        let created_at = self.within_last_year();
        let count = self.rng.random_range(0..=4).min(products.len());
        let items = products
            .choose_multiple(self.rng, count)
            .map(|product| {
                let added_at = created_at + Duration::minutes(self.rng.random_range(0..120));
                let removed_at = self
                    .rng
                    .random_bool(0.2)
                    .then(|| added_at + Duration::minutes(self.rng.random_range(1..60)));
                CartItem {
                    id: CartItemId::generate(),
                    cart_id: cart_id.clone(),
                    product_id: product.id.clone(),
                    added_at,
                    removed_at,
                }
            })
            .collect();

        let status = match self.rng.random_range(0..10) {
            0..=3 => CartStatus::Abandoned,
            4..=7 => CartStatus::Converted,
            _ => CartStatus::Active,
        };
        Some(Cart {
            id: cart_id,
            user_id: user.id.clone(),
            created_at,
            status,
            items,
        })
    }

    fn review(&mut self, users: &[User], products: &[Product]) -> Option<Review> {
        let user = users.choose(self.rng)?;
        let product = products.choose(self.rng)?;
        Some(Review {
            id: ReviewId::generate(),
            user_id: user.id.clone(),
            product_id: product.id.clone(),
            rating: Rating::new(self.rng.random_range(1..=5)).ok()?,
            comment: Some(self.pick(COMMENTS).to_owned()),
            review_date: self.within_last_year(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn small() -> SeedConfig {
        SeedConfig {
            users: 12,
            products: 8,
            orders: 40,
            reviews: 30,
            carts: 25,
            seed: Some(7),
        }
    }

    #[test]
    fn test_generated_data_is_referentially_consistent() {
        let snapshot = generate(&small(), Utc::now());

        let users: HashSet<_> = snapshot.users.iter().map(|u| &u.id).collect();
        let products: HashSet<_> = snapshot.products.iter().map(|p| &p.id).collect();

        for order in &snapshot.orders {
            assert!(users.contains(&order.user_id));
            assert!(!order.items.is_empty());
            assert_eq!(order.total_amount, order.items_total());
            for item in &order.items {
                assert_eq!(item.order_id, order.id);
                assert!(products.contains(&item.product_id));
                assert!(item.quantity > 0);
            }
        }
        for cart in &snapshot.carts {
            assert!(users.contains(&cart.user_id));
            for item in &cart.items {
                assert!(products.contains(&item.product_id));
                if let Some(removed_at) = item.removed_at {
                    assert!(removed_at >= item.added_at);
                }
            }
        }
        for review in &snapshot.reviews {
            assert!(users.contains(&review.user_id));
            assert!(products.contains(&review.product_id));
        }
    }

    #[test]
    fn test_emails_are_unique() {
        let snapshot = generate(&SeedConfig { users: 200, ..small() }, Utc::now());
        let emails: HashSet<_> = snapshot.users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails.len(), 200);
    }

    #[test]
    fn test_same_seed_same_shape() {
        let now = Utc::now();
        let a = generate(&small(), now);
        let b = generate(&small(), now);
        let names = |s: &Snapshot| s.users.iter().map(|u| u.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&a), names(&b));
        let totals = |s: &Snapshot| s.orders.iter().map(|o| o.total_amount).collect::<Vec<_>>();
        assert_eq!(totals(&a), totals(&b));
    }

    #[test]
    fn test_timestamps_are_whole_milliseconds() {
        use chrono::Timelike;

        let now = DateTime::from_timestamp(1_700_000_000, 987_654_321).unwrap();
        let snapshot = generate(&small(), now);
        let whole = |at: &DateTime<Utc>| at.nanosecond() % 1_000_000 == 0;
        assert!(snapshot.orders.iter().all(|o| whole(&o.order_date)));
        assert!(snapshot.users.iter().all(|u| whole(&u.created_at)));
        assert!(
            snapshot
                .carts
                .iter()
                .flat_map(|c| &c.items)
                .all(|i| whole(&i.added_at) && i.removed_at.as_ref().is_none_or(whole))
        );
    }

    #[test]
    fn test_no_products_means_no_orders() {
        let snapshot = generate(&SeedConfig { products: 0, ..small() }, Utc::now());
        assert_eq!(snapshot.users.len(), 12);
        assert!(snapshot.orders.is_empty());
        assert!(snapshot.carts.is_empty());
    }
}
