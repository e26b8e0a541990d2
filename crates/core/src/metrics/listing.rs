//! Catalog-level metrics: listing, ratings and simple aggregates.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::mean;
use crate::model::{Product, Review};
use crate::store::Datasets;
use crate::types::{Price, ProductId};

/// Catalog sort order. Unknown values fall back to [`CatalogSort::Newest`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSort {
    #[default]
    Newest,
    PriceLow,
    PriceHigh,
}

impl CatalogSort {
    /// Parse a sort parameter, never failing.
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        match value {
            "price_low" => Self::PriceLow,
            "price_high" => Self::PriceHigh,
            _ => Self::Newest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatedProduct {
    pub product_id: ProductId,
    pub name: String,
    pub category: String,
    pub average_rating: Decimal,
    pub review_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceSummary {
    pub product_count: usize,
    pub average_price: Option<Decimal>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
}

/// Number of stored records per entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub users: usize,
    pub products: usize,
    pub carts: usize,
    pub cart_items: usize,
    pub orders: usize,
    pub order_items: usize,
    pub reviews: usize,
}

pub(super) fn catalog(products: &[Product], sort: CatalogSort) -> Vec<CatalogEntry> {
    let mut active: Vec<&Product> = products.iter().filter(|p| p.is_active).collect();
    match sort {
        CatalogSort::Newest => active.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        }),
        CatalogSort::PriceLow => {
            active.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.name.cmp(&b.name)));
        }
        CatalogSort::PriceHigh => {
            active.sort_by(|a, b| b.price.cmp(&a.price).then_with(|| a.name.cmp(&b.name)));
        }
    }

    active
        .into_iter()
        .map(|p| CatalogEntry {
            id: p.id.clone(),
            name: p.name.clone(),
            price: p.price,
            category: p.category.clone(),
        })
        .collect()
}

pub(super) fn top_rated(products: &[Product], reviews: &[Review], limit: usize) -> Vec<RatedProduct> {
    let mut ratings: HashMap<&ProductId, (i64, usize)> = HashMap::new();
    for review in reviews {
        let entry = ratings.entry(&review.product_id).or_default();
        entry.0 += i64::from(review.rating);
        entry.1 += 1;
    }

    let mut rows: Vec<RatedProduct> = products
        .iter()
        .filter(|p| p.is_active)
        .filter_map(|p| {
            let (sum, count) = ratings.get(&p.id)?;
            Some(RatedProduct {
                product_id: p.id.clone(),
                name: p.name.clone(),
                category: p.category.clone(),
                average_rating: mean(Decimal::from(*sum), *count)?,
                review_count: *count,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.average_rating
            .cmp(&a.average_rating)
            .then_with(|| b.review_count.cmp(&a.review_count))
            .then_with(|| a.name.cmp(&b.name))
    });
    rows.truncate(limit);
    rows
}

pub(super) fn price_summary(products: &[Product]) -> PriceSummary {
    let total: Decimal = products.iter().map(|p| p.price.amount()).sum();
    PriceSummary {
        product_count: products.len(),
        average_price: mean(total, products.len()),
        min_price: products.iter().map(|p| p.price).min(),
        max_price: products.iter().map(|p| p.price).max(),
    }
}

pub(super) fn entity_counts(data: &Datasets) -> EntityCounts {
    EntityCounts {
        users: data.users.len(),
        products: data.products.len(),
        carts: data.carts.len(),
        cart_items: data.carts.iter().map(|c| c.items.len()).sum(),
        orders: data.orders.len(),
        order_items: data.orders.iter().map(|o| o.items.len()).sum(),
        reviews: data.reviews.len(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::testing::{at, product, review};

    fn products() -> Vec<Product> {
        vec![
            Product {
                created_at: at(2024, 1, 1, 0),
                ..product("p1", "Lamp", 1500)
            },
            Product {
                created_at: at(2024, 2, 1, 0),
                ..product("p2", "Rug", 8000)
            },
            Product {
                created_at: at(2024, 3, 1, 0),
                is_active: false,
                ..product("p3", "Retired", 100)
            },
            Product {
                created_at: at(2024, 1, 15, 0),
                ..product("p4", "Vase", 3000)
            },
        ]
    }

    fn ids(rows: &[CatalogEntry]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_catalog_sorts_active_products() {
        let products = products();
        assert_eq!(ids(&catalog(&products, CatalogSort::Newest)), ["p2", "p4", "p1"]);
        assert_eq!(ids(&catalog(&products, CatalogSort::PriceLow)), ["p1", "p4", "p2"]);
        assert_eq!(ids(&catalog(&products, CatalogSort::PriceHigh)), ["p2", "p4", "p1"]);
    }

    #[test]
    fn test_top_rated_excludes_unreviewed_and_breaks_ties_by_count() {
        let reviews = vec![
            review("r1", "u1", "p1", 5),
            review("r2", "u2", "p1", 4),
            review("r3", "u1", "p2", 4),
            review("r4", "u2", "p2", 5),
            review("r5", "u3", "p2", 5),
            review("r6", "u1", "p4", 5),
            review("r7", "u1", "p3", 5),
        ];
        let rows = top_rated(&products(), &reviews, 10);

        let ids: Vec<_> = rows.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids, ["p4", "p2", "p1"], "inactive p3 is hidden");
        assert_eq!(rows[1].average_rating, Decimal::new(467, 2));
        assert_eq!(rows[2].average_rating, Decimal::new(450, 2));
        assert_eq!(top_rated(&products(), &reviews, 1).len(), 1);
    }

    #[test]
    fn test_price_summary() {
        let summary = price_summary(&products());
        assert_eq!(summary.product_count, 4);
        assert_eq!(summary.average_price, Some(Decimal::new(3150, 2)));
        assert_eq!(summary.min_price, Some(Price::from_cents(100)));
        assert_eq!(summary.max_price, Some(Price::from_cents(8000)));

        let empty = price_summary(&[]);
        assert_eq!(empty.product_count, 0);
        assert!(empty.average_price.is_none());
    }
}
