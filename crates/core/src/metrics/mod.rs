//! The metric catalog.
//!
//! Every metric is described once in [`CATALOG`]: its slug, the datasets it
//! reads and its default row limit. Computations are pure functions over the
//! loaded [`Datasets`], so a metric gives the same answer against any store
//! holding the same data.

mod carts;
mod customers;
mod engine;
mod listing;
mod overview;
mod sales;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::store::Dataset::{self, Carts, Orders, Products, Reviews, Users};
use crate::store::Datasets;

pub use carts::{
    AbandonedProduct, AbandonmentRate, ConversionFunnel, ProductConversion, TimeToPurchase,
};
pub use customers::{
    CustomerBehavior, CustomerSpending, LoyalCustomer, MonthlyRepeat, Segment, SegmentCounts,
};
pub use engine::{Comparison, MetricsEngine, SideReport, compare};
pub use listing::{CatalogEntry, CatalogSort, EntityCounts, PriceSummary, RatedProduct};
pub use overview::{Overview, RecentOrder, RevenueLeader};
pub use sales::{Affinity, LargeOrder, MonthlyOrderValue, ProductPair, ProductSales};

/// Largest accepted `limit`.
pub const MAX_LIMIT: usize = 100;

/// Identifies a metric of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricId {
    Catalog,
    TopRated,
    TopSelling,
    RepeatCustomers,
    LoyalCustomers,
    Abandoned,
    Affinity,
    AbandonmentRate,
    Overview,
    Segmentation,
    CustomerSpending,
    PriceSummary,
    EntityCounts,
    OrderValueByMonth,
    ProductConversion,
    LargestOrders,
    ConversionFunnel,
    AvgTimeToPurchase,
}

impl MetricId {
    /// The catalog entry describing this metric.
    #[must_use]
    #[allow(clippy::indexing_slicing)] // CATALOG is in declaration order
    pub fn spec(self) -> &'static MetricSpec {
        &CATALOG[self as usize]
    }

    /// Route/CLI name.
    #[must_use]
    pub fn slug(self) -> &'static str {
        self.spec().slug
    }

    /// Look a metric up by its slug.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for unknown slugs.
    pub fn from_slug(slug: &str) -> Result<Self> {
        CATALOG
            .iter()
            .find(|spec| spec.slug == slug)
            .map(|spec| spec.id)
            .ok_or_else(|| Error::NotFound(format!("metric {slug}")))
    }
}

impl std::fmt::Display for MetricId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Declarative description of a metric.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricSpec {
    pub id: MetricId,
    pub slug: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// Row limit applied when the caller gives none. `None` means the full result.
    pub default_limit: Option<usize>,
    /// Whether the metric honours `limit` at all.
    pub limited: bool,
    /// Datasets the engine loads before computing.
    pub inputs: &'static [Dataset],
}

/// Every metric the engine can compute.
pub static CATALOG: [MetricSpec; 18] = [
    MetricSpec {
        id: MetricId::Catalog,
        slug: "catalog",
        title: "Product catalog",
        description: "Active products, sorted newest first or by price",
        default_limit: None,
        limited: false,
        inputs: &[Products],
    },
    MetricSpec {
        id: MetricId::TopRated,
        slug: "top-rated",
        title: "Top-rated products",
        description: "Average rating per reviewed active product",
        default_limit: Some(10),
        limited: true,
        inputs: &[Products, Reviews],
    },
    MetricSpec {
        id: MetricId::TopSelling,
        slug: "top-selling",
        title: "Top-selling products",
        description: "Units and revenue per product over completed orders",
        default_limit: Some(10),
        limited: true,
        inputs: &[Products, Orders],
    },
    MetricSpec {
        id: MetricId::RepeatCustomers,
        slug: "repeat-customers",
        title: "Repeat customers per month",
        description: "Customers with more than one order in a calendar month",
        default_limit: None,
        limited: true,
        inputs: &[Orders],
    },
    MetricSpec {
        id: MetricId::LoyalCustomers,
        slug: "loyal-customers",
        title: "Lifetime repeat customers",
        description: "Customers who ordered in at least two distinct months",
        default_limit: None,
        limited: true,
        inputs: &[Users, Orders],
    },
    MetricSpec {
        id: MetricId::Abandoned,
        slug: "abandoned",
        title: "Abandoned products",
        description: "Items of abandoned carts per product, removed items included",
        default_limit: Some(10),
        limited: true,
        inputs: &[Products, Carts],
    },
    MetricSpec {
        id: MetricId::Affinity,
        slug: "affinity",
        title: "Product affinity",
        description: "Product pairs bought together in the same order",
        default_limit: Some(10),
        limited: true,
        inputs: &[Products, Orders],
    },
    MetricSpec {
        id: MetricId::AbandonmentRate,
        slug: "abandonment-rate",
        title: "Cart abandonment rate",
        description: "Share of carts that were abandoned",
        default_limit: None,
        limited: false,
        inputs: &[Carts],
    },
    MetricSpec {
        id: MetricId::Overview,
        slug: "overview",
        title: "Data overview",
        description: "Store-wide counts, revenue, recent orders and revenue leaders",
        default_limit: Some(10),
        limited: true,
        inputs: &[Users, Products, Carts, Orders, Reviews],
    },
    MetricSpec {
        id: MetricId::Segmentation,
        slug: "segmentation",
        title: "Customer segmentation",
        description: "VIP, Regular and Casual customer counts with purchase patterns",
        default_limit: None,
        limited: false,
        inputs: &[Users, Products, Orders],
    },
    MetricSpec {
        id: MetricId::CustomerSpending,
        slug: "customer-spending",
        title: "Customer spending",
        description: "Order count, total spent and average rating given per customer",
        default_limit: Some(5),
        limited: true,
        inputs: &[Users, Orders, Reviews],
    },
    MetricSpec {
        id: MetricId::PriceSummary,
        slug: "price-summary",
        title: "Price summary",
        description: "Count, average, minimum and maximum product price",
        default_limit: None,
        limited: false,
        inputs: &[Products],
    },
    MetricSpec {
        id: MetricId::EntityCounts,
        slug: "entity-counts",
        title: "Entity counts",
        description: "Number of stored records per entity",
        default_limit: None,
        limited: false,
        inputs: &[Users, Products, Carts, Orders, Reviews],
    },
    MetricSpec {
        id: MetricId::OrderValueByMonth,
        slug: "order-value-by-month",
        title: "Average order value by month",
        description: "Average completed order value per calendar month",
        default_limit: None,
        limited: true,
        inputs: &[Orders],
    },
    MetricSpec {
        id: MetricId::ProductConversion,
        slug: "product-conversion",
        title: "Product conversion",
        description: "How often a carted product is purchased",
        default_limit: Some(10),
        limited: true,
        inputs: &[Products, Carts, Orders],
    },
    MetricSpec {
        id: MetricId::LargestOrders,
        slug: "largest-orders",
        title: "Largest orders",
        description: "Orders with the most line items",
        default_limit: Some(10),
        limited: true,
        inputs: &[Users, Orders],
    },
    MetricSpec {
        id: MetricId::ConversionFunnel,
        slug: "conversion-funnel",
        title: "Cart conversion funnel",
        description: "Carts created, filled, converted and abandoned",
        default_limit: None,
        limited: false,
        inputs: &[Carts],
    },
    MetricSpec {
        id: MetricId::AvgTimeToPurchase,
        slug: "avg-time-to-purchase",
        title: "Average time to purchase",
        description: "Minutes from adding a product to a cart until the customer orders it",
        default_limit: None,
        limited: false,
        inputs: &[Carts, Orders],
    },
];

/// A validated request to compute one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricRequest {
    pub metric: MetricId,
    limit: Option<usize>,
    pub sort: CatalogSort,
}

impl MetricRequest {
    /// Request `metric` with its default limit.
    #[must_use]
    pub const fn new(metric: MetricId) -> Self {
        Self {
            metric,
            limit: None,
            sort: CatalogSort::Newest,
        }
    }

    /// Parse a request from route/CLI parameters.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an unknown slug, [`Error::Validation`] for a
    /// limit outside `1..=100`.
    pub fn parse(slug: &str, limit: Option<i64>, sort: Option<&str>) -> Result<Self> {
        let request = Self::new(MetricId::from_slug(slug)?).with_limit(limit)?;
        Ok(request.with_sort(CatalogSort::parse_lenient(sort.unwrap_or_default())))
    }

    /// Set an explicit row limit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] unless `1 <= limit <= 100`.
    pub fn with_limit(mut self, limit: Option<i64>) -> Result<Self> {
        self.limit = match limit {
            None => None,
            Some(value) => {
                let value = usize::try_from(value)
                    .ok()
                    .filter(|v| (1..=MAX_LIMIT).contains(v))
                    .ok_or_else(|| {
                        Error::Validation(format!("limit must be between 1 and {MAX_LIMIT}"))
                    })?;
                Some(value)
            }
        };
        Ok(self)
    }

    /// Set the catalog sort order.
    #[must_use]
    pub const fn with_sort(mut self, sort: CatalogSort) -> Self {
        self.sort = sort;
        self
    }

    /// Rows to keep: the explicit limit, else the metric's default, else all.
    #[must_use]
    pub fn row_limit(&self) -> usize {
        let spec = self.metric.spec();
        if !spec.limited {
            return usize::MAX;
        }
        self.limit.or(spec.default_limit).unwrap_or(usize::MAX)
    }
}

/// The computed payload of a metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "metric", content = "data", rename_all = "kebab-case")]
pub enum MetricOutput {
    Catalog(Vec<CatalogEntry>),
    TopRated(Vec<RatedProduct>),
    TopSelling(Vec<ProductSales>),
    RepeatCustomers(Vec<MonthlyRepeat>),
    LoyalCustomers(Vec<LoyalCustomer>),
    Abandoned(Vec<AbandonedProduct>),
    Affinity(Affinity),
    AbandonmentRate(AbandonmentRate),
    Overview(Box<Overview>),
    Segmentation(CustomerBehavior),
    CustomerSpending(Vec<CustomerSpending>),
    PriceSummary(PriceSummary),
    EntityCounts(EntityCounts),
    OrderValueByMonth(Vec<MonthlyOrderValue>),
    ProductConversion(Vec<ProductConversion>),
    LargestOrders(Vec<LargeOrder>),
    ConversionFunnel(ConversionFunnel),
    AvgTimeToPurchase(TimeToPurchase),
}

impl MetricOutput {
    /// Number of rows for list metrics, 1 for scalar ones.
    #[must_use]
    pub fn row_count(&self) -> usize {
        match self {
            Self::Catalog(rows) => rows.len(),
            Self::TopRated(rows) => rows.len(),
            Self::TopSelling(rows) => rows.len(),
            Self::RepeatCustomers(rows) => rows.len(),
            Self::LoyalCustomers(rows) => rows.len(),
            Self::Abandoned(rows) => rows.len(),
            Self::Affinity(affinity) => affinity.pairs.len(),
            Self::CustomerSpending(rows) => rows.len(),
            Self::OrderValueByMonth(rows) => rows.len(),
            Self::ProductConversion(rows) => rows.len(),
            Self::LargestOrders(rows) => rows.len(),
            Self::AbandonmentRate(_)
            | Self::Overview(_)
            | Self::Segmentation(_)
            | Self::PriceSummary(_)
            | Self::EntityCounts(_)
            | Self::ConversionFunnel(_)
            | Self::AvgTimeToPurchase(_) => 1,
        }
    }
}

/// Compute `request` over already-loaded datasets. Empty data gives empty answers.
#[must_use]
pub fn compute(request: &MetricRequest, data: &Datasets) -> MetricOutput {
    let limit = request.row_limit();
    match request.metric {
        MetricId::Catalog => MetricOutput::Catalog(listing::catalog(&data.products, request.sort)),
        MetricId::TopRated => {
            MetricOutput::TopRated(listing::top_rated(&data.products, &data.reviews, limit))
        }
        MetricId::TopSelling => {
            MetricOutput::TopSelling(sales::top_selling(&data.products, &data.orders, limit))
        }
        MetricId::RepeatCustomers => {
            MetricOutput::RepeatCustomers(customers::repeat_customers(&data.orders, limit))
        }
        MetricId::LoyalCustomers => MetricOutput::LoyalCustomers(customers::loyal_customers(
            &data.users,
            &data.orders,
            limit,
        )),
        MetricId::Abandoned => {
            MetricOutput::Abandoned(carts::abandoned(&data.products, &data.carts, limit))
        }
        MetricId::Affinity => {
            MetricOutput::Affinity(sales::affinity(&data.products, &data.orders, limit))
        }
        MetricId::AbandonmentRate => {
            MetricOutput::AbandonmentRate(carts::abandonment_rate(&data.carts))
        }
        MetricId::Overview => MetricOutput::Overview(Box::new(overview::overview(data, limit))),
        MetricId::Segmentation => MetricOutput::Segmentation(customers::behavior(
            &data.users,
            &data.products,
            &data.orders,
        )),
        MetricId::CustomerSpending => MetricOutput::CustomerSpending(
            customers::spending(&data.users, &data.orders, &data.reviews, limit),
        ),
        MetricId::PriceSummary => {
            MetricOutput::PriceSummary(listing::price_summary(&data.products))
        }
        MetricId::EntityCounts => MetricOutput::EntityCounts(listing::entity_counts(data)),
        MetricId::OrderValueByMonth => {
            MetricOutput::OrderValueByMonth(sales::order_value_by_month(&data.orders, limit))
        }
        MetricId::ProductConversion => MetricOutput::ProductConversion(carts::product_conversion(
            &data.products,
            &data.carts,
            &data.orders,
            limit,
        )),
        MetricId::LargestOrders => {
            MetricOutput::LargestOrders(sales::largest_orders(&data.users, &data.orders, limit))
        }
        MetricId::ConversionFunnel => {
            MetricOutput::ConversionFunnel(carts::conversion_funnel(&data.carts))
        }
        MetricId::AvgTimeToPurchase => {
            MetricOutput::AvgTimeToPurchase(carts::time_to_purchase(&data.carts, &data.orders))
        }
    }
}

/// A calendar month, serialized as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    /// The month containing `at`.
    #[must_use]
    pub fn of(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    /// Display label such as `March 2024`.
    #[must_use]
    pub fn label(self) -> String {
        let name = chrono::Month::try_from(u8::try_from(self.month).unwrap_or(1))
            .map_or("Unknown", |m| m.name());
        format!("{name} {}", self.year)
    }
}

impl std::fmt::Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Round half away from zero to two decimals, like SQL `ROUND(x, 2)`.
pub(crate) fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// `part / whole × 100` rounded to two decimals; zero when `whole` is zero.
pub(crate) fn percent(part: usize, whole: usize) -> Decimal {
    if whole == 0 {
        return round2(Decimal::ZERO);
    }
    round2(Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole))
}

/// Mean rounded to two decimals; `None` for an empty input.
pub(crate) fn mean(total: Decimal, count: usize) -> Option<Decimal> {
    (count > 0).then(|| round2(total / Decimal::from(count)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::at;

    #[test]
    fn test_catalog_slugs_are_unique_and_round_trip() {
        for (index, spec) in CATALOG.iter().enumerate() {
            assert_eq!(spec.id as usize, index, "{} out of order", spec.slug);
            assert_eq!(MetricId::from_slug(spec.slug).unwrap(), spec.id);
            assert_eq!(spec.id.slug(), spec.slug);
            assert_eq!(
                serde_json::to_value(spec.id).unwrap(),
                serde_json::Value::String(spec.slug.to_owned())
            );
        }
        assert!(matches!(
            MetricId::from_slug("comparison"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_limit_bounds() {
        let request = MetricRequest::new(MetricId::TopSelling);
        assert_eq!(request.row_limit(), 10);
        assert_eq!(request.with_limit(Some(3)).unwrap().row_limit(), 3);
        assert_eq!(request.with_limit(Some(100)).unwrap().row_limit(), 100);
        assert!(request.with_limit(Some(0)).is_err());
        assert!(request.with_limit(Some(101)).is_err());
        assert!(request.with_limit(Some(-4)).is_err());
    }

    #[test]
    fn test_unlimited_metrics_ignore_limit() {
        let request = MetricRequest::new(MetricId::Catalog)
            .with_limit(Some(2))
            .unwrap();
        assert_eq!(request.row_limit(), usize::MAX);
        let months = MetricRequest::new(MetricId::RepeatCustomers);
        assert_eq!(months.row_limit(), usize::MAX);
    }

    #[test]
    fn test_parse_falls_back_to_newest() {
        let request = MetricRequest::parse("catalog", None, Some("cheapest")).unwrap();
        assert_eq!(request.sort, CatalogSort::Newest);
        let request = MetricRequest::parse("catalog", None, Some("price_high")).unwrap();
        assert_eq!(request.sort, CatalogSort::PriceHigh);
    }

    #[test]
    fn test_empty_store_yields_empty_answers() {
        let data = Datasets::default();
        for spec in &CATALOG {
            let output = compute(&MetricRequest::new(spec.id), &data);
            let json = serde_json::to_value(&output).unwrap();
            assert_eq!(json["metric"], spec.slug);
            match output {
                MetricOutput::AbandonmentRate(rate) => assert_eq!(rate.rate, Decimal::ZERO),
                MetricOutput::Segmentation(behavior) => {
                    assert_eq!(behavior.segments, SegmentCounts::default());
                }
                MetricOutput::Overview(overview) => {
                    assert_eq!(overview.order_count, 0);
                    assert_eq!(overview.total_revenue, Decimal::ZERO);
                    assert!(overview.recent_orders.is_empty());
                }
                MetricOutput::PriceSummary(summary) => assert_eq!(summary.product_count, 0),
                MetricOutput::EntityCounts(counts) => assert_eq!(counts, EntityCounts::default()),
                MetricOutput::ConversionFunnel(funnel) => {
                    assert_eq!(funnel.carts_created, 0);
                    assert_eq!(funnel.conversion_rate, Decimal::ZERO);
                }
                MetricOutput::Affinity(affinity) => {
                    assert_eq!(affinity.qualifying_orders, 0);
                    assert!(affinity.pairs.is_empty());
                }
                MetricOutput::AvgTimeToPurchase(wait) => {
                    assert_eq!(wait.matched_items, 0);
                    assert_eq!(wait.average_minutes, None);
                    assert_eq!(json["data"]["average_minutes"], serde_json::Value::Null);
                }
                other => assert_eq!(other.row_count(), 0, "{}", spec.slug),
            }
        }
    }

    #[test]
    fn test_month_formatting() {
        let month = Month::of(at(2024, 3, 15, 10));
        assert_eq!(month.to_string(), "2024-03");
        assert_eq!(month.label(), "March 2024");
    }

    #[test]
    fn test_percent_of_zero_is_zero() {
        assert_eq!(percent(3, 0), Decimal::ZERO);
        assert_eq!(percent(1, 3), Decimal::new(3333, 2));
        assert_eq!(percent(2, 3), Decimal::new(6667, 2));
    }
}
