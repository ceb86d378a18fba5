//! Search filter builder.
//!
//! Turns a set of optional search criteria into a [`Predicate`]: the logical
//! AND of one [`Condition`] per criterion that is actually present. Building a
//! predicate never touches storage and never fails; storage adapters decide how
//! to evaluate it (in memory via [`Predicate::matches`], or by rendering the
//! conditions into SQL).

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::product::{Product, ProductCategory};

/// A single search constraint on a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Case-insensitive substring match on the name. The needle is lowercase.
    NameContains(String),
    /// `price >= bound`
    PriceAtLeast(Decimal),
    /// `price <= bound`
    PriceAtMost(Decimal),
    /// Exact category match.
    CategoryIs(ProductCategory),
    /// `stock_quantity >= bound`
    StockAtLeast(i32),
}

impl Condition {
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            Condition::NameContains(needle) => product.name().to_lowercase().contains(needle.as_str()),
            Condition::PriceAtLeast(min) => product.price() >= *min,
            Condition::PriceAtMost(max) => product.price() <= *max,
            Condition::CategoryIs(category) => product.category() == *category,
            Condition::StockAtLeast(min) => product.stock_quantity() >= *min,
        }
    }
}

/// Conjunction of conditions. The empty conjunction matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    conditions: Vec<Condition>,
}

impl Predicate {
    /// The identity predicate (no conditions).
    pub fn always() -> Self {
        Self::default()
    }

    /// Add one more condition to the conjunction.
    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_always(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.conditions.iter().all(|c| c.matches(product))
    }
}

/// Optional product search criteria.
///
/// `min_price > max_price` is accepted as-is and simply matches nothing.
/// Deserializes from camelCase keys; missing keys are absent criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductFilter {
    pub name: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub category: Option<ProductCategory>,
    pub min_stock_quantity: Option<i32>,
}

impl ProductFilter {
    pub fn build(&self) -> Predicate {
        let mut predicate = Predicate::always();

        // An empty name is "no constraint", not "match the empty name".
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            predicate = predicate.and(Condition::NameContains(name.to_lowercase()));
        }
        if let Some(min) = self.min_price {
            predicate = predicate.and(Condition::PriceAtLeast(min));
        }
        if let Some(max) = self.max_price {
            predicate = predicate.and(Condition::PriceAtMost(max));
        }
        if let Some(category) = self.category {
            predicate = predicate.and(Condition::CategoryIs(category));
        }
        if let Some(min) = self.min_stock_quantity {
            predicate = predicate.and(Condition::StockAtLeast(min));
        }

        predicate
    }
}

/// Build a predicate from loose criteria. Equivalent to [`ProductFilter::build`].
pub fn build_filter(
    name: Option<&str>,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
    category: Option<ProductCategory>,
    min_stock_quantity: Option<i32>,
) -> Predicate {
    ProductFilter {
        name: name.map(str::to_string),
        min_price,
        max_price,
        category,
        min_stock_quantity,
    }
    .build()
}
