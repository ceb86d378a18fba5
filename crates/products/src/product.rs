use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use catalog_core::{DomainError, Entity, ProductId};

/// Fixed set of catalog categories.
///
/// Wire and storage form is the SCREAMING_SNAKE_CASE name (e.g. `"TOOLS"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductCategory {
    Electronics,
    Clothing,
    Books,
    Home,
    Tools,
    Toys,
    Sports,
    Food,
    Beauty,
    Other,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 10] = [
        ProductCategory::Electronics,
        ProductCategory::Clothing,
        ProductCategory::Books,
        ProductCategory::Home,
        ProductCategory::Tools,
        ProductCategory::Toys,
        ProductCategory::Sports,
        ProductCategory::Food,
        ProductCategory::Beauty,
        ProductCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Electronics => "ELECTRONICS",
            ProductCategory::Clothing => "CLOTHING",
            ProductCategory::Books => "BOOKS",
            ProductCategory::Home => "HOME",
            ProductCategory::Tools => "TOOLS",
            ProductCategory::Toys => "TOYS",
            ProductCategory::Sports => "SPORTS",
            ProductCategory::Food => "FOOD",
            ProductCategory::Beauty => "BEAUTY",
            ProductCategory::Other => "OTHER",
        }
    }
}

impl core::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown product category: {s}")))
    }
}

/// Every mutable field of a product.
///
/// This is both the create payload and the update payload: an update replaces
/// all of these at once, so a missing `description` clears the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFields {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub category: ProductCategory,
}

/// Decimal places kept for prices; the `price` column is `NUMERIC(19, 2)`.
pub const PRICE_SCALE: u32 = 2;

impl ProductFields {
    /// Round the price to [`PRICE_SCALE`] places, half away from zero, which
    /// is how Postgres stores it.
    pub fn normalized(mut self) -> Self {
        let mut price = self
            .price
            .round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
        price.rescale(PRICE_SCALE);
        self.price = price;
        self
    }
}

/// A stored product: persistence-assigned identity plus its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    #[serde(flatten)]
    fields: ProductFields,
}

impl Product {
    /// Pair an identifier with field values.
    ///
    /// Only storage adapters should call this; everyone else receives products
    /// back from the repository.
    pub fn new(id: ProductId, fields: ProductFields) -> Self {
        Self { id, fields }
    }

    /// Replace every field, keeping the identity.
    pub fn with_fields(self, fields: ProductFields) -> Self {
        Self { id: self.id, fields }
    }

    pub fn fields(&self) -> &ProductFields {
        &self.fields
    }

    pub fn into_fields(self) -> ProductFields {
        self.fields
    }

    pub fn name(&self) -> &str {
        &self.fields.name
    }

    pub fn description(&self) -> Option<&str> {
        self.fields.description.as_deref()
    }

    pub fn price(&self) -> Decimal {
        self.fields.price
    }

    pub fn stock_quantity(&self) -> i32 {
        self.fields.stock_quantity
    }

    pub fn category(&self) -> ProductCategory {
        self.fields.category
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn widget() -> ProductFields {
        ProductFields {
            name: "Widget".to_string(),
            description: Some("A small widget".to_string()),
            price: Decimal::new(999, 2),
            stock_quantity: 10,
            category: ProductCategory::Tools,
        }
    }

    #[test]
    fn category_round_trips_through_its_wire_name() {
        for category in ProductCategory::ALL {
            assert_eq!(category.as_str().parse::<ProductCategory>().unwrap(), category);
        }
    }

    #[test]
    fn category_parsing_is_case_sensitive() {
        let err = "tools".parse::<ProductCategory>().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn with_fields_keeps_identity_and_replaces_everything_else() {
        let product = Product::new(ProductId::from_i64(3), widget());
        let replacement = ProductFields {
            name: "Gadget".to_string(),
            description: None,
            price: Decimal::new(1, 0),
            stock_quantity: 0,
            category: ProductCategory::Electronics,
        };

        let updated = product.with_fields(replacement.clone());

        assert_eq!(updated.id(), ProductId::from_i64(3));
        assert_eq!(updated.fields(), &replacement);
        assert_eq!(updated.description(), None);
    }

    #[test]
    fn serializes_as_flat_camel_case_json() {
        let product = Product::new(ProductId::from_i64(1), widget());
        let json = serde_json::to_value(&product).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "Widget");
        assert_eq!(json["price"], "9.99");
        assert_eq!(json["stockQuantity"], 10);
        assert_eq!(json["category"], "TOOLS");
    }

    #[test]
    fn normalized_price_has_two_places_rounded_half_away_from_zero() {
        let price = |s: &str| {
            ProductFields { price: s.parse().unwrap(), ..widget() }
                .normalized()
                .price
                .to_string()
        };
        assert_eq!(price("9.999"), "10.00");
        assert_eq!(price("0.125"), "0.13");
        assert_eq!(price("-0.125"), "-0.13");
        assert_eq!(price("9.9"), "9.90");
        assert_eq!(price("9.99"), "9.99");
    }

    #[test]
    fn fields_accept_numeric_price_and_missing_description() {
        let fields: ProductFields = serde_json::from_str(
            r#"{"name":"Widget","price":9.99,"stockQuantity":10,"category":"TOOLS"}"#,
        )
        .unwrap();

        assert_eq!(fields.price, Decimal::new(999, 2));
        assert_eq!(fields.description, None);
    }
}
