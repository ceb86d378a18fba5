use std::fmt::Display;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, de};

use catalog_core::DomainResult;
use catalog_products::{DEFAULT_PAGE_SIZE, PageRequest, ProductCategory, ProductFilter, Sort};

// -------------------------
// Request DTOs
// -------------------------

/// Query string of `GET /products/search`.
///
/// Every criterion is optional and a blank value (`?minPrice=`) counts as
/// absent. A negative `page` reads as the first page and a `size` below 1 as
/// the default of 20.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub min_price: Option<Decimal>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub max_price: Option<Decimal>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<ProductCategory>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub min_stock_quantity: Option<i32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub size: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub sort: Option<String>,
}

impl SearchParams {
    /// Split into the search criteria and the page request.
    pub fn into_parts(self) -> DomainResult<(ProductFilter, PageRequest)> {
        let sort = self.sort.as_deref().map(str::parse::<Sort>).transpose()?;
        let page = self
            .page
            .map_or(0, |p| u32::try_from(p.max(0)).unwrap_or(u32::MAX));
        let size = match self.size {
            Some(s) if s >= 1 => u32::try_from(s).unwrap_or(u32::MAX),
            _ => DEFAULT_PAGE_SIZE,
        };
        let filter = ProductFilter {
            name: self.name,
            min_price: self.min_price,
            max_price: self.max_price,
            category: self.category,
            min_stock_quantity: self.min_stock_quantity,
        };
        Ok((filter, PageRequest::new(page, size, sort)))
    }
}

/// Parse a query value with `FromStr`, reading an empty value as `None`.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}
