//! Page requests and page results.

use core::cmp::Ordering;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use catalog_core::{DomainError, Entity};

use crate::product::Product;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 2000;

/// Sortable product attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Name,
    Description,
    Price,
    StockQuantity,
    Category,
}

impl SortField {
    /// Column name in the `products` table.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Name => "name",
            SortField::Description => "description",
            SortField::Price => "price",
            SortField::StockQuantity => "stock_quantity",
            SortField::Category => "category",
        }
    }
}

impl FromStr for SortField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortField::Id),
            "name" => Ok(SortField::Name),
            "description" => Ok(SortField::Description),
            "price" => Ok(SortField::Price),
            "stockQuantity" | "stock_quantity" => Ok(SortField::StockQuantity),
            "category" => Ok(SortField::Category),
            other => Err(DomainError::validation(format!("unknown sort property: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sort order: `field` or `field,asc|desc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: SortField) -> Self {
        Self { field, direction: SortDirection::Asc }
    }

    pub fn desc(field: SortField) -> Self {
        Self { field, direction: SortDirection::Desc }
    }

    /// Compare two products under this order, breaking ties by id.
    ///
    /// Missing descriptions sort after present ones in ascending order (and
    /// before them in descending order), matching Postgres' NULL placement.
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let primary = match self.field {
            SortField::Id => a.id().cmp(&b.id()),
            SortField::Name => a.name().cmp(b.name()),
            SortField::Description => match (a.description(), b.description()) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortField::Price => a.price().cmp(&b.price()),
            SortField::StockQuantity => a.stock_quantity().cmp(&b.stock_quantity()),
            SortField::Category => a.category().as_str().cmp(b.category().as_str()),
        };
        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id().cmp(&b.id()))
    }
}

impl Default for Sort {
    fn default() -> Self {
        Sort::asc(SortField::Id)
    }
}

impl FromStr for Sort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',').map(str::trim);
        let field: SortField = parts.next().unwrap_or_default().parse()?;
        let direction = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => SortDirection::Asc,
            Some("desc") => SortDirection::Desc,
            Some(other) => {
                return Err(DomainError::validation(format!("unknown sort direction: {other}")));
            }
        };
        if parts.next().is_some() {
            return Err(DomainError::validation(format!("malformed sort: {s}")));
        }
        Ok(Sort { field, direction })
    }
}

/// Which slice of a result set to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
    sort: Sort,
}

impl PageRequest {
    /// A `size` of zero falls back to [`DEFAULT_PAGE_SIZE`]; sizes above
    /// [`MAX_PAGE_SIZE`] are clamped.
    pub fn new(page: u32, size: u32, sort: Option<Sort>) -> Self {
        let size = match size {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        };
        Self {
            page,
            size,
            sort: sort.unwrap_or_default(),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn sort(&self) -> Sort {
        self.sort
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: Sort::default(),
        }
    }
}

/// One page of results plus the metadata needed to navigate the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    content: Vec<T>,
    number: u32,
    size: u32,
    total_elements: u64,
    total_pages: u64,
    number_of_elements: usize,
    first: bool,
    last: bool,
    empty: bool,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        let size = request.size();
        let total_pages = total_elements.div_ceil(u64::from(size));
        let number = request.page();
        Self {
            number_of_elements: content.len(),
            empty: content.is_empty(),
            first: number == 0,
            last: u64::from(number) + 1 >= total_pages,
            content,
            number,
            size,
            total_elements,
            total_pages,
        }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    pub fn is_first(&self) -> bool {
        self.first
    }

    pub fn is_last(&self) -> bool {
        self.last
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{ProductCategory, ProductFields};
    use catalog_core::ProductId;
    use rust_decimal::Decimal;

    fn product(id: i64, name: &str, description: Option<&str>) -> Product {
        Product::new(
            ProductId::from_i64(id),
            ProductFields {
                name: name.to_string(),
                description: description.map(str::to_string),
                price: Decimal::new(id, 0),
                stock_quantity: 1,
                category: ProductCategory::Other,
            },
        )
    }

    #[test]
    fn parses_sort_with_and_without_direction() {
        assert_eq!("price".parse::<Sort>().unwrap(), Sort::asc(SortField::Price));
        assert_eq!("price,DESC".parse::<Sort>().unwrap(), Sort::desc(SortField::Price));
        assert_eq!(
            "stockQuantity,asc".parse::<Sort>().unwrap(),
            Sort::asc(SortField::StockQuantity)
        );
    }

    #[test]
    fn rejects_unknown_sort_property_and_direction() {
        assert!(matches!("weight".parse::<Sort>(), Err(DomainError::Validation(_))));
        assert!(matches!("name,sideways".parse::<Sort>(), Err(DomainError::Validation(_))));
        assert!(matches!("name,asc,extra".parse::<Sort>(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn page_request_defaults_zero_size_and_clamps_large_sizes() {
        assert_eq!(PageRequest::new(0, 0, None), PageRequest::default());
        let req = PageRequest::new(2, 10_000, None);
        assert_eq!(req.size(), MAX_PAGE_SIZE);
        assert_eq!(req.offset(), 4000);
        assert_eq!(req.sort(), Sort::asc(SortField::Id));
    }

    #[test]
    fn page_metadata_reflects_position() {
        let req = PageRequest::new(1, 2, None);
        let page = Page::new(vec!["c", "d"], &req, 5);
        assert_eq!(page.total_pages(), 3);
        assert!(!page.is_first());
        assert!(!page.is_last());
        assert!(!page.is_empty());

        let last = Page::new(vec!["e"], &PageRequest::new(2, 2, None), 5);
        assert!(last.is_last());

        let none: Page<&str> = Page::new(vec![], &PageRequest::default(), 0);
        assert_eq!(none.total_pages(), 0);
        assert!(none.is_first() && none.is_last() && none.is_empty());
    }

    #[test]
    fn page_serializes_with_camel_case_metadata() {
        let page = Page::new(vec![1, 2], &PageRequest::default(), 2);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["content"], serde_json::json!([1, 2]));
        assert_eq!(json["totalElements"], 2);
        assert_eq!(json["numberOfElements"], 2);
        assert_eq!(json["size"], DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn description_sort_places_missing_values_last_when_ascending() {
        let mut items = vec![product(1, "a", None), product(2, "b", Some("zeta")), product(3, "c", Some("alpha"))];

        items.sort_by(|a, b| Sort::asc(SortField::Description).compare(a, b));
        let ids: Vec<i64> = items.iter().map(|p| p.id().as_i64()).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        items.sort_by(|a, b| Sort::desc(SortField::Description).compare(a, b));
        let ids: Vec<i64> = items.iter().map(|p| p.id().as_i64()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn ties_break_by_id() {
        let mut items = vec![product(5, "same", None), product(2, "same", None)];
        items.sort_by(|a, b| Sort::desc(SortField::Name).compare(a, b));
        assert_eq!(items[0].id().as_i64(), 2);
    }
}
