//! Products domain module.
//!
//! This crate contains the catalog's product record, the search filter
//! builder and the page types, implemented purely as deterministic domain
//! logic (no IO, no HTTP, no storage).

pub mod filter;
pub mod page;
pub mod product;

pub use filter::{Condition, Predicate, ProductFilter, build_filter};
pub use page::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, PageRequest, Sort, SortDirection, SortField};
pub use product::{PRICE_SCALE, Product, ProductCategory, ProductFields};
