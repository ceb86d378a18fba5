//! Postgres-backed product store.
//!
//! Search predicates are rendered into a parameterized `WHERE` clause with
//! `sqlx::QueryBuilder`; no user input is ever spliced into SQL text. Sort
//! columns come from a fixed whitelist (`SortField::column`).
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | Database, SQLSTATE class `23` | `Constraint` |
//! | Database (other) | `Database` |
//! | PoolClosed / PoolTimedOut / Io / Tls | `Unavailable` |
//! | ColumnDecode / Decode / ColumnNotFound | `Decode` |
//! | anything else | `Database` |

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::instrument;

use catalog_core::{Entity, ProductId};
use catalog_products::{Condition, Page, PageRequest, Predicate, Product, ProductFields, SortField};

use super::store::{ProductRepository, ProductTransaction, StoreError};

const SELECT_COLUMNS: &str = "SELECT id, name, description, price, stock_quantity, category FROM products";

/// Postgres-backed product store.
///
/// Uses a SQLx connection pool (thread-safe). Writes run inside explicit
/// transactions handed out by [`ProductRepository::begin`].
#[derive(Debug, Clone)]
pub struct PostgresProductStore {
    pool: Arc<PgPool>,
}

impl PostgresProductStore {
    /// Create a new PostgresProductStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the `products` table if it does not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NULL,
                price NUMERIC(19, 2) NOT NULL,
                stock_quantity INTEGER NOT NULL,
                category TEXT NOT NULL
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl ProductRepository for PostgresProductStore {
    #[instrument(skip(self), err)]
    async fn find_all(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY id ASC"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_all", e))?;
        decode_rows(rows)
    }

    #[instrument(skip(self), err)]
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_id", e))?;
        row.map(decode_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_matching(
        &self,
        predicate: &Predicate,
        page: &PageRequest,
    ) -> Result<Page<Product>, StoreError> {
        let mut count = count_query(predicate);
        let total: i64 = count
            .build()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_matching", e))?
            .try_get(0)
            .map_err(|e| map_sqlx_error("count_matching", e))?;

        let mut select = page_query(predicate, page);
        let rows = select
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_matching", e))?;

        Ok(Page::new(decode_rows(rows)?, page, total.max(0) as u64))
    }

    async fn begin(&self) -> Result<Box<dyn ProductTransaction>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(Box::new(PostgresProductTransaction { tx }))
    }
}

struct PostgresProductTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ProductTransaction for PostgresProductTransaction {
    #[instrument(skip(self), err)]
    async fn find_by_id(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = $1 FOR UPDATE"))
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_product", e))?;
        row.map(decode_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn insert(&mut self, fields: ProductFields) -> Result<Product, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, description, price, stock_quantity, category)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, price, stock_quantity, category
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(fields.stock_quantity)
        .bind(fields.category.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        decode_row(row)
    }

    #[instrument(skip(self), fields(product_id = %product.id()), err)]
    async fn update(&mut self, product: &Product) -> Result<Product, StoreError> {
        let fields = product.fields();
        let row = sqlx::query(
            r#"
            UPDATE products
            SET name = $2,
                description = $3,
                price = $4,
                stock_quantity = $5,
                category = $6
            WHERE id = $1
            RETURNING id, name, description, price, stock_quantity, category
            "#,
        )
        .bind(product.id().as_i64())
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(fields.stock_quantity)
        .bind(fields.category.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;
        decode_row(row)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: ProductId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

fn count_query(predicate: &Predicate) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM products");
    push_where(&mut qb, predicate);
    qb
}

fn page_query(predicate: &Predicate, page: &PageRequest) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(SELECT_COLUMNS);
    push_where(&mut qb, predicate);

    let sort = page.sort();
    qb.push(" ORDER BY ");
    qb.push(sort.field.column());
    qb.push(" ");
    qb.push(sort.direction.as_sql());
    if sort.field != SortField::Id {
        qb.push(", id ASC");
    }

    qb.push(" LIMIT ");
    qb.push_bind(i64::from(page.size()));
    qb.push(" OFFSET ");
    qb.push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
    qb
}

/// Append ` WHERE <conditions joined by AND>`; no conditions renders `TRUE`.
fn push_where(qb: &mut QueryBuilder<'static, Postgres>, predicate: &Predicate) {
    qb.push(" WHERE ");
    if predicate.is_always() {
        qb.push("TRUE");
        return;
    }

    let mut clauses = qb.separated(" AND ");
    for condition in predicate.conditions() {
        match condition {
            Condition::NameContains(needle) => {
                clauses.push("LOWER(name) LIKE ");
                clauses.push_bind_unseparated(like_pattern(needle));
                clauses.push_unseparated(" ESCAPE '\\'");
            }
            Condition::PriceAtLeast(min) => {
                clauses.push("price >= ");
                clauses.push_bind_unseparated(*min);
            }
            Condition::PriceAtMost(max) => {
                clauses.push("price <= ");
                clauses.push_bind_unseparated(*max);
            }
            Condition::CategoryIs(category) => {
                clauses.push("category = ");
                clauses.push_bind_unseparated(category.as_str());
            }
            Condition::StockAtLeast(min) => {
                clauses.push("stock_quantity >= ");
                clauses.push_bind_unseparated(*min);
            }
        }
    }
}

/// `%needle%` with LIKE metacharacters in the needle matched literally.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: i64,
    name: String,
    description: Option<String>,
    price: Decimal,
    stock_quantity: i32,
    category: String,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            stock_quantity: row.try_get("stock_quantity")?,
            category: row.try_get("category")?,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let category = row
            .category
            .parse()
            .map_err(|e| StoreError::Decode(format!("product {}: {e}", row.id)))?;
        Ok(Product::new(
            ProductId::from_i64(row.id),
            ProductFields {
                name: row.name,
                description: row.description,
                price: row.price,
                stock_quantity: row.stock_quantity,
                category,
            },
        ))
    }
}

fn decode_row(row: PgRow) -> Result<Product, StoreError> {
    let row = ProductRow::from_row(&row).map_err(|e| map_sqlx_error("decode_product", e))?;
    Product::try_from(row)
}

fn decode_rows(rows: Vec<PgRow>) -> Result<Vec<Product>, StoreError> {
    rows.into_iter().map(decode_row).collect()
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code() {
                // Integrity constraint violation class (unique, foreign key, check, not null)
                Some(code) if code.starts_with("23") => StoreError::Constraint(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool unavailable in {}", operation))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {}: {}", operation, e)),
        sqlx::Error::Tls(e) => StoreError::Unavailable(format!("tls error in {}: {}", operation, e)),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Decode(format!("{} in {}", err, operation))
        }
        sqlx::Error::RowNotFound => {
            StoreError::Database(format!("unexpected row not found in {}", operation))
        }
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}
