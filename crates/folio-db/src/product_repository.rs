use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use folio_core::error::AppError;
use folio_core::models::{
    PRICE_PLACEHOLDER, ProductDetailDraft, ProductDetailRecord, ProductDraft, ProductRecord,
};
use folio_core::traits::CatalogStore;
use sqlx::types::Json;
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

/// Catalog persistence in PostgreSQL.
///
/// Both upserts are single `INSERT ... ON CONFLICT DO UPDATE` statements, so
/// concurrent writers for the same key converge on one row.
#[derive(Clone)]
pub struct ProductRepository {
    pool: Pool<Postgres>,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM products"#)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(count)
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    title: String,
    author: Option<String>,
    price: String,
    image_url: Option<String>,
    product_url: String,
    category: String,
    condition: Option<String>,
    description: Option<String>,
    scraped_at: DateTime<Utc>,
}

impl From<ProductRow> for ProductRecord {
    fn from(row: ProductRow) -> Self {
        ProductRecord {
            id: row.id,
            title: row.title,
            author: row.author,
            price: row.price,
            image_url: row.image_url,
            product_url: row.product_url,
            category: row.category,
            condition: row.condition,
            description: row.description,
            scraped_at: row.scraped_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductDetailRow {
    id: Uuid,
    product_id: Uuid,
    description: String,
    specs: Json<BTreeMap<String, String>>,
    ratings_avg: Option<f64>,
    reviews_count: Option<i32>,
    updated_at: DateTime<Utc>,
}

impl From<ProductDetailRow> for ProductDetailRecord {
    fn from(row: ProductDetailRow) -> Self {
        ProductDetailRecord {
            id: row.id,
            product_id: row.product_id,
            description: row.description,
            specs: row.specs.0,
            ratings_avg: row.ratings_avg,
            reviews_count: row.reviews_count.map(|c| c.max(0) as u32),
            updated_at: row.updated_at,
        }
    }
}

const PRODUCT_COLUMNS: &str =
    "id, title, author, price, image_url, product_url, category, condition, description, scraped_at";

impl CatalogStore for ProductRepository {
    async fn upsert_product(&self, draft: &ProductDraft) -> Result<ProductRecord, AppError> {
        // NULL draft fields keep the stored value.
        let sql = format!(
            r#"
            INSERT INTO products
                (title, author, price, image_url, product_url, category, condition, description, scraped_at)
            VALUES ($1, $2, COALESCE($3::text, $9), $4, $5, $6, $7, $8, NOW())
            ON CONFLICT (product_url) DO UPDATE SET
                title = EXCLUDED.title,
                category = EXCLUDED.category,
                price = COALESCE($3::text, products.price),
                author = COALESCE(EXCLUDED.author, products.author),
                image_url = COALESCE(EXCLUDED.image_url, products.image_url),
                condition = COALESCE(EXCLUDED.condition, products.condition),
                description = COALESCE(EXCLUDED.description, products.description),
                scraped_at = NOW(),
                updated_at = NOW()
            RETURNING {PRODUCT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&draft.title)
            .bind(&draft.author)
            .bind(&draft.price)
            .bind(&draft.image_url)
            .bind(&draft.product_url)
            .bind(&draft.category)
            .bind(&draft.condition)
            .bind(&draft.description)
            .bind(PRICE_PLACEHOLDER)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.into())
    }

    async fn upsert_detail(
        &self,
        product_id: Uuid,
        detail: &ProductDetailDraft,
    ) -> Result<ProductDetailRecord, AppError> {
        let row = sqlx::query_as::<_, ProductDetailRow>(
            r#"
            INSERT INTO product_details (product_id, description, specs, ratings_avg, reviews_count)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (product_id) DO UPDATE SET
                description = EXCLUDED.description,
                specs = EXCLUDED.specs,
                ratings_avg = EXCLUDED.ratings_avg,
                reviews_count = EXCLUDED.reviews_count,
                updated_at = NOW()
            RETURNING id, product_id, description, specs, ratings_avg, reviews_count, updated_at
            "#,
        )
        .bind(product_id)
        .bind(&detail.description)
        .bind(Json(&detail.specs))
        .bind(detail.ratings_avg)
        .bind(detail.reviews_count.map(|c| c.min(i32::MAX as u32) as i32))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.into())
    }

    async fn get_product_by_url(&self, product_url: &str) -> Result<Option<ProductRecord>, AppError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE product_url = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(product_url)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    async fn get_detail(&self, product_id: Uuid) -> Result<Option<ProductDetailRecord>, AppError> {
        let row = sqlx::query_as::<_, ProductDetailRow>(
            r#"
            SELECT id, product_id, description, specs, ratings_avg, reviews_count, updated_at
            FROM product_details
            WHERE product_id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.map(Into::into))
    }
}
