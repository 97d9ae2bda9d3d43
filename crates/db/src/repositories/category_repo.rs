//! Repository for the `categories` and `business_categories` tables.

use postframe_core::types::DbId;
use sqlx::PgPool;

use crate::models::category::{
    BusinessCategory, Category, CreateBusinessCategory, CreateCategory,
};

/// Column list for `categories` queries.
const CATEGORY_COLUMNS: &str = "id, name, is_active, created_at, updated_at";

/// Column list for `business_categories` queries.
const BUSINESS_CATEGORY_COLUMNS: &str = "id, name, profession_type, created_at, updated_at";

pub struct CategoryRepo;

impl CategoryRepo {
    pub async fn create(pool: &PgPool, input: &CreateCategory) -> Result<Category, sqlx::Error> {
        let query =
            format!("INSERT INTO categories (name) VALUES ($1) RETURNING {CATEGORY_COLUMNS}");
        sqlx::query_as::<_, Category>(&query)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    pub async fn create_business(
        pool: &PgPool,
        input: &CreateBusinessCategory,
    ) -> Result<BusinessCategory, sqlx::Error> {
        let query = format!(
            "INSERT INTO business_categories (name, profession_type) VALUES ($1, $2) \
             RETURNING {BUSINESS_CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, BusinessCategory>(&query)
            .bind(&input.name)
            .bind(input.profession_type.trim().to_ascii_lowercase())
            .fetch_one(pool)
            .await
    }

    pub async fn find_business_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<BusinessCategory>, sqlx::Error> {
        let query =
            format!("SELECT {BUSINESS_CATEGORY_COLUMNS} FROM business_categories WHERE id = $1");
        sqlx::query_as::<_, BusinessCategory>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
