//! Repository for the `customer_groups` table.

use postframe_core::types::DbId;
use sqlx::PgPool;

use crate::models::customer_group::{CreateCustomerGroup, CustomerGroup};

/// Column list for `customer_groups` queries.
const COLUMNS: &str = "id, name, created_at, updated_at";

pub struct CustomerGroupRepo;

impl CustomerGroupRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateCustomerGroup,
    ) -> Result<CustomerGroup, sqlx::Error> {
        let query = format!("INSERT INTO customer_groups (name) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, CustomerGroup>(&query)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<CustomerGroup>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM customer_groups WHERE id = $1");
        sqlx::query_as::<_, CustomerGroup>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
