//! Repository for the `customers` table.

use postframe_core::types::DbId;
use sqlx::PgPool;

use crate::models::customer::{CreateCustomer, Customer};

/// Column list for `customers` queries.
const COLUMNS: &str =
    "id, username, whatsapp_number, no_of_post, is_active, created_at, updated_at";

pub struct CustomerRepo;

impl CustomerRepo {
    pub async fn create(pool: &PgPool, input: &CreateCustomer) -> Result<Customer, sqlx::Error> {
        let query = format!(
            "INSERT INTO customers (username, whatsapp_number, no_of_post) \
             VALUES ($1, $2, COALESCE($3, 0)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Customer>(&query)
            .bind(&input.username)
            .bind(&input.whatsapp_number)
            .bind(input.no_of_post)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Customer>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM customers WHERE id = $1");
        sqlx::query_as::<_, Customer>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Load and row-lock a customer inside a transaction.
    ///
    /// Serializes concurrent frame creation for the same customer so the
    /// frame quota cannot be exceeded by a race.
    pub async fn lock_by_id(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: DbId,
    ) -> Result<Option<Customer>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM customers WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Customer>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }
}
