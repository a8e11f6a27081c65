//! Database query functions for the `plants` table.
//!
//! Mutations run inside an explicit transaction: either the statement and
//! the commit both succeed, or the transaction is rolled back before the
//! error is returned to the caller.

use sqlx::PgPool;

use crate::error::StoreError;
use crate::models::{NewPlant, Plant};

/// Insert a new plant row. Returns the inserted plant with its
/// store-assigned id.
pub async fn insert_plant(pool: &PgPool, new: &NewPlant) -> Result<Plant, StoreError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| StoreError::from_sqlx("failed to begin transaction", e))?;

    let inserted = sqlx::query_as::<_, Plant>(
        "INSERT INTO plants (name, image, price) \
         VALUES ($1, $2, $3) \
         RETURNING *",
    )
    .bind(&new.name)
    .bind(&new.image)
    .bind(new.price)
    .fetch_one(&mut *tx)
    .await;

    let plant = match inserted {
        Ok(plant) => plant,
        Err(e) => {
            tx.rollback().await.ok();
            return Err(StoreError::from_sqlx("failed to insert plant", e));
        }
    };

    tx.commit()
        .await
        .map_err(|e| StoreError::from_sqlx("failed to commit plant insert", e))?;

    Ok(plant)
}

/// Fetch a plant by its id.
pub async fn get_plant(pool: &PgPool, id: i32) -> Result<Option<Plant>, StoreError> {
    let plant = sqlx::query_as::<_, Plant>("SELECT * FROM plants WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StoreError::from_sqlx("failed to fetch plant", e))?;

    Ok(plant)
}

/// List all plants in store-native order (no ordering contract).
pub async fn list_plants(pool: &PgPool) -> Result<Vec<Plant>, StoreError> {
    let plants = sqlx::query_as::<_, Plant>("SELECT * FROM plants")
        .fetch_all(pool)
        .await
        .map_err(|e| StoreError::from_sqlx("failed to list plants", e))?;

    Ok(plants)
}

/// Delete a plant by id. Returns `true` when a row was removed, `false`
/// when no plant with that id exists.
pub async fn delete_plant(pool: &PgPool, id: i32) -> Result<bool, StoreError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| StoreError::from_sqlx("failed to begin transaction", e))?;

    let result = sqlx::query("DELETE FROM plants WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await;

    let deleted = match result {
        Ok(r) => r.rows_affected() > 0,
        Err(e) => {
            tx.rollback().await.ok();
            return Err(StoreError::from_sqlx("failed to delete plant", e));
        }
    };

    tx.commit()
        .await
        .map_err(|e| StoreError::from_sqlx("failed to commit plant delete", e))?;

    Ok(deleted)
}

/// Count all plant rows.
pub async fn count_plants(pool: &PgPool) -> Result<i64, StoreError> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM plants")
        .fetch_one(pool)
        .await
        .map_err(|e| StoreError::from_sqlx("failed to count plants", e))?;

    Ok(count.0)
}
