//! The `plantstore seed` command: load the sample catalog.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::PgPool;

use plantstore_db::models::NewPlant;
use plantstore_db::queries::plants;

/// The sample plants shipped with the store.
fn sample_plants() -> Vec<NewPlant> {
    vec![
        NewPlant {
            name: "Aloe".to_owned(),
            image: "./images/aloe.jpg".to_owned(),
            price: Decimal::new(11_50, 2),
        },
        NewPlant {
            name: "ZZ Plant".to_owned(),
            image: "./images/zz-plant.jpg".to_owned(),
            price: Decimal::new(25_98, 2),
        },
    ]
}

/// Execute the `plantstore seed` command.
///
/// Clears existing rows and restarts the id sequence so reseeding always
/// produces the same catalog, then inserts the samples through the normal
/// insert path (ids are store-assigned).
pub async fn run_seed(pool: &PgPool) -> Result<()> {
    println!("Seeding database...");

    sqlx::query("TRUNCATE plants RESTART IDENTITY")
        .execute(pool)
        .await
        .context("failed to clear existing plants")?;

    let samples = sample_plants();
    let total = samples.len();
    for new in &samples {
        let plant = plants::insert_plant(pool, new)
            .await
            .with_context(|| format!("failed to seed plant {:?}", new.name))?;
        println!("  {}: {} (${})", plant.id, plant.name, plant.price);
    }

    println!("Seeded {total} plants.");
    Ok(())
}
