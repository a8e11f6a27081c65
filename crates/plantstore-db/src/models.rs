use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A plant row from the `plants` table.
///
/// `price` is fixed-point decimal end to end; its serde representation is a
/// scale-preserving string (`"11.50"`), never a binary float.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Plant {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub price: Decimal,
}

/// Field values for a plant that has not been persisted yet.
///
/// The store assigns the id on insert. Field-level business validation
/// (non-empty strings, price parseability) happens before one of these is
/// constructed; the database only enforces nullability and column types.
#[derive(Debug, Clone)]
pub struct NewPlant {
    pub name: String,
    pub image: String,
    pub price: Decimal,
}
