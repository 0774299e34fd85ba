//! Persistent store seam: a single insert-if-absent write.

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};

use crate::error::StoreError;
use crate::models::vacancy::{ClassifiedListing, Vacancy};

#[async_trait]
pub trait ListingStore: Send {
    /// Store the listing unless its hh_id is already present. `Ok(true)`
    /// means a new row was written, `Ok(false)` a duplicate.
    async fn insert_if_absent(&mut self, listing: &ClassifiedListing) -> Result<bool, StoreError>;
}

/// Postgres store bound to one pooled connection, held for a whole save
/// batch and returned to the pool on drop.
pub struct PgStore {
    conn: PoolConnection<Postgres>,
}

impl PgStore {
    pub async fn acquire(pool: &PgPool) -> Result<Self, StoreError> {
        let conn = pool.acquire().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl ListingStore for PgStore {
    async fn insert_if_absent(&mut self, listing: &ClassifiedListing) -> Result<bool, StoreError> {
        Ok(Vacancy::insert_if_absent(&mut *self.conn, listing).await?)
    }
}
