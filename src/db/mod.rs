pub mod announcements;
pub mod memory;
pub mod teachers;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::models::announcement::{Announcement, AnnouncementFields, IdLookup, NewAnnouncement};

pub use announcements::PgAnnouncementStore;
pub use memory::{MemoryAnnouncementStore, MemoryTeacherStore};
pub use teachers::PgTeacherStore;

pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run the migrations embedded in ./migrations/
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Persistence for announcement records.
///
/// `update` and `delete` touch at most one record: the earliest inserted one
/// matching the lookup.
#[async_trait]
pub trait AnnouncementStore: Send + Sync {
    /// Records active on `today`, by `expires_at` ascending then insertion order.
    async fn find_active(&self, today: NaiveDate) -> anyhow::Result<Vec<Announcement>>;

    /// Every record, by `created_at` descending then insertion order.
    async fn find_all(&self) -> anyhow::Result<Vec<Announcement>>;

    async fn insert(&self, new: &NewAnnouncement) -> anyhow::Result<Announcement>;

    /// Returns `None` when nothing matched.
    async fn update(
        &self,
        lookup: &IdLookup,
        fields: &AnnouncementFields,
    ) -> anyhow::Result<Option<Announcement>>;

    /// Returns whether a record was removed.
    async fn delete(&self, lookup: &IdLookup) -> anyhow::Result<bool>;

    async fn ping(&self) -> anyhow::Result<()>;
}

/// Read-only view of staff accounts.
#[async_trait]
pub trait TeacherStore: Send + Sync {
    async fn exists(&self, username: &str) -> anyhow::Result<bool>;
}
