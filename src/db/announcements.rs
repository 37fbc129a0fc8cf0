use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};

use super::AnnouncementStore;
use crate::models::announcement::{
    Announcement, AnnouncementFields, AnnouncementId, IdLookup, NewAnnouncement,
};

const COLUMNS: &str = "seq, id, object_id, message, starts_at, expires_at, created_at";

/// Picks the single earliest row matching either identifier column.
const MATCH_ONE: &str = "seq = (SELECT seq FROM announcements
                                WHERE id = $1 OR object_id = $2
                                ORDER BY seq LIMIT 1)";

#[derive(Debug, FromRow)]
struct AnnouncementRow {
    seq: i64,
    id: Option<String>,
    object_id: Option<Vec<u8>>,
    message: String,
    starts_at: Option<NaiveDate>,
    expires_at: NaiveDate,
    created_at: NaiveDate,
}

impl TryFrom<AnnouncementRow> for Announcement {
    type Error = anyhow::Error;

    fn try_from(row: AnnouncementRow) -> anyhow::Result<Self> {
        let id = match (row.id, row.object_id) {
            (Some(id), _) => AnnouncementId::Opaque(id),
            (None, Some(bytes)) => {
                let bytes: [u8; 12] = bytes.try_into().map_err(|b: Vec<u8>| {
                    anyhow::anyhow!("announcement {} has a {}-byte object id", row.seq, b.len())
                })?;
                AnnouncementId::ObjectId(bytes)
            }
            (None, None) => anyhow::bail!("announcement {} has no identifier", row.seq),
        };
        Ok(Announcement {
            id,
            message: row.message,
            starts_at: row.starts_at,
            expires_at: row.expires_at,
            created_at: row.created_at,
            seq: row.seq,
        })
    }
}

fn into_announcements(rows: Vec<AnnouncementRow>) -> anyhow::Result<Vec<Announcement>> {
    rows.into_iter().map(Announcement::try_from).collect()
}

/// PostgreSQL-backed announcement storage.
#[derive(Clone)]
pub struct PgAnnouncementStore {
    pool: PgPool,
}

impl PgAnnouncementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnnouncementStore for PgAnnouncementStore {
    async fn find_active(&self, today: NaiveDate) -> anyhow::Result<Vec<Announcement>> {
        let rows = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "SELECT {COLUMNS} FROM announcements
             WHERE expires_at >= $1
               AND (starts_at IS NULL OR starts_at <= $1)
             ORDER BY expires_at ASC, seq ASC"
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        into_announcements(rows)
    }

    async fn find_all(&self) -> anyhow::Result<Vec<Announcement>> {
        let rows = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "SELECT {COLUMNS} FROM announcements ORDER BY created_at DESC, seq ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        into_announcements(rows)
    }

    async fn insert(&self, new: &NewAnnouncement) -> anyhow::Result<Announcement> {
        let (id, object_id) = match &new.id {
            AnnouncementId::Opaque(s) => (Some(s.clone()), None),
            AnnouncementId::ObjectId(b) => (None, Some(b.to_vec())),
        };
        let row = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "INSERT INTO announcements (id, object_id, message, starts_at, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(object_id)
        .bind(&new.fields.message)
        .bind(new.fields.starts_at)
        .bind(new.fields.expires_at)
        .bind(new.created_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn update(
        &self,
        lookup: &IdLookup,
        fields: &AnnouncementFields,
    ) -> anyhow::Result<Option<Announcement>> {
        let row = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "UPDATE announcements
             SET message = $3, starts_at = $4, expires_at = $5
             WHERE {MATCH_ONE}
             RETURNING {COLUMNS}"
        ))
        .bind(lookup.text_id())
        .bind(lookup.object_id.map(|b| b.to_vec()))
        .bind(&fields.message)
        .bind(fields.starts_at)
        .bind(fields.expires_at)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Announcement::try_from).transpose()
    }

    async fn delete(&self, lookup: &IdLookup) -> anyhow::Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM announcements WHERE {MATCH_ONE}"))
            .bind(lookup.text_id())
            .bind(lookup.object_id.map(|b| b.to_vec()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
