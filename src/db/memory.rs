//! In-memory stores, used when wiring the service without a database (tests, local demos).

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::{AnnouncementStore, TeacherStore};
use crate::models::announcement::{Announcement, AnnouncementFields, IdLookup, NewAnnouncement};

#[derive(Default)]
struct Records {
    next_seq: i64,
    // Kept in insertion order.
    rows: Vec<Announcement>,
}

#[derive(Default)]
pub struct MemoryAnnouncementStore {
    records: RwLock<Records>,
}

impl MemoryAnnouncementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AnnouncementStore for MemoryAnnouncementStore {
    async fn find_active(&self, today: NaiveDate) -> anyhow::Result<Vec<Announcement>> {
        let records = self.records.read().await;
        let mut active: Vec<Announcement> = records
            .rows
            .iter()
            .filter(|a| a.is_active_on(today))
            .cloned()
            .collect();
        // Stable sort keeps insertion order among equal expiry dates.
        active.sort_by_key(|a| a.expires_at);
        Ok(active)
    }

    async fn find_all(&self) -> anyhow::Result<Vec<Announcement>> {
        let records = self.records.read().await;
        let mut all = records.rows.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn insert(&self, new: &NewAnnouncement) -> anyhow::Result<Announcement> {
        let mut records = self.records.write().await;
        if records.rows.iter().any(|a| a.id == new.id) {
            anyhow::bail!("duplicate announcement id {}", new.id);
        }
        records.next_seq += 1;
        let announcement = Announcement {
            id: new.id.clone(),
            message: new.fields.message.clone(),
            starts_at: new.fields.starts_at,
            expires_at: new.fields.expires_at,
            created_at: new.created_at,
            seq: records.next_seq,
        };
        records.rows.push(announcement.clone());
        Ok(announcement)
    }

    async fn update(
        &self,
        lookup: &IdLookup,
        fields: &AnnouncementFields,
    ) -> anyhow::Result<Option<Announcement>> {
        let mut records = self.records.write().await;
        let Some(row) = records.rows.iter_mut().find(|a| lookup.matches(&a.id)) else {
            return Ok(None);
        };
        row.message = fields.message.clone();
        row.starts_at = fields.starts_at;
        row.expires_at = fields.expires_at;
        Ok(Some(row.clone()))
    }

    async fn delete(&self, lookup: &IdLookup) -> anyhow::Result<bool> {
        let mut records = self.records.write().await;
        match records.rows.iter().position(|a| lookup.matches(&a.id)) {
            Some(index) => {
                records.rows.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTeacherStore {
    usernames: RwLock<HashSet<String>>,
}

impl MemoryTeacherStore {
    pub fn with_teachers<I, S>(usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            usernames: RwLock::new(usernames.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl TeacherStore for MemoryTeacherStore {
    async fn exists(&self, username: &str) -> anyhow::Result<bool> {
        Ok(self.usernames.read().await.contains(username))
    }
}
