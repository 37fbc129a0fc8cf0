use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Identifier of an announcement. Older rows were keyed by a 12-byte object id,
/// newer ones by an opaque string; both kinds coexist in storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnnouncementId {
    ObjectId([u8; 12]),
    Opaque(String),
}

impl AnnouncementId {
    pub fn generate() -> Self {
        AnnouncementId::Opaque(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for AnnouncementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnouncementId::ObjectId(bytes) => f.write_str(&hex::encode(bytes)),
            AnnouncementId::Opaque(s) => f.write_str(s),
        }
    }
}

impl Serialize for AnnouncementId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parses a 24 character hex string into object id bytes.
pub fn parse_object_id(raw: &str) -> Option<[u8; 12]> {
    if raw.len() != 24 {
        return None;
    }
    let mut bytes = [0u8; 12];
    hex::decode_to_slice(raw, &mut bytes).ok()?;
    Some(bytes)
}

/// A caller-supplied id matched against both identifier schemes at once.
#[derive(Debug, Clone)]
pub struct IdLookup {
    pub raw: String,
    pub object_id: Option<[u8; 12]>,
}

impl IdLookup {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            object_id: parse_object_id(raw),
        }
    }

    /// The raw id as a text key, or `None` when it holds a NUL byte, which no
    /// stored text id can contain.
    pub fn text_id(&self) -> Option<&str> {
        (!self.raw.contains('\0')).then_some(self.raw.as_str())
    }

    pub fn matches(&self, id: &AnnouncementId) -> bool {
        matches!(id, AnnouncementId::Opaque(s) if *s == self.raw)
            || matches!(id, AnnouncementId::ObjectId(b) if Some(b) == self.object_id.as_ref())
    }
}

/// Stored announcement, serialized in its wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub message: String,
    pub starts_at: Option<NaiveDate>,
    pub expires_at: NaiveDate,
    pub created_at: NaiveDate,
    /// Insertion order, only used to break ordering ties.
    #[serde(skip)]
    pub seq: i64,
}

impl Announcement {
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.expires_at >= today && self.starts_at.map_or(true, |s| s <= today)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncementPayload {
    pub message: String,
    pub expires_at: String,
    pub starts_at: Option<String>,
}

/// Validated fields written on create and replaced on update.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncementFields {
    pub message: String,
    pub starts_at: Option<NaiveDate>,
    pub expires_at: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewAnnouncement {
    pub id: AnnouncementId,
    pub fields: AnnouncementFields,
    pub created_at: NaiveDate,
}
