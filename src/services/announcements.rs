use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{
    db::{AnnouncementStore, TeacherStore},
    error::AppError,
    models::announcement::{
        Announcement, AnnouncementFields, AnnouncementId, AnnouncementPayload, IdLookup,
        NewAnnouncement,
    },
    services::{clock::Clock, metrics},
};

pub const MAX_MESSAGE_CHARS: usize = 500;

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(value: &str, field_name: &str) -> Result<NaiveDate, AppError> {
    let invalid = || AppError::BadRequest(format!("{field_name} must be in YYYY-MM-DD format"));

    let bytes = value.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())
}

/// Check the message and date window of a create/update payload.
pub fn validate_payload(payload: &AnnouncementPayload) -> Result<AnnouncementFields, AppError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("Message is required".into()));
    }
    if message.contains('\0') {
        return Err(AppError::BadRequest("Message must not contain NUL characters".into()));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::BadRequest(format!(
            "Message must be at most {MAX_MESSAGE_CHARS} characters"
        )));
    }

    let expires_at = parse_date(&payload.expires_at, "expires_at")?;
    let starts_at = match payload.starts_at.as_deref() {
        Some(s) if !s.is_empty() => Some(parse_date(s, "starts_at")?),
        _ => None,
    };

    if let Some(starts_at) = starts_at {
        if expires_at < starts_at {
            return Err(AppError::BadRequest(
                "expires_at must be the same as or after starts_at".into(),
            ));
        }
    }

    Ok(AnnouncementFields {
        message: message.to_string(),
        starts_at,
        expires_at,
    })
}

fn not_found() -> AppError {
    AppError::NotFound("Announcement not found".into())
}

pub struct AnnouncementService {
    announcements: Arc<dyn AnnouncementStore>,
    teachers: Arc<dyn TeacherStore>,
    clock: Arc<dyn Clock>,
}

impl AnnouncementService {
    pub fn new(
        announcements: Arc<dyn AnnouncementStore>,
        teachers: Arc<dyn TeacherStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            announcements,
            teachers,
            clock,
        }
    }

    pub async fn health_check(&self) -> anyhow::Result<()> {
        self.announcements.ping().await
    }

    /// Any existing teacher counts as signed in; no credential is checked.
    pub async fn require_signed_in_user(&self, username: Option<&str>) -> Result<(), AppError> {
        let username = match username {
            Some(u) if !u.is_empty() => u,
            _ => return Err(AppError::Unauthorized("Authentication required".into())),
        };

        if !self.teachers.exists(username).await? {
            warn!("Rejected unknown teacher username: {}", username);
            return Err(AppError::Unauthorized("Invalid teacher credentials".into()));
        }
        Ok(())
    }

    /// Announcements whose window contains today, soonest expiry first.
    pub async fn active_announcements(&self) -> Result<Vec<Announcement>, AppError> {
        let today = self.clock.today();
        Ok(self.announcements.find_active(today).await?)
    }

    /// Every announcement, newest first.
    pub async fn all_announcements(
        &self,
        username: Option<&str>,
    ) -> Result<Vec<Announcement>, AppError> {
        self.require_signed_in_user(username).await?;
        Ok(self.announcements.find_all().await?)
    }

    pub async fn create_announcement(
        &self,
        payload: &AnnouncementPayload,
        username: Option<&str>,
    ) -> Result<Announcement, AppError> {
        let result = self.create(payload, username).await;
        metrics::record_write("create", &result);
        result
    }

    pub async fn update_announcement(
        &self,
        id: &str,
        payload: &AnnouncementPayload,
        username: Option<&str>,
    ) -> Result<Announcement, AppError> {
        let result = self.update(id, payload, username).await;
        metrics::record_write("update", &result);
        result
    }

    pub async fn delete_announcement(
        &self,
        id: &str,
        username: Option<&str>,
    ) -> Result<Value, AppError> {
        let result = self.delete(id, username).await;
        metrics::record_write("delete", &result);
        result
    }

    async fn create(
        &self,
        payload: &AnnouncementPayload,
        username: Option<&str>,
    ) -> Result<Announcement, AppError> {
        self.require_signed_in_user(username).await?;
        let fields = validate_payload(payload)?;

        let new = NewAnnouncement {
            id: AnnouncementId::generate(),
            fields,
            created_at: self.clock.today(),
        };
        let created = self.announcements.insert(&new).await?;
        info!("Announcement {} created by {}", created.id, username.unwrap_or_default());
        Ok(created)
    }

    async fn update(
        &self,
        id: &str,
        payload: &AnnouncementPayload,
        username: Option<&str>,
    ) -> Result<Announcement, AppError> {
        self.require_signed_in_user(username).await?;
        let fields = validate_payload(payload)?;

        let updated = self
            .announcements
            .update(&IdLookup::new(id), &fields)
            .await?
            .ok_or_else(not_found)?;
        info!("Announcement {} updated by {}", updated.id, username.unwrap_or_default());
        Ok(updated)
    }

    async fn delete(&self, id: &str, username: Option<&str>) -> Result<Value, AppError> {
        self.require_signed_in_user(username).await?;

        if !self.announcements.delete(&IdLookup::new(id)).await? {
            return Err(not_found());
        }
        info!("Announcement {} deleted by {}", id, username.unwrap_or_default());
        Ok(json!({ "message": "Announcement deleted" }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{MemoryAnnouncementStore, MemoryTeacherStore},
        models::announcement::parse_object_id,
        services::clock::FixedClock,
    };

    const TEACHER: Option<&str> = Some("mrodriguez");

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn payload(message: &str, starts_at: Option<&str>, expires_at: &str) -> AnnouncementPayload {
        AnnouncementPayload {
            message: message.into(),
            starts_at: starts_at.map(Into::into),
            expires_at: expires_at.into(),
        }
    }

    struct Fixture {
        announcements: Arc<MemoryAnnouncementStore>,
        teachers: Arc<MemoryTeacherStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                announcements: Arc::new(MemoryAnnouncementStore::new()),
                teachers: Arc::new(MemoryTeacherStore::with_teachers(["mrodriguez"])),
            }
        }

        fn service_on(&self, today: &str) -> AnnouncementService {
            AnnouncementService::new(
                self.announcements.clone(),
                self.teachers.clone(),
                Arc::new(FixedClock(date(today))),
            )
        }
    }

    #[test]
    fn parse_date_accepts_iso_dates() {
        assert_eq!(parse_date("2024-02-29", "expires_at").unwrap(), date("2024-02-29"));
    }

    #[test]
    fn parse_date_rejects_invalid_month_naming_the_field() {
        let err = parse_date("2024-13-01", "expires_at").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(err.to_string().contains("expires_at"));
    }

    #[test]
    fn parse_date_rejects_other_shapes() {
        for value in ["2024-1-05", "2024/01/05", "05-01-2024", "2024-01-05T00:00:00", "", "+024-01-05", "2023-02-29"] {
            assert!(parse_date(value, "starts_at").is_err(), "{value} should be rejected");
        }
    }

    #[test]
    fn validate_trims_message_and_treats_empty_start_as_absent() {
        let fields = validate_payload(&payload("  Picture Day  ", Some(""), "2024-01-31")).unwrap();
        assert_eq!(fields.message, "Picture Day");
        assert_eq!(fields.starts_at, None);
    }

    #[test]
    fn validate_rejects_blank_and_oversized_messages() {
        let err = validate_payload(&payload("   ", None, "2024-01-31")).unwrap_err();
        assert_eq!(err.to_string(), "Message is required");

        let long = "x".repeat(MAX_MESSAGE_CHARS + 1);
        assert!(matches!(
            validate_payload(&payload(&long, None, "2024-01-31")),
            Err(AppError::BadRequest(_))
        ));

        let exact = format!("  {}  ", "é".repeat(MAX_MESSAGE_CHARS));
        assert!(validate_payload(&payload(&exact, None, "2024-01-31")).is_ok());
    }

    #[test]
    fn validate_allows_single_day_window() {
        assert!(validate_payload(&payload("m", Some("2024-01-10"), "2024-01-10")).is_ok());
    }

    #[tokio::test]
    async fn create_rejects_expiry_before_start_without_persisting() {
        let fx = Fixture::new();
        let service = fx.service_on("2024-01-15");

        let err = service
            .create_announcement(&payload("m", Some("2024-01-31"), "2024-01-01"), TEACHER)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "expires_at must be the same as or after starts_at");
        assert!(fx.announcements.is_empty().await);
    }

    #[tokio::test]
    async fn create_then_read_back_round_trips_fields() {
        let fx = Fixture::new();
        let service = fx.service_on("2024-01-15");

        let created = service
            .create_announcement(&payload(" Picture Day ", Some("2024-01-01"), "2024-01-31"), TEACHER)
            .await
            .unwrap();
        assert!(matches!(created.id, AnnouncementId::Opaque(_)));
        assert_eq!(created.created_at, date("2024-01-15"));

        let all = service.all_announcements(TEACHER).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].message, "Picture Day");
        assert_eq!(all[0].starts_at, Some(date("2024-01-01")));
        assert_eq!(all[0].expires_at, date("2024-01-31"));
    }

    #[tokio::test]
    async fn writes_require_a_known_teacher() {
        let fx = Fixture::new();
        let service = fx.service_on("2024-01-15");
        let body = payload("m", None, "2024-01-31");

        let missing = service.create_announcement(&body, None).await.unwrap_err();
        assert_eq!(missing.to_string(), "Authentication required");

        let empty = service.create_announcement(&body, Some("")).await.unwrap_err();
        assert!(matches!(empty, AppError::Unauthorized(_)));

        let unknown = service.create_announcement(&body, Some("ghost")).await.unwrap_err();
        assert_eq!(unknown.to_string(), "Invalid teacher credentials");

        assert!(matches!(
            service.update_announcement("x", &body, Some("ghost")).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            service.delete_announcement("x", None).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            service.all_announcements(None).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(fx.announcements.is_empty().await);
    }

    #[tokio::test]
    async fn unauthorized_takes_precedence_over_invalid_payload() {
        let fx = Fixture::new();
        let service = fx.service_on("2024-01-15");
        let err = service
            .create_announcement(&payload("", None, "not-a-date"), Some("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn rejected_writes_leave_existing_record_untouched() {
        let fx = Fixture::new();
        let service = fx.service_on("2024-01-15");
        let original = service
            .create_announcement(&payload("Assembly", Some("2024-01-10"), "2024-01-31"), TEACHER)
            .await
            .unwrap();
        let id = original.id.to_string();
        let edit = payload("Hijacked", None, "2025-01-01");

        for username in [None, Some("ghost")] {
            assert!(matches!(
                service.update_announcement(&id, &edit, username).await,
                Err(AppError::Unauthorized(_))
            ));
            assert!(matches!(
                service.delete_announcement(&id, username).await,
                Err(AppError::Unauthorized(_))
            ));
        }

        let all = service.all_announcements(TEACHER).await.unwrap();
        assert_eq!(all, vec![original]);
    }

    #[tokio::test]
    async fn nul_bytes_in_ids_and_usernames_map_to_client_errors() {
        let fx = Fixture::new();
        let service = fx.service_on("2024-01-15");

        assert!(matches!(
            service.delete_announcement("a\0b", TEACHER).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service
                .update_announcement("a\0b", &payload("m", None, "2024-01-31"), TEACHER)
                .await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.all_announcements(Some("x\0")).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            service
                .create_announcement(&payload("a\0b", None, "2024-01-31"), TEACHER)
                .await,
            Err(AppError::BadRequest(_))
        ));
        assert!(fx.announcements.is_empty().await);
    }

    #[tokio::test]
    async fn picture_day_leaves_active_list_after_expiry() {
        let fx = Fixture::new();
        fx.service_on("2024-01-15")
            .create_announcement(&payload("Picture Day", Some("2024-01-01"), "2024-01-31"), TEACHER)
            .await
            .unwrap();

        let during = fx.service_on("2024-01-15").active_announcements().await.unwrap();
        assert_eq!(during.len(), 1);
        assert_eq!(during[0].message, "Picture Day");

        let after = fx.service_on("2024-02-01");
        assert!(after.active_announcements().await.unwrap().is_empty());
        assert_eq!(after.all_announcements(TEACHER).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn active_list_filters_window_and_orders_by_expiry() {
        let fx = Fixture::new();
        let service = fx.service_on("2024-01-15");
        for (message, starts_at, expires_at) in [
            ("later", None, "2024-03-01"),
            ("expired", Some("2023-12-01"), "2024-01-14"),
            ("future", Some("2024-01-16"), "2024-02-01"),
            ("sooner", None, "2024-01-15"),
            ("open-ended start", Some("2024-01-15"), "2024-02-01"),
            ("tie", None, "2024-03-01"),
        ] {
            service
                .create_announcement(&payload(message, starts_at, expires_at), TEACHER)
                .await
                .unwrap();
        }

        let active: Vec<String> = service
            .active_announcements()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.message)
            .collect();
        assert_eq!(active, ["sooner", "open-ended start", "later", "tie"]);
    }

    #[tokio::test]
    async fn manage_list_is_newest_first_with_insertion_tie_break() {
        let fx = Fixture::new();
        for (today, message) in [("2024-01-10", "a"), ("2024-01-12", "b"), ("2024-01-12", "c")] {
            fx.service_on(today)
                .create_announcement(&payload(message, None, "2024-12-31"), TEACHER)
                .await
                .unwrap();
        }

        let all: Vec<String> = fx
            .service_on("2024-01-20")
            .all_announcements(TEACHER)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.message)
            .collect();
        assert_eq!(all, ["b", "c", "a"]);
    }

    #[tokio::test]
    async fn update_replaces_fields_but_keeps_id_and_creation_date() {
        let fx = Fixture::new();
        let created = fx
            .service_on("2024-01-10")
            .create_announcement(&payload("Old", None, "2024-01-31"), TEACHER)
            .await
            .unwrap();

        let updated = fx
            .service_on("2024-01-20")
            .update_announcement(
                &created.id.to_string(),
                &payload(" New ", Some("2024-01-21"), "2024-02-28"),
                TEACHER,
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, date("2024-01-10"));
        assert_eq!(updated.message, "New");
        assert_eq!(updated.starts_at, Some(date("2024-01-21")));
        assert_eq!(updated.expires_at, date("2024-02-28"));
    }

    #[tokio::test]
    async fn update_missing_id_is_not_found_and_changes_nothing() {
        let fx = Fixture::new();
        let service = fx.service_on("2024-01-15");
        let created = service
            .create_announcement(&payload("Keep", None, "2024-01-31"), TEACHER)
            .await
            .unwrap();

        let err = service
            .update_announcement("does-not-exist", &payload("Changed", None, "2024-02-01"), TEACHER)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Announcement not found");

        let all = service.all_announcements(TEACHER).await.unwrap();
        assert_eq!(all, vec![created]);
    }

    #[tokio::test]
    async fn delete_twice_succeeds_then_not_found() {
        let fx = Fixture::new();
        let service = fx.service_on("2024-01-15");
        let created = service
            .create_announcement(&payload("Bye", None, "2024-01-31"), TEACHER)
            .await
            .unwrap();
        let id = created.id.to_string();

        let first = service.delete_announcement(&id, TEACHER).await.unwrap();
        assert_eq!(first, json!({ "message": "Announcement deleted" }));
        assert!(matches!(
            service.delete_announcement(&id, TEACHER).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn legacy_object_id_records_are_addressable_by_hex() {
        let fx = Fixture::new();
        let hex_id = "65a1b2c3d4e5f60718293a4b";
        fx.announcements
            .insert(&NewAnnouncement {
                id: AnnouncementId::ObjectId(parse_object_id(hex_id).unwrap()),
                fields: AnnouncementFields {
                    message: "Legacy".into(),
                    starts_at: None,
                    expires_at: date("2024-01-31"),
                },
                created_at: date("2023-09-01"),
            })
            .await
            .unwrap();

        let service = fx.service_on("2024-01-15");
        let updated = service
            .update_announcement(hex_id, &payload("Legacy, edited", None, "2024-02-15"), TEACHER)
            .await
            .unwrap();
        assert_eq!(updated.id.to_string(), hex_id);
        assert_eq!(updated.message, "Legacy, edited");

        service.delete_announcement(hex_id, TEACHER).await.unwrap();
        assert!(fx.announcements.is_empty().await);
    }
}
