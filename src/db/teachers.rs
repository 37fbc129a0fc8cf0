use async_trait::async_trait;
use sqlx::PgPool;

use super::TeacherStore;
use crate::models::teacher::Teacher;

/// TEXT columns cannot hold NUL, so such a username never matches a teacher.
fn lookup_key(username: &str) -> Option<&str> {
    (!username.contains('\0')).then_some(username)
}

#[derive(Clone)]
pub struct PgTeacherStore {
    pool: PgPool,
}

impl PgTeacherStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a teacher, or refresh the display name of an existing one.
    pub async fn upsert(&self, username: &str, display_name: &str) -> anyhow::Result<Teacher> {
        let teacher = sqlx::query_as::<_, Teacher>(
            "INSERT INTO teachers (username, display_name)
             VALUES ($1, $2)
             ON CONFLICT (username) DO UPDATE SET display_name = EXCLUDED.display_name
             RETURNING username, display_name, created_at",
        )
        .bind(username)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(teacher)
    }
}

#[async_trait]
impl TeacherStore for PgTeacherStore {
    async fn exists(&self, username: &str) -> anyhow::Result<bool> {
        let Some(username) = lookup_key(username) else {
            return Ok(false);
        };
        let found: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM teachers WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_with_nul_are_never_queried() {
        assert_eq!(lookup_key("mchen"), Some("mchen"));
        assert_eq!(lookup_key("mchen\0"), None);
    }
}
