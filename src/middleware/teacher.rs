use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Query},
    http::{request::Parts, Uri},
};

/// The `teacher_username` query parameter, if any. Whether it names a real
/// teacher is decided by the service, not here.
#[derive(Debug, Clone)]
pub struct TeacherUsername(pub Option<String>);

impl TeacherUsername {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Last `teacher_username` value in the query string; repeated keys are allowed.
fn username_from_uri(uri: &Uri) -> Option<String> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri).ok()?;
    pairs
        .into_iter()
        .filter(|(key, _)| key == "teacher_username")
        .map(|(_, value)| value)
        .last()
}

impl<S> FromRequestParts<S> for TeacherUsername
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(TeacherUsername(username_from_uri(&parts.uri)))
    }
}
