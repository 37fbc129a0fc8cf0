use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use announcements_api::{
    config::Config,
    db::{self, PgAnnouncementStore, PgTeacherStore},
    router,
    services::{announcements::AnnouncementService, clock::SystemClock},
    AppState,
};

/// The configured base URL, or a loopback origin on any port.
fn is_allowed_origin(origin: &str, base_url: &str) -> bool {
    if origin == base_url {
        return true;
    }
    ["http://localhost", "http://127.0.0.1"].iter().any(|host| {
        origin
            .strip_prefix(host)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let service = AnnouncementService::new(
        Arc::new(PgAnnouncementStore::new(pool.clone())),
        Arc::new(PgTeacherStore::new(pool)),
        Arc::new(SystemClock),
    );
    let state = AppState::new(service);

    // Allow the app base URL and any localhost origin (local development).
    let base_url = config.app_base_url.clone();
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        origin
            .to_str()
            .map(|o| is_allowed_origin(o, &base_url))
            .unwrap_or(false)
    });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([header::CONTENT_TYPE, header::ACCEPT]))
        .allow_origin(cors_origin);

    let app = router(state).layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Announcements API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_origins_are_allowed_on_any_port() {
        let base = "https://school.example";
        assert!(is_allowed_origin("http://localhost", base));
        assert!(is_allowed_origin("http://localhost:5173", base));
        assert!(is_allowed_origin("http://127.0.0.1:8080", base));
        assert!(is_allowed_origin("https://school.example", base));
    }

    #[test]
    fn lookalike_hosts_are_rejected() {
        let base = "https://school.example";
        assert!(!is_allowed_origin("http://localhost.evil.example", base));
        assert!(!is_allowed_origin("http://127.0.0.1.evil.example", base));
        assert!(!is_allowed_origin("https://school.example.evil", base));
    }
}
