//! Register (or rename) a teacher so they can manage announcements.
//!
//! Usage: add-teacher USERNAME [--display-name NAME]

use clap::Parser;

use announcements_api::{config, db};

#[derive(Parser)]
#[command(name = "add-teacher", about = "Register a teacher allowed to manage announcements")]
struct Args {
    /// Username passed as `teacher_username` by the frontend
    username: String,

    /// Human-readable name shown in staff tooling
    #[arg(long, default_value = "")]
    display_name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let username = args.username.trim();
    if username.is_empty() {
        anyhow::bail!("username must not be empty");
    }

    let database_url = config::required("DATABASE_URL")?;
    let pool = db::create_pool(&database_url, 2).await?;
    db::run_migrations(&pool).await?;

    let teacher = db::PgTeacherStore::new(pool)
        .upsert(username, args.display_name.trim())
        .await?;

    tracing::info!(
        "Teacher '{}' registered (display name: '{}')",
        teacher.username,
        teacher.display_name
    );

    Ok(())
}
