use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

use crate::error::AppError;

lazy_static! {
    pub static ref ANNOUNCEMENT_WRITES_COUNTER: CounterVec = register_counter_vec!(
        "api_announcements_total",
        "Announcement write operations by action and outcome",
        &["action", "status"]
    ).unwrap();
}

/// Count a create/update/delete attempt under its outcome.
pub fn record_write<T>(action: &str, result: &Result<T, AppError>) {
    let status = match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    ANNOUNCEMENT_WRITES_COUNTER
        .with_label_values(&[action, status])
        .inc();
}
