use chrono::{DateTime, Utc};
use uuid::Uuid;

const RANDOM_PART_LEN: usize = 9;

/// Generates a record id shaped `local_<unix millis>_<9 alphanumerics>`.
pub fn generate_id() -> String {
    generate_id_at(Utc::now())
}

pub fn generate_id_at(now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "local_{}_{}",
        now.timestamp_millis(),
        &random[..RANDOM_PART_LEN]
    )
}
