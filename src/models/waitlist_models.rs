use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::kv_store;

pub const WAITLIST_SOURCE: &str = "landing_waitlist";

/// An interest registration. Created once per accepted submission and never
/// updated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub email: String,
    pub source: String,
    pub timestamp: String,
}

impl WaitlistEntry {
    pub fn new(email: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            email: email.into(),
            source: WAITLIST_SOURCE.to_string(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn to_local_record(&self) -> LocalWaitlistRecord {
        LocalWaitlistRecord {
            email: self.email.clone(),
            ts: self.timestamp.clone(),
        }
    }
}

/// Shape of the records kept in the local fallback list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalWaitlistRecord {
    pub email: String,
    pub ts: String,
}

#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = kv_store)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct KvEntry {
    pub key: String,
    pub value: String,
    pub updated_at: i64, // unix timestamp of the last write
}

#[derive(Insertable)]
#[diesel(table_name = kv_store)]
pub struct NewKvEntry<'a> {
    pub key: &'a str,
    pub value: &'a str,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn entry_carries_source_tag_and_iso_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();
        let entry = WaitlistEntry::new("user@example.com", at);

        assert_eq!(entry.source, "landing_waitlist");
        assert_eq!(entry.timestamp, "2026-03-01T12:30:00.000Z");
        assert_eq!(
            entry.to_local_record(),
            LocalWaitlistRecord {
                email: "user@example.com".to_string(),
                ts: "2026-03-01T12:30:00.000Z".to_string(),
            }
        );
    }
}
