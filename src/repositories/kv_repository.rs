use diesel::prelude::*;

use crate::{
    error::PersistenceError,
    landing::collaborators::LocalStore,
    models::waitlist_models::{KvEntry, LocalWaitlistRecord, NewKvEntry},
    schema::kv_store,
    DbPool,
};

/// Durable key-value store backed by the `kv_store` table. Values are opaque
/// strings; the waitlist fallback keeps a JSON array under a single key.
pub struct KvRepository {
    pool: DbPool,
}

impl KvRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(
        &self,
    ) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>, PersistenceError>
    {
        self.pool.get().map_err(|e| PersistenceError::Pool(e.to_string()))
    }

    pub fn get(&self, key: &str) -> Result<Option<KvEntry>, PersistenceError> {
        let mut conn = self.conn()?;
        let entry = kv_store::table
            .find(key)
            .select(KvEntry::as_select())
            .first::<KvEntry>(&mut conn)
            .optional()?;
        Ok(entry)
    }

    pub fn put(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut conn = self.conn()?;
        upsert(&mut conn, key, value, chrono::Utc::now().timestamp())?;
        Ok(())
    }
}

fn upsert(conn: &mut SqliteConnection, key: &str, value: &str, now: i64) -> Result<(), PersistenceError> {
    diesel::insert_into(kv_store::table)
        .values(&NewKvEntry { key, value, updated_at: now })
        .on_conflict(kv_store::key)
        .do_update()
        .set((kv_store::value.eq(value), kv_store::updated_at.eq(now)))
        .execute(conn)?;
    Ok(())
}

fn decode_records(raw: Option<String>) -> Result<Vec<LocalWaitlistRecord>, PersistenceError> {
    match raw {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

impl LocalStore for KvRepository {
    fn prepend_waitlist_record(&self, key: &str, record: &LocalWaitlistRecord) -> Result<(), PersistenceError> {
        let mut conn = self.conn()?;
        // read-modify-write must not interleave with another writer
        conn.immediate_transaction::<_, PersistenceError, _>(|conn| {
            let existing = kv_store::table
                .find(key)
                .select(kv_store::value)
                .first::<String>(conn)
                .optional()?;
            let mut records = decode_records(existing)?;
            records.insert(0, record.clone());
            let encoded = serde_json::to_string(&records)?;
            upsert(conn, key, &encoded, chrono::Utc::now().timestamp())
        })
    }

    fn waitlist_records(&self, key: &str) -> Result<Vec<LocalWaitlistRecord>, PersistenceError> {
        decode_records(self.get(key)?.map(|entry| entry.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{build_pool, run_migrations};

    fn repository() -> KvRepository {
        let pool = build_pool(":memory:").unwrap();
        run_migrations(&pool).unwrap();
        KvRepository::new(pool)
    }

    fn record(email: &str, ts: &str) -> LocalWaitlistRecord {
        LocalWaitlistRecord { email: email.to_string(), ts: ts.to_string() }
    }

    #[test]
    fn missing_key_reads_as_empty_list() {
        let repo = repository();
        assert!(repo.get("lernis_waitlist").unwrap().is_none());
        assert!(repo.waitlist_records("lernis_waitlist").unwrap().is_empty());
    }

    #[test]
    fn prepend_keeps_newest_first() {
        let repo = repository();
        repo.prepend_waitlist_record("lernis_waitlist", &record("a@example.com", "2026-01-01T00:00:00.000Z"))
            .unwrap();
        repo.prepend_waitlist_record("lernis_waitlist", &record("b@example.com", "2026-01-02T00:00:00.000Z"))
            .unwrap();

        let records = repo.waitlist_records("lernis_waitlist").unwrap();
        assert_eq!(
            records,
            vec![
                record("b@example.com", "2026-01-02T00:00:00.000Z"),
                record("a@example.com", "2026-01-01T00:00:00.000Z"),
            ]
        );
    }

    #[test]
    fn stored_value_is_a_json_array_of_email_and_ts() {
        let repo = repository();
        repo.prepend_waitlist_record("lernis_waitlist", &record("a@example.com", "t1")).unwrap();

        let raw = repo.get("lernis_waitlist").unwrap().unwrap().value;
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, serde_json::json!([{"email": "a@example.com", "ts": "t1"}]));
    }

    #[test]
    fn malformed_value_propagates() {
        let repo = repository();
        repo.put("lernis_waitlist", "not json").unwrap();

        let err = repo
            .prepend_waitlist_record("lernis_waitlist", &record("a@example.com", "t1"))
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Malformed(_)));
    }

    #[test]
    fn timestamps_past_2038_are_kept_intact() {
        let repo = repository();
        let year_2100 = 4_102_444_800_i64;
        upsert(&mut repo.conn().unwrap(), "k", "v", year_2100).unwrap();

        assert_eq!(repo.get("k").unwrap().unwrap().updated_at, year_2100);
    }

    #[test]
    fn put_overwrites_existing_value() {
        let repo = repository();
        repo.put("k", "one").unwrap();
        repo.put("k", "two").unwrap();
        assert_eq!(repo.get("k").unwrap().unwrap().value, "two");
    }
}
