/// Database primary key (PostgreSQL `BIGSERIAL`).
pub type DbId = i64;

/// UTC timestamp, as stored by the persistence layer.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
