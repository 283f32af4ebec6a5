/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Language identifiers in the external shop catalog.
pub type LangId = i64;

/// Product identifiers in the external shop catalog.
pub type ProductId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
