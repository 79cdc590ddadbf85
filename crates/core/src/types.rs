/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Currency amounts (rupees, two decimal places on display).
pub type Money = rust_decimal::Decimal;
