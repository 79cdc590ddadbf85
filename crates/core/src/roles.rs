//! Well-known role name constants carried in JWT claims.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";
/// Occupancy sensor gateways posting readings.
pub const ROLE_SENSOR: &str = "sensor";
