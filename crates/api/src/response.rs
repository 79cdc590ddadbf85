//! JSON envelope for successful responses.
//!
//! Handlers return `Json(DataResponse { data })` so every success body has
//! the same `{ "data": ... }` shape.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
