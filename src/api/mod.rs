//! HTTP translation layer: dispatcher, result shaping, error
//! normalization.

mod errors;
mod response;
mod server;

pub use errors::{ApiError, ApiResult};
pub use response::drop_empty_rows;
pub use server::ApiServer;
