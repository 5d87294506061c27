pub mod gatekeeper;
pub mod response;

pub use gatekeeper::gatekeeper_middleware;
pub use response::{ApiResponse, ApiResult};
