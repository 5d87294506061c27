// handlers/mod.rs - HTTP handlers
//
// Everything except /health sits behind the gatekeeper middleware:
// the whoami and logout endpoints are served here, every other path is
// forwarded to the application server by the proxy fallback.

pub mod health;
pub mod logout;
pub mod proxy;
pub mod whoami;

pub use health::health;
pub use logout::logout;
pub use proxy::{forward, Upstream};
pub use whoami::whoami;
