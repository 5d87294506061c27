pub mod access;
pub mod pool;
pub mod sessions;

pub use access::PgAccessStore;
pub use pool::{connect, health_check, DatabaseError};
pub use sessions::PgSessionStore;
