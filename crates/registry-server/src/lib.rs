//! Wires `registry-conf`, `registry-db`, `registry-storage`, and
//! `registry-migrate` into a running HTTP server: the process-wide
//! [`registry_http::AppState`] and the `hyper` accept loop that serves it.

pub mod bootstrap;
pub mod health;
pub mod serve;

pub use bootstrap::build_app_state;
pub use health::DatabaseHealth;
pub use serve::serve;
