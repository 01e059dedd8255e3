//! The transport-agnostic HTTP surface for the `/gitlab/v1` control plane:
//! a buffered [`Request`]/[`Response`] pair, a small hand-rolled router, and
//! the handlers themselves. `registry-server` is the only crate that speaks
//! `hyper` directly; it translates to and from these types at the edge.

pub mod error;
pub mod handlers;
pub mod pagination;
pub mod request;
pub mod response;
pub mod router;
pub mod state;

pub use error::HttpError;
pub use request::Request;
pub use response::Response;
pub use router::dispatch;
pub use state::{AppState, HealthCheck};
