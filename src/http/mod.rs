//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper connection, Axum router, layers)
//!     → request.rs (request ID, body limits, buffering)
//!     → dispatcher.rs (docs bypass, route lookup, body parse, render)
//!     → response.rs (JSON envelopes)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod docs;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::{DispatchRequest, DispatchResponse, Dispatcher};
pub use request::X_REQUEST_ID;
pub use response::{ApiResponse, ErrorResponse, JsonBody};
pub use server::{HttpServer, ServerError};
