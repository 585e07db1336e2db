//! REST API for the browser client.
//!
//! Every `/api/task` route requires `Authorization: Bearer <token>`; the
//! token is resolved to an owner id before any engine call.

mod handlers;
mod router;

pub use handlers::CurrentOwner;
pub use router::{AppState, build_router, run_server, start_server};
