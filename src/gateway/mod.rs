//! HTTP boundary: the `/proxy` endpoint, page assets and response headers

mod assets;
pub mod boundary;
mod router;
mod server;

pub use assets::{csrf_cookie, csrf_token};
pub use boundary::{check_boundary, same_origin_json};
pub use router::{AppState, CONTENT_SECURITY_POLICY, create_router};
pub use server::Server;
