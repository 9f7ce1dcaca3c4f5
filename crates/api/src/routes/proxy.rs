//! Route definitions for the asset proxy.
//!
//! Mounted at the root, outside `/api/v1`, because browser asset loaders
//! call it directly.
//!
//! ```text
//! GET     /proxy?url=<upstream>    proxy_asset
//! OPTIONS /proxy                   proxy_preflight
//! ```

use axum::routing::get;
use axum::Router;

use crate::handlers::proxy;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/proxy",
        get(proxy::proxy_asset).options(proxy::proxy_preflight),
    )
}
