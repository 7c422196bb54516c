//! Route table.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::ApiState;

/// Build the API router.
///
/// The named VM sub-routes (`resize`, `scale`, `attach-disk`) take priority
/// over the `:action` catch-all.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(handlers::hello))
        .route("/metrics", get(handlers::metrics))
        .route("/teams", post(handlers::register_team))
        .route("/teams/:team", get(handlers::get_team))
        .route("/teams/:team/vm", post(handlers::create_vm))
        .route("/teams/:team/vm/:vm", delete(handlers::delete_vm))
        .route("/teams/:team/vm/:vm/resize", put(handlers::resize_vm))
        .route("/teams/:team/vm/:vm/scale", put(handlers::scale_vm))
        .route("/teams/:team/vm/:vm/attach-disk", post(handlers::attach_disk))
        .route("/teams/:team/vm/:vm/:action", put(handlers::vm_action))
        .route("/teams/:team/block", post(handlers::create_block_volume))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
