use axum::{middleware, routing::any, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::{handlers, middleware as mw, TTS_PATH};
use crate::gate::AccessGate;
use crate::relay::TtsRelay;

pub struct AppState {
    pub gate: AccessGate,
    pub relay: TtsRelay,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route(TTS_PATH, any(handlers::tts))
        .fallback(handlers::not_found);

    with_layers(routes, state)
}

/// Outermost first; the gate wraps the fallback too, so it runs before dispatch.
fn with_layers(routes: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    let layers = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(mw::log_request))
        .layer(middleware::from_fn_with_state(state.clone(), mw::access_gate))
        .layer(CatchPanicLayer::custom(mw::panic_response));

    routes.layer(layers).with_state(state)
}
