mod context;
mod docs;
mod errors;
mod parties;
mod schemas;
mod serialized;
mod sse;

pub mod logging;

use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
    thread,
};

use axum::{routing::get, Json, Router as AxumRouter};
use log::info;
use partyjam_core::PartyJam;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use context::ServerContext;
use sse::ServerSentEvents;

pub use errors::*;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 3001;

pub type Router = AxumRouter<ServerContext>;

/// Starts the partyjam server
pub async fn run_server(partyjam: PartyJam) {
    let port = env::var("PARTYJAM_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let partyjam = Arc::new(partyjam);
    let sse = ServerSentEvents::new();

    spawn_event_forwarder(partyjam.clone(), sse.clone());

    let context = ServerContext { partyjam, sse };

    let version_one_router = Router::new().nest("/parties", parties::router());

    let root_router = Router::new()
        .nest("/v1", version_one_router)
        .route("/api.json", get(docs::docs))
        .route("/health", get(health))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    info!("Listening on port {}", port);

    axum::serve(listener, root_router.into_make_service())
        .await
        .expect("server runs until shutdown");
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

/// Drains engine events off the sync channel and fans them out to the
/// connected event streams
fn spawn_event_forwarder(partyjam: Arc<PartyJam>, sse: Arc<ServerSentEvents>) {
    thread::spawn(move || loop {
        let event = partyjam.wait_for_event();
        sse.handle(event);
    });
}
