use std::sync::Arc;

use axum::extract::FromRef;
use partyjam_core::PartyJam;

use crate::sse::ServerSentEvents;

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub partyjam: Arc<PartyJam>,
    pub sse: Arc<ServerSentEvents>,
}
