use axum::{
    extract::{Path, Query, State},
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
};
use futures_util::Stream;
use parking_lot::Mutex;
use partyjam_core::PartyEvent;
use serde::{Deserialize, Serialize};
use std::{
    convert::Infallible,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    task::{Context, Poll, Waker},
};
use utoipa::ToSchema;

use crate::{
    context::ServerContext,
    errors::ServerResult,
    serialized::{PartyMember, RemovalReason, Song, SongStatus, ToSerialized, VoteContext},
};

type ConnectionId = u64;

static CONNECTION_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum ServerEvent {
    /// A user became a member of the party.
    #[serde(rename_all = "camelCase")]
    MemberJoined {
        member: PartyMember,
        active_members_count: usize,
    },
    /// The active member count changed.
    #[serde(rename_all = "camelCase")]
    Presence { active_members_count: usize },
    /// A vote was recorded and the track's counts were retallied.
    #[serde(rename_all = "camelCase")]
    VoteUpdate {
        track_id: String,
        upvotes: usize,
        downvotes: usize,
        status: SongStatus,
        context: VoteContext,
    },
    /// The queue was modified and this is its new content.
    #[serde(rename_all = "camelCase")]
    QueueUpdated { queue: Vec<Song> },
    /// A song left the queue.
    #[serde(rename_all = "camelCase")]
    SongRemoved {
        track_id: String,
        reason: RemovalReason,
    },
    /// A suggestion is under test. Sent only to the sampled members.
    #[serde(rename_all = "camelCase")]
    SuggestionTesting {
        track_id: String,
        status: SongStatus,
        expires_at: u64,
        song: Song,
        sample_user_ids: Vec<String>,
    },
    /// A tested suggestion crossed the promotion threshold.
    #[serde(rename_all = "camelCase")]
    SuggestionPromoted { track_id: String },
    /// A suggestion timed out before crossing any threshold.
    #[serde(rename_all = "camelCase")]
    SuggestionExpired { track_id: String },
    /// The host put a track on the speakers.
    #[serde(rename_all = "camelCase")]
    NowPlaying { track_id: String, started_at: u64 },
    /// The host changed a party setting.
    #[serde(rename_all = "camelCase")]
    SettingsUpdated {
        mood: String,
        kid_friendly: bool,
        allow_suggestions: bool,
    },
}

/// Manages server sent event connections, scoped per party
pub struct ServerSentEvents {
    me: Weak<Self>,
    connections: Mutex<Vec<Connection>>,
}

struct Connection {
    id: ConnectionId,
    party_id: String,
    /// Identifies the listener for sampled-visibility events
    user_id: Option<String>,
    pending_messages: Arc<Mutex<Vec<ServerEvent>>>,
    waker: Arc<Mutex<Option<Waker>>>,
}

pub struct ConnectionHandle {
    id: ConnectionId,
    /// A reference to [Connection]'s pending messages
    pending_messages: Arc<Mutex<Vec<ServerEvent>>>,
    /// A reference to [Connection]'s stored [Waker]
    waker: Arc<Mutex<Option<Waker>>>,
    /// Required to remove the connection when dropped
    manager: Weak<ServerSentEvents>,
}

impl ServerSentEvents {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            connections: Default::default(),
        })
    }

    /// Fans a core event out to the right subscribers of its party
    pub fn handle(&self, event: PartyEvent) {
        match event {
            PartyEvent::MemberJoined {
                party_id,
                member,
                active_members_count,
            } => self.broadcast(
                &party_id,
                ServerEvent::MemberJoined {
                    member: member.to_serialized(),
                    active_members_count,
                },
            ),
            PartyEvent::PresenceChanged {
                party_id,
                active_members_count,
            } => self.broadcast(
                &party_id,
                ServerEvent::Presence {
                    active_members_count,
                },
            ),
            PartyEvent::VoteUpdate {
                party_id,
                track_id,
                upvotes,
                downvotes,
                status,
                context,
            } => self.broadcast(
                &party_id,
                ServerEvent::VoteUpdate {
                    track_id,
                    upvotes,
                    downvotes,
                    status: status.to_serialized(),
                    context: context.to_serialized(),
                },
            ),
            PartyEvent::QueueUpdated { party_id, queue } => self.broadcast(
                &party_id,
                ServerEvent::QueueUpdated {
                    queue: queue.to_serialized(),
                },
            ),
            PartyEvent::SongRemoved {
                party_id,
                track_id,
                reason,
            } => self.broadcast(
                &party_id,
                ServerEvent::SongRemoved {
                    track_id,
                    reason: reason.to_serialized(),
                },
            ),
            PartyEvent::SuggestionTesting {
                party_id,
                track_id,
                song,
                sample_user_ids,
                expires_at,
            } => {
                let event = ServerEvent::SuggestionTesting {
                    track_id,
                    status: song.status.to_serialized(),
                    expires_at,
                    song: song.to_serialized(),
                    sample_user_ids: sample_user_ids.clone(),
                };

                self.send_to_users(&party_id, &sample_user_ids, event)
            }
            PartyEvent::SuggestionPromoted { party_id, track_id } => {
                self.broadcast(&party_id, ServerEvent::SuggestionPromoted { track_id })
            }
            PartyEvent::SuggestionExpired { party_id, track_id } => {
                self.broadcast(&party_id, ServerEvent::SuggestionExpired { track_id })
            }
            PartyEvent::NowPlaying {
                party_id,
                track_id,
                started_at,
            } => self.broadcast(
                &party_id,
                ServerEvent::NowPlaying {
                    track_id,
                    started_at,
                },
            ),
            PartyEvent::SettingsUpdated {
                party_id,
                mood,
                kid_friendly,
                allow_suggestions,
            } => self.broadcast(
                &party_id,
                ServerEvent::SettingsUpdated {
                    mood,
                    kid_friendly,
                    allow_suggestions,
                },
            ),
        }
    }

    /// Sends an event to every subscriber of a party
    fn broadcast(&self, party_id: &str, event: ServerEvent) {
        let connections = self.connections.lock();

        for connection in connections.iter().filter(|c| c.party_id == party_id) {
            connection.send(event.clone())
        }
    }

    /// Sends an event only to the named users within a party
    fn send_to_users(&self, party_id: &str, user_ids: &[String], event: ServerEvent) {
        let connections = self.connections.lock();

        let targeted = connections.iter().filter(|c| {
            c.party_id == party_id
                && c.user_id
                    .as_ref()
                    .is_some_and(|id| user_ids.contains(id))
        });

        for connection in targeted {
            connection.send(event.clone())
        }
    }

    fn connect(&self, party_id: String, user_id: Option<String>) -> ConnectionHandle {
        let connection = Connection::new(party_id, user_id);
        let handle = connection.handle(self.me.clone());

        self.connections.lock().push(connection);
        handle
    }

    fn disconnect(&self, id: ConnectionId) {
        self.connections.lock().retain(|c| c.id != id)
    }
}

impl Connection {
    fn new(party_id: String, user_id: Option<String>) -> Self {
        Self {
            id: CONNECTION_COUNTER.fetch_add(1, Ordering::SeqCst),
            party_id,
            user_id,
            pending_messages: Default::default(),
            waker: Default::default(),
        }
    }

    fn send(&self, message: ServerEvent) {
        self.pending_messages.lock().push(message);

        if let Some(waker) = self.waker.lock().take() {
            waker.wake()
        }
    }

    fn handle(&self, manager: Weak<ServerSentEvents>) -> ConnectionHandle {
        ConnectionHandle {
            id: self.id,
            pending_messages: self.pending_messages.clone(),
            waker: self.waker.clone(),
            manager,
        }
    }
}

impl Stream for ConnectionHandle {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut pending_messages = self.pending_messages.lock();

        let next_event = pending_messages
            .pop()
            .map(|m| serde_json::to_string(&m).expect("serializes properly"));

        if let Some(event) = next_event {
            return Poll::Ready(Some(Ok(Event::default().data(event))));
        }

        *self.waker.lock() = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.disconnect(self.id)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStreamQuery {
    pub user_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/v1/parties/{id}/events",
    tag = "events",
    responses(
        (
            status = 200,
            content_type = "text/event-stream",
            description = "A stream of events scoped to one party",
            body = ServerEvent
        )
    )
)]
pub async fn event_stream(
    State(context): State<ServerContext>,
    Path(party_id): Path<String>,
    Query(query): Query<EventStreamQuery>,
) -> ServerResult<Sse<ConnectionHandle>> {
    // Refuse streams for parties that do not exist
    let session = context.partyjam.parties.party_by_id(&party_id)?;

    let handle = context.sse.connect(session.id(), query.user_id);

    Ok(Sse::new(handle).keep_alive(KeepAlive::default()))
}
