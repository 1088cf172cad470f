use crossbeam::channel::{Receiver, Sender};

use crate::{MemberData, PartyId, Song, SongStatus, TrackId, UserId, VoteContext};

pub type EventSender = Sender<PartyEvent>;
pub type EventReceiver = Receiver<PartyEvent>;

/// Why a song left the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// Downvotes from the crowd crossed the removal threshold
    DownvoteThreshold,
    /// The host pulled the track directly
    HostRemove,
}

/// Events emitted by the party engine
#[derive(Debug, Clone)]
pub enum PartyEvent {
    /// A user became a member of a party
    MemberJoined {
        party_id: PartyId,
        member: MemberData,
        active_members_count: usize,
    },
    /// The active member count of a party changed
    PresenceChanged {
        party_id: PartyId,
        active_members_count: usize,
    },
    /// A vote was recorded and the track's counts were retallied
    VoteUpdate {
        party_id: PartyId,
        track_id: TrackId,
        upvotes: usize,
        downvotes: usize,
        status: SongStatus,
        context: VoteContext,
    },
    /// The queue was modified and this is its new content
    QueueUpdated {
        party_id: PartyId,
        queue: Vec<Song>,
    },
    /// A song left the queue
    SongRemoved {
        party_id: PartyId,
        track_id: TrackId,
        reason: RemovalReason,
    },
    /// A suggestion entered testing, or its sample was expanded.
    /// Only the sampled members are meant to see this.
    SuggestionTesting {
        party_id: PartyId,
        track_id: TrackId,
        song: Song,
        sample_user_ids: Vec<UserId>,
        expires_at: u64,
    },
    /// A tested suggestion crossed the promotion threshold and joined the queue
    SuggestionPromoted {
        party_id: PartyId,
        track_id: TrackId,
    },
    /// A suggestion timed out before crossing any threshold
    SuggestionExpired {
        party_id: PartyId,
        track_id: TrackId,
    },
    /// The host put a track on the speakers
    NowPlaying {
        party_id: PartyId,
        track_id: TrackId,
        started_at: u64,
    },
    /// The host changed a party setting
    SettingsUpdated {
        party_id: PartyId,
        mood: String,
        kid_friendly: bool,
        allow_suggestions: bool,
    },
}
