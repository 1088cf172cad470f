/// The type used to identify parties.
pub type PartyId = String;
/// An opaque, client-supplied user identifier.
pub type UserId = String;
/// The type used to identify tracks across the queue and the suggestion table.
pub type TrackId = String;

/// The lifecycle state of a party. Linear, ended is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyStatus {
    Created,
    Live,
    Ended,
}

/// The role of a party member. Assigned once, never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Host,
    Guest,
}

/// Where a song came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SongSource {
    CatalogRec,
    GuestSuggestion,
}

/// The state of a song. Queued and testing are transient, the rest are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SongStatus {
    Queued,
    Testing,
    Promoted,
    Removed,
    Expired,
}

impl SongStatus {
    /// Terminal states never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Promoted | Self::Removed | Self::Expired)
    }
}

/// What a member wants for a track. A `None` vote clears their slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    Up,
    Down,
    None,
}

/// Whether a vote targets the queue or a suggestion under test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteContext {
    Queue,
    Testing,
}

/// A party and its host-controlled settings
#[derive(Debug, Clone)]
pub struct PartyData {
    pub id: PartyId,
    pub host_id: UserId,
    pub status: PartyStatus,
    pub mood: String,
    pub kid_friendly: bool,
    pub allow_suggestions: bool,
    pub created_at: u64,
}

/// A member of a party
#[derive(Debug, Clone)]
pub struct MemberData {
    pub user_id: UserId,
    pub role: MemberRole,
    pub joined_at: u64,
    /// Refreshed by any action the member takes
    pub last_active_at: u64,
}

/// A track in the queue or under test
#[derive(Debug, Clone)]
pub struct Song {
    pub track_id: TrackId,
    pub title: String,
    pub artist: String,
    pub album_art_url: String,
    pub explicit: bool,
    pub source: SongSource,
    pub status: SongStatus,
    /// Derived from the vote table on every write, never incremented in place
    pub upvotes: usize,
    pub downvotes: usize,
}

/// A member's live vote on a track.
/// One slot per user and track, a new vote replaces the old one.
#[derive(Debug, Clone)]
pub struct VoteData {
    pub user_id: UserId,
    pub track_id: TrackId,
    pub kind: VoteKind,
    pub context: VoteContext,
    pub timestamp: u64,
}

/// A guest-suggested track undergoing sampled testing
#[derive(Debug, Clone)]
pub struct SuggestionData {
    pub track_id: TrackId,
    pub song: Song,
    /// The members allowed to see and vote on the test
    pub sample_user_ids: Vec<UserId>,
    pub created_at: u64,
    pub expanded_at: Option<u64>,
}

/// The fields needed to create a party
#[derive(Debug, Clone)]
pub struct NewParty {
    pub host_id: UserId,
    pub mood: Option<String>,
    pub kid_friendly: Option<bool>,
    pub allow_suggestions: Option<bool>,
}

/// Client-supplied track metadata, so the engine never has to look anything up
#[derive(Debug, Clone)]
pub struct TrackMetadata {
    pub track_id: TrackId,
    pub title: String,
    pub artist: String,
    pub album_art_url: String,
    pub explicit: bool,
}

impl TrackMetadata {
    /// Turns the metadata into a fresh song with no votes
    pub fn into_song(self, source: SongSource, status: SongStatus) -> Song {
        Song {
            track_id: self.track_id,
            title: self.title,
            artist: self.artist,
            album_art_url: self.album_art_url,
            explicit: self.explicit,
            source,
            status,
            upvotes: 0,
            downvotes: 0,
        }
    }

    #[cfg(test)]
    pub fn mock(track_id: &str) -> Self {
        Self {
            track_id: track_id.to_string(),
            title: format!("{} title", track_id),
            artist: "mock artist".to_string(),
            album_art_url: String::new(),
            explicit: false,
        }
    }

    #[cfg(test)]
    pub fn mock_explicit(track_id: &str) -> Self {
        Self {
            explicit: true,
            ..Self::mock(track_id)
        }
    }
}

/// A host-changeable party setting
#[derive(Debug, Clone)]
pub enum PartySetting {
    Mood(String),
    KidFriendly(bool),
    AllowSuggestions(bool),
}

/// An immutable view of a party, returned to clients on state fetch
#[derive(Debug, Clone)]
pub struct PartySnapshot {
    pub party: PartyData,
    pub active_members_count: usize,
    pub members: Vec<MemberData>,
    pub now_playing: Option<Song>,
    pub queue: Vec<Song>,
    pub testing_suggestions: Vec<Song>,
}

/// The outcome of a recorded vote
#[derive(Debug, Clone)]
pub struct VoteResult {
    pub track_id: TrackId,
    pub upvotes: usize,
    pub downvotes: usize,
    pub status: SongStatus,
    pub context: VoteContext,
}
