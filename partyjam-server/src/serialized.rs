//! All wire types exposed from endpoints are defined here
//! along with the conversions from the core types

use partyjam_core::{
    MemberData, MemberRole as CoreMemberRole, PartyData, PartySnapshot, PartyStatus as CorePartyStatus,
    RemovalReason as CoreRemovalReason, Song as CoreSong, SongSource as CoreSongSource,
    SongStatus as CoreSongStatus, SuggestionData, VoteContext as CoreVoteContext,
    VoteKind as CoreVoteKind, VoteResult,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyStatus {
    Created,
    Live,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Host,
    Guest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SongSource {
    CatalogRec,
    GuestSuggestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SongStatus {
    Queued,
    Testing,
    Promoted,
    Removed,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteKind {
    Up,
    Down,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteContext {
    Queue,
    Testing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemovalReason {
    DownvoteThreshold,
    HostRemove,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub party_id: String,
    pub host_id: String,
    pub status: PartyStatus,
    pub mood: String,
    pub kid_friendly: bool,
    pub allow_suggestions: bool,
    pub created_at: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartyMember {
    pub user_id: String,
    pub role: MemberRole,
    pub joined_at: u64,
    pub last_active_at: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub album_art_url: String,
    pub explicit: bool,
    pub source: SongSource,
    pub status: SongStatus,
    pub upvotes: usize,
    pub downvotes: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartyState {
    pub party: Party,
    pub active_members_count: usize,
    pub members: Vec<PartyMember>,
    pub now_playing: Option<Song>,
    pub queue: Vec<Song>,
    pub testing_suggestions: Vec<Song>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedParty {
    pub party_id: String,
    pub join_code: String,
    pub party: Party,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedParty {
    pub party_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinedParty {
    pub party_id: String,
    pub member: PartyMember,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Heartbeat {
    pub active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub track_id: String,
    pub upvotes: usize,
    pub downvotes: usize,
    pub status: SongStatus,
    pub context: VoteContext,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedTrack {
    pub suggestion: Song,
    pub sample_user_ids: Vec<String>,
    pub expires_at: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeededQueue {
    pub added_count: usize,
    pub queue: Vec<Song>,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl<I, O> ToSerialized<Option<O>> for Option<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Option<O> {
        self.as_ref().map(|x| x.to_serialized())
    }
}

impl ToSerialized<PartyStatus> for CorePartyStatus {
    fn to_serialized(&self) -> PartyStatus {
        match self {
            CorePartyStatus::Created => PartyStatus::Created,
            CorePartyStatus::Live => PartyStatus::Live,
            CorePartyStatus::Ended => PartyStatus::Ended,
        }
    }
}

impl ToSerialized<MemberRole> for CoreMemberRole {
    fn to_serialized(&self) -> MemberRole {
        match self {
            CoreMemberRole::Host => MemberRole::Host,
            CoreMemberRole::Guest => MemberRole::Guest,
        }
    }
}

impl ToSerialized<SongSource> for CoreSongSource {
    fn to_serialized(&self) -> SongSource {
        match self {
            CoreSongSource::CatalogRec => SongSource::CatalogRec,
            CoreSongSource::GuestSuggestion => SongSource::GuestSuggestion,
        }
    }
}

impl ToSerialized<SongStatus> for CoreSongStatus {
    fn to_serialized(&self) -> SongStatus {
        match self {
            CoreSongStatus::Queued => SongStatus::Queued,
            CoreSongStatus::Testing => SongStatus::Testing,
            CoreSongStatus::Promoted => SongStatus::Promoted,
            CoreSongStatus::Removed => SongStatus::Removed,
            CoreSongStatus::Expired => SongStatus::Expired,
        }
    }
}

impl ToSerialized<VoteContext> for CoreVoteContext {
    fn to_serialized(&self) -> VoteContext {
        match self {
            CoreVoteContext::Queue => VoteContext::Queue,
            CoreVoteContext::Testing => VoteContext::Testing,
        }
    }
}

impl ToSerialized<RemovalReason> for CoreRemovalReason {
    fn to_serialized(&self) -> RemovalReason {
        match self {
            CoreRemovalReason::DownvoteThreshold => RemovalReason::DownvoteThreshold,
            CoreRemovalReason::HostRemove => RemovalReason::HostRemove,
        }
    }
}

impl ToSerialized<Party> for PartyData {
    fn to_serialized(&self) -> Party {
        Party {
            party_id: self.id.clone(),
            host_id: self.host_id.clone(),
            status: self.status.to_serialized(),
            mood: self.mood.clone(),
            kid_friendly: self.kid_friendly,
            allow_suggestions: self.allow_suggestions,
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<PartyMember> for MemberData {
    fn to_serialized(&self) -> PartyMember {
        PartyMember {
            user_id: self.user_id.clone(),
            role: self.role.to_serialized(),
            joined_at: self.joined_at,
            last_active_at: self.last_active_at,
        }
    }
}

impl ToSerialized<Song> for CoreSong {
    fn to_serialized(&self) -> Song {
        Song {
            track_id: self.track_id.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            album_art_url: self.album_art_url.clone(),
            explicit: self.explicit,
            source: self.source.to_serialized(),
            status: self.status.to_serialized(),
            upvotes: self.upvotes,
            downvotes: self.downvotes,
        }
    }
}

impl ToSerialized<PartyState> for PartySnapshot {
    fn to_serialized(&self) -> PartyState {
        PartyState {
            party: self.party.to_serialized(),
            active_members_count: self.active_members_count,
            members: self.members.to_serialized(),
            now_playing: self.now_playing.to_serialized(),
            queue: self.queue.to_serialized(),
            testing_suggestions: self.testing_suggestions.to_serialized(),
        }
    }
}

impl ToSerialized<VoteOutcome> for VoteResult {
    fn to_serialized(&self) -> VoteOutcome {
        VoteOutcome {
            track_id: self.track_id.clone(),
            upvotes: self.upvotes,
            downvotes: self.downvotes,
            status: self.status.to_serialized(),
            context: self.context.to_serialized(),
        }
    }
}

impl From<VoteKind> for CoreVoteKind {
    fn from(value: VoteKind) -> Self {
        match value {
            VoteKind::Up => CoreVoteKind::Up,
            VoteKind::Down => CoreVoteKind::Down,
            VoteKind::None => CoreVoteKind::None,
        }
    }
}

impl From<VoteContext> for CoreVoteContext {
    fn from(value: VoteContext) -> Self {
        match value {
            VoteContext::Queue => CoreVoteContext::Queue,
            VoteContext::Testing => CoreVoteContext::Testing,
        }
    }
}

impl SuggestedTrack {
    /// Builds the response for a fresh suggestion, with the deadline the
    /// sampled members were told about
    pub fn from_suggestion(suggestion: &SuggestionData, expire_after_ms: u64) -> Self {
        Self {
            suggestion: suggestion.song.to_serialized(),
            sample_user_ids: suggestion.sample_user_ids.clone(),
            expires_at: suggestion.created_at + expire_after_ms,
        }
    }
}
