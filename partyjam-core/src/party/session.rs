use log::info;
use parking_lot::Mutex;

use crate::{PartyContext, PartyEvent, RemovalReason};

use super::{
    MemberData, MemberRole, PartyData, PartyError, PartySetting, PartySnapshot, PartyStatus, Song,
    SongSource, SongStatus, SuggestionData, TrackMetadata, UserId, VoteData,
};

/// A party session, owning the members, queue, votes, and suggestions of one
/// party. Every operation runs to completion under a single lock, including
/// its event emission, so mutations on the same party never interleave.
pub struct Session {
    pub(super) context: PartyContext,
    join_code: String,
    pub(super) state: Mutex<SessionState>,
}

/// All mutable state of a party
pub(super) struct SessionState {
    pub party: PartyData,
    pub members: Vec<MemberData>,
    pub queue: Vec<Song>,
    pub now_playing: Option<Song>,
    pub votes: Vec<VoteData>,
    pub suggestions: Vec<SuggestionData>,
}

impl Session {
    pub(super) fn new(context: &PartyContext, party: PartyData, join_code: String) -> Self {
        Self {
            context: context.clone(),
            join_code,
            state: Mutex::new(SessionState {
                party,
                members: Vec::new(),
                queue: Vec::new(),
                now_playing: None,
                votes: Vec::new(),
                suggestions: Vec::new(),
            }),
        }
    }

    pub fn id(&self) -> String {
        self.state.lock().party.id.clone()
    }

    pub fn data(&self) -> PartyData {
        self.state.lock().party.clone()
    }

    pub fn join_code(&self) -> &str {
        &self.join_code
    }

    /// Registers the host as the first member. Called once, at creation.
    pub(super) fn register_host(&self) {
        let now = self.context.now_ms();
        let mut state = self.state.lock();

        let host_id = state.party.host_id.clone();
        state.members.push(MemberData {
            user_id: host_id,
            role: MemberRole::Host,
            joined_at: now,
            last_active_at: now,
        });
    }

    /// Adds the user as a guest, or refreshes their activity if they rejoined
    pub fn join(&self, user_id: &str) -> Result<MemberData, PartyError> {
        if user_id.is_empty() {
            return Err(PartyError::InvalidRequest("userId"));
        }

        let now = self.context.now_ms();
        let mut state = self.state.lock();
        let party_id = state.party.id.clone();

        if state.touch(user_id, now) {
            let member = state
                .member(user_id)
                .cloned()
                .expect("member exists after touch");

            self.context.emit(PartyEvent::PresenceChanged {
                party_id,
                active_members_count: self.active_count(&state, now),
            });

            return Ok(member);
        }

        let member = MemberData {
            user_id: user_id.to_string(),
            role: MemberRole::Guest,
            joined_at: now,
            last_active_at: now,
        };
        state.members.push(member.clone());

        info!("User {} joined party {}", user_id, party_id);

        self.context.emit(PartyEvent::MemberJoined {
            party_id,
            member: member.clone(),
            active_members_count: self.active_count(&state, now),
        });

        Ok(member)
    }

    /// Refreshes the member's activity window
    pub fn heartbeat(&self, user_id: &str) -> Result<bool, PartyError> {
        let now = self.context.now_ms();
        let mut state = self.state.lock();

        if !state.touch(user_id, now) {
            return Err(PartyError::MemberNotFound);
        }

        self.context.emit(PartyEvent::PresenceChanged {
            party_id: state.party.id.clone(),
            active_members_count: self.active_count(&state, now),
        });

        Ok(true)
    }

    /// Returns the client view of this party.
    /// Counts as activity for the requesting user, when one is given.
    pub fn snapshot(&self, user_id: Option<&str>) -> PartySnapshot {
        let now = self.context.now_ms();
        let mut state = self.state.lock();

        if let Some(user_id) = user_id {
            state.touch(user_id, now);
        }

        PartySnapshot {
            party: state.party.clone(),
            active_members_count: self.active_count(&state, now),
            members: state.members.clone(),
            now_playing: state.now_playing.clone(),
            queue: state.queue.clone(),
            testing_suggestions: state
                .suggestions
                .iter()
                .filter(|s| s.song.status == SongStatus::Testing)
                .map(|s| s.song.clone())
                .collect(),
        }
    }

    /// Returns the suggestion record for a track, if one exists
    pub fn suggestion(&self, track_id: &str) -> Option<SuggestionData> {
        self.state
            .lock()
            .suggestions
            .iter()
            .find(|s| s.track_id == track_id)
            .cloned()
    }

    /// Takes the party live. Valid once, from the created state.
    pub fn start(&self, host_id: &str) -> Result<PartyStatus, PartyError> {
        let mut state = self.state.lock();
        state.require_host(host_id)?;

        if state.party.status != PartyStatus::Created {
            return Err(PartyError::InvalidState(state.party.status));
        }

        state.party.status = PartyStatus::Live;
        info!("Party {} is live", state.party.id);

        Ok(PartyStatus::Live)
    }

    /// Ends the party. Terminal, allowed from any non-ended state.
    pub fn end(&self, host_id: &str) -> Result<PartyStatus, PartyError> {
        let mut state = self.state.lock();
        state.require_host(host_id)?;

        if state.party.status == PartyStatus::Ended {
            return Err(PartyError::InvalidState(PartyStatus::Ended));
        }

        state.party.status = PartyStatus::Ended;
        info!("Party {} ended", state.party.id);

        Ok(PartyStatus::Ended)
    }

    /// Applies a host setting change. Takes effect for subsequent checks,
    /// not retroactively for suggestions already under test.
    pub fn update_setting(
        &self,
        host_id: &str,
        setting: PartySetting,
    ) -> Result<PartyData, PartyError> {
        let mut state = self.state.lock();
        state.require_host(host_id)?;

        match setting {
            PartySetting::Mood(mood) => state.party.mood = mood,
            PartySetting::KidFriendly(value) => state.party.kid_friendly = value,
            PartySetting::AllowSuggestions(value) => state.party.allow_suggestions = value,
        }

        let party = state.party.clone();

        self.context.emit(PartyEvent::SettingsUpdated {
            party_id: party.id.clone(),
            mood: party.mood.clone(),
            kid_friendly: party.kid_friendly,
            allow_suggestions: party.allow_suggestions,
        });

        Ok(party)
    }

    /// Adds host-picked tracks to the queue. Explicit tracks are silently
    /// skipped in a kid friendly party, as are tracks already present.
    pub fn seed_queue(
        &self,
        host_id: &str,
        tracks: Vec<TrackMetadata>,
    ) -> Result<Vec<Song>, PartyError> {
        let mut state = self.state.lock();
        state.require_host(host_id)?;

        let mut added = Vec::new();

        for track in tracks {
            if state.party.kid_friendly && track.explicit {
                continue;
            }

            if state.has_track(&track.track_id) {
                continue;
            }

            let song = track.into_song(SongSource::CatalogRec, SongStatus::Queued);
            state.queue.push(song.clone());
            added.push(song);
        }

        if !added.is_empty() {
            info!(
                "Seeded {} tracks into party {}",
                added.len(),
                state.party.id
            );

            self.context.emit(PartyEvent::QueueUpdated {
                party_id: state.party.id.clone(),
                queue: state.queue.clone(),
            });
        }

        Ok(added)
    }

    /// Host-forced removal. Removing a track that is not queued is a no-op.
    pub fn remove_from_queue(&self, host_id: &str, track_id: &str) -> Result<bool, PartyError> {
        let mut state = self.state.lock();
        state.require_host(host_id)?;

        if !state.drop_from_queue(track_id) {
            return Ok(false);
        }

        let party_id = state.party.id.clone();

        self.context.emit(PartyEvent::SongRemoved {
            party_id: party_id.clone(),
            track_id: track_id.to_string(),
            reason: RemovalReason::HostRemove,
        });

        self.context.emit(PartyEvent::QueueUpdated {
            party_id,
            queue: state.queue.clone(),
        });

        Ok(true)
    }

    /// Puts a queued track on the speakers, moving it out of the queue
    pub fn set_now_playing(
        &self,
        host_id: &str,
        track_id: &str,
        started_at: Option<u64>,
    ) -> Result<Song, PartyError> {
        let now = self.context.now_ms();
        let mut state = self.state.lock();
        state.require_host(host_id)?;

        let position = state
            .queue
            .iter()
            .position(|s| s.track_id == track_id)
            .ok_or(PartyError::TrackNotFound)?;

        let song = state.queue.remove(position);
        state.now_playing = Some(song.clone());

        let party_id = state.party.id.clone();

        self.context.emit(PartyEvent::NowPlaying {
            party_id: party_id.clone(),
            track_id: song.track_id.clone(),
            started_at: started_at.unwrap_or(now),
        });

        self.context.emit(PartyEvent::QueueUpdated {
            party_id,
            queue: state.queue.clone(),
        });

        Ok(song)
    }

    /// Counts currently active members. Always computed fresh, since the
    /// window slides with every heartbeat.
    pub(super) fn active_count(&self, state: &SessionState, now: u64) -> usize {
        state
            .members
            .iter()
            .filter(|m| self.context.config.is_active(now, m.last_active_at))
            .count()
    }

    /// The user ids of currently active members
    pub(super) fn active_ids(&self, state: &SessionState, now: u64) -> Vec<UserId> {
        state
            .members
            .iter()
            .filter(|m| self.context.config.is_active(now, m.last_active_at))
            .map(|m| m.user_id.clone())
            .collect()
    }
}

impl SessionState {
    pub fn member(&self, user_id: &str) -> Option<&MemberData> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    /// Refreshes a member's activity. Reports whether the member exists,
    /// so callers can tell "not a member" apart from "updated".
    pub fn touch(&mut self, user_id: &str, now: u64) -> bool {
        match self.members.iter_mut().find(|m| m.user_id == user_id) {
            Some(member) => {
                member.last_active_at = now;
                true
            }
            None => false,
        }
    }

    pub fn require_host(&self, user_id: &str) -> Result<(), PartyError> {
        if self.party.host_id != user_id {
            return Err(PartyError::NotHost);
        }

        Ok(())
    }

    /// Whether a track is anywhere in the queue or the suggestion table
    pub fn has_track(&self, track_id: &str) -> bool {
        self.queue.iter().any(|s| s.track_id == track_id)
            || self.suggestions.iter().any(|s| s.track_id == track_id)
    }

    /// Removes a track from the queue sequence. Reports whether it was there.
    pub fn drop_from_queue(&mut self, track_id: &str) -> bool {
        let before = self.queue.len();
        self.queue.retain(|s| s.track_id != track_id);

        self.queue.len() < before
    }

    /// The current status of a track, wherever it lives
    pub fn song_status(&self, track_id: &str) -> Option<SongStatus> {
        self.queue
            .iter()
            .find(|s| s.track_id == track_id)
            .or_else(|| {
                self.suggestions
                    .iter()
                    .find(|s| s.track_id == track_id)
                    .map(|s| &s.song)
            })
            .map(|s| s.status)
    }

    /// Writes a status onto a track, wherever it lives
    pub fn set_song_status(&mut self, track_id: &str, status: SongStatus) {
        if let Some(song) = self.queue.iter_mut().find(|s| s.track_id == track_id) {
            song.status = status;
        }

        if let Some(suggestion) = self
            .suggestions
            .iter_mut()
            .find(|s| s.track_id == track_id)
        {
            suggestion.song.status = status;
        }
    }

    pub fn suggestion_mut(&mut self, track_id: &str) -> Option<&mut SuggestionData> {
        self.suggestions
            .iter_mut()
            .find(|s| s.track_id == track_id)
    }
}

#[cfg(test)]
pub(super) mod test {
    use std::sync::Arc;

    use crate::{
        Config, ManualTime, MemberRole, NewParty, PartyError, PartyEvent, PartyJam, PartySetting,
        PartyStatus, RemovalReason, Session, SongStatus, TrackMetadata, VoteContext, VoteKind,
    };

    pub fn setup() -> (PartyJam, Arc<ManualTime>) {
        setup_with_config(Config::default())
    }

    pub fn setup_with_config(config: Config) -> (PartyJam, Arc<ManualTime>) {
        let time = ManualTime::new(1_000);
        let jam = PartyJam::with_timing(config, time.clone(), time.clone());

        (jam, time)
    }

    fn new_party(host_id: &str) -> NewParty {
        NewParty {
            host_id: host_id.to_string(),
            mood: None,
            kid_friendly: None,
            allow_suggestions: None,
        }
    }

    /// A live party with the given number of guests, all active
    pub fn live_party(jam: &PartyJam, guests: usize) -> Arc<Session> {
        let session = jam.parties.create_party(new_party("host")).unwrap();

        for i in 1..=guests {
            session.join(&format!("g{}", i)).unwrap();
        }

        session.start("host").unwrap();
        session
    }

    pub fn drain_events(jam: &PartyJam) -> Vec<PartyEvent> {
        let mut events = Vec::new();

        while let Some(event) = jam.poll_event() {
            events.push(event);
        }

        events
    }

    #[test]
    fn members_fall_out_of_the_active_window() {
        let (jam, time) = setup();
        let session = jam.parties.create_party(new_party("host")).unwrap();

        session.join("guest").unwrap();
        assert_eq!(session.snapshot(None).active_members_count, 2);

        // One millisecond inside the window
        time.advance(599_999);
        assert_eq!(session.snapshot(None).active_members_count, 2);

        // One millisecond past it
        time.advance(2);
        assert_eq!(session.snapshot(None).active_members_count, 0);

        session.heartbeat("guest").unwrap();
        assert_eq!(session.snapshot(None).active_members_count, 1);
    }

    #[test]
    fn heartbeat_requires_membership() {
        let (jam, _) = setup();
        let session = jam.parties.create_party(new_party("host")).unwrap();

        assert!(matches!(
            session.heartbeat("stranger"),
            Err(PartyError::MemberNotFound)
        ));
    }

    #[test]
    fn rejoining_keeps_the_original_member() {
        let (jam, time) = setup();
        let session = jam.parties.create_party(new_party("host")).unwrap();

        let first = session.join("guest").unwrap();
        time.advance(5_000);
        let second = session.join("guest").unwrap();

        assert_eq!(first.joined_at, second.joined_at);
        assert_eq!(second.last_active_at, first.last_active_at + 5_000);
        assert_eq!(session.snapshot(None).members.len(), 2);
    }

    #[test]
    fn snapshot_touches_the_requesting_user() {
        let (jam, time) = setup();
        let session = jam.parties.create_party(new_party("host")).unwrap();
        session.join("guest").unwrap();

        time.advance(600_001);
        assert_eq!(session.snapshot(Some("guest")).active_members_count, 1);
    }

    #[test]
    fn the_host_role_is_unique_and_immutable() {
        let (jam, _) = setup();
        let session = jam.parties.create_party(new_party("host")).unwrap();

        session.join("guest").unwrap();
        // A host rejoin does not demote them to guest
        session.join("host").unwrap();

        let members = session.snapshot(None).members;
        let hosts: Vec<_> = members
            .iter()
            .filter(|m| m.role == MemberRole::Host)
            .collect();

        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].user_id, "host");
    }

    #[test]
    fn the_party_lifecycle_is_linear() {
        let (jam, _) = setup();
        let session = jam.parties.create_party(new_party("host")).unwrap();

        assert!(matches!(
            session.start("guest"),
            Err(PartyError::NotHost)
        ));

        assert_eq!(session.start("host").unwrap(), PartyStatus::Live);
        assert!(matches!(
            session.start("host"),
            Err(PartyError::InvalidState(PartyStatus::Live))
        ));

        assert_eq!(session.end("host").unwrap(), PartyStatus::Ended);
        assert!(matches!(
            session.end("host"),
            Err(PartyError::InvalidState(PartyStatus::Ended))
        ));
    }

    #[test]
    fn a_created_party_can_end_without_going_live() {
        let (jam, _) = setup();
        let session = jam.parties.create_party(new_party("host")).unwrap();

        assert_eq!(session.end("host").unwrap(), PartyStatus::Ended);
    }

    #[test]
    fn settings_are_host_only_and_take_effect_immediately() {
        let (jam, _) = setup();
        let session = jam.parties.create_party(new_party("host")).unwrap();

        assert!(matches!(
            session.update_setting("guest", PartySetting::Mood("hype".to_string())),
            Err(PartyError::NotHost)
        ));

        let party = session
            .update_setting("host", PartySetting::KidFriendly(true))
            .unwrap();
        assert!(party.kid_friendly);

        drain_events(&jam);
        session
            .update_setting("host", PartySetting::Mood("hype".to_string()))
            .unwrap();

        let events = drain_events(&jam);
        assert!(events.iter().any(|e| matches!(
            e,
            PartyEvent::SettingsUpdated { mood, kid_friendly: true, .. } if mood == "hype"
        )));
    }

    #[test]
    fn seeding_filters_explicit_tracks_in_kid_friendly_parties() {
        let (jam, _) = setup();
        let session = jam.parties.create_party(new_party("host")).unwrap();
        session
            .update_setting("host", PartySetting::KidFriendly(true))
            .unwrap();

        let added = session
            .seed_queue(
                "host",
                vec![
                    TrackMetadata::mock("t1"),
                    TrackMetadata::mock_explicit("t2"),
                    TrackMetadata::mock("t3"),
                ],
            )
            .unwrap();

        let track_ids: Vec<_> = added.iter().map(|s| s.track_id.as_str()).collect();
        assert_eq!(track_ids, vec!["t1", "t3"]);
        assert_eq!(session.snapshot(None).queue.len(), 2);
    }

    #[test]
    fn seeding_skips_tracks_already_present() {
        let (jam, _) = setup();
        let session = jam.parties.create_party(new_party("host")).unwrap();

        session
            .seed_queue("host", vec![TrackMetadata::mock("t1")])
            .unwrap();
        let added = session
            .seed_queue(
                "host",
                vec![TrackMetadata::mock("t1"), TrackMetadata::mock("t2")],
            )
            .unwrap();

        assert_eq!(added.len(), 1);
        assert_eq!(added[0].track_id, "t2");
        assert_eq!(session.snapshot(None).queue.len(), 2);
    }

    #[test]
    fn host_removal_is_idempotent() {
        let (jam, _) = setup();
        let session = jam.parties.create_party(new_party("host")).unwrap();
        session
            .seed_queue("host", vec![TrackMetadata::mock("t1")])
            .unwrap();

        drain_events(&jam);

        assert!(session.remove_from_queue("host", "t1").unwrap());
        assert!(!session.remove_from_queue("host", "t1").unwrap());

        let events = drain_events(&jam);
        let removals = events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    PartyEvent::SongRemoved {
                        reason: RemovalReason::HostRemove,
                        ..
                    }
                )
            })
            .count();

        assert_eq!(removals, 1);
        assert!(session.snapshot(None).queue.is_empty());
    }

    #[test]
    fn now_playing_moves_a_track_out_of_the_queue() {
        let (jam, _) = setup();
        let session = jam.parties.create_party(new_party("host")).unwrap();
        session
            .seed_queue(
                "host",
                vec![TrackMetadata::mock("t1"), TrackMetadata::mock("t2")],
            )
            .unwrap();

        let song = session.set_now_playing("host", "t1", Some(42)).unwrap();
        assert_eq!(song.track_id, "t1");

        let snapshot = session.snapshot(None);
        assert_eq!(snapshot.now_playing.unwrap().track_id, "t1");
        assert_eq!(snapshot.queue.len(), 1);

        assert!(matches!(
            session.set_now_playing("host", "missing", None),
            Err(PartyError::TrackNotFound)
        ));
    }

    #[test]
    fn queue_track_is_removed_at_the_downvote_threshold() {
        let (jam, _) = setup();
        // Ten active members, host included
        let session = live_party(&jam, 9);

        session
            .seed_queue("host", vec![TrackMetadata::mock("t1")])
            .unwrap();
        drain_events(&jam);

        for i in 1..=3 {
            let result = session
                .vote(&format!("g{}", i), "t1", VoteKind::Down, VoteContext::Queue)
                .unwrap();
            assert_eq!(result.status, SongStatus::Queued);
        }

        // The fourth downvote meets 0.40 x 10
        let result = session
            .vote("g4", "t1", VoteKind::Down, VoteContext::Queue)
            .unwrap();

        assert_eq!(result.status, SongStatus::Removed);
        assert_eq!(result.downvotes, 4);
        assert!(session.snapshot(None).queue.is_empty());

        let events = drain_events(&jam);
        assert!(events.iter().any(|e| matches!(
            e,
            PartyEvent::SongRemoved {
                track_id,
                reason: RemovalReason::DownvoteThreshold,
                ..
            } if track_id == "t1"
        )));
    }
}
