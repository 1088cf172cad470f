use log::info;

use crate::{random_sample, PartyEvent};

use super::{
    PartyError, PartyStatus, Session, SongSource, SongStatus, SuggestionData, TrackMetadata,
};

impl Session {
    /// Starts a sampled test for a guest-suggested track. A small slice of the
    /// active audience sees it first, a one-time expansion gives borderline
    /// tracks a bigger audience before they time out.
    pub fn suggest(
        &self,
        user_id: &str,
        track: TrackMetadata,
    ) -> Result<SuggestionData, PartyError> {
        if user_id.is_empty() {
            return Err(PartyError::InvalidRequest("userId"));
        }

        if track.track_id.is_empty() {
            return Err(PartyError::InvalidRequest("trackId"));
        }

        let now = self.context.now_ms();
        let config = self.context.config.clone();

        let suggestion = {
            let mut state = self.state.lock();

            if state.party.status != PartyStatus::Live {
                return Err(PartyError::PartyNotLive);
            }

            // The explicit check comes before the disabled check on purpose,
            // so blocked content is reported as such
            if state.party.kid_friendly && track.explicit {
                return Err(PartyError::ExplicitContentBlocked);
            }

            if !state.party.allow_suggestions {
                return Err(PartyError::SuggestionsDisabled);
            }

            if state.has_track(&track.track_id) {
                return Err(PartyError::DuplicateTrack);
            }

            // Suggesting counts as activity
            state.touch(user_id, now);

            let active = self.active_ids(&state, now);
            let sample_size = config.sample_size(active.len());
            let sample_user_ids = random_sample(&active, sample_size);

            let song = track.into_song(SongSource::GuestSuggestion, SongStatus::Testing);
            let suggestion = SuggestionData {
                track_id: song.track_id.clone(),
                song,
                sample_user_ids,
                created_at: now,
                expanded_at: None,
            };

            state.suggestions.push(suggestion.clone());

            info!(
                "Track {} suggested by {} in party {}, testing with {} members",
                suggestion.track_id,
                user_id,
                state.party.id,
                suggestion.sample_user_ids.len()
            );

            self.context.emit(PartyEvent::SuggestionTesting {
                party_id: state.party.id.clone(),
                track_id: suggestion.track_id.clone(),
                song: suggestion.song.clone(),
                sample_user_ids: suggestion.sample_user_ids.clone(),
                expires_at: now + config.suggest_expire_at_ms,
            });

            suggestion
        };

        self.schedule_lifecycle(&suggestion.track_id);

        Ok(suggestion)
    }

    /// Schedules the one-shot expand and expire timers for a new test.
    /// The callbacks re-check state when they fire, which doubles as soft
    /// cancellation when the suggestion settles early.
    fn schedule_lifecycle(&self, track_id: &str) {
        let config = &self.context.config;
        let party_id = self.id();

        let context = self.context.clone();
        let (expand_party, expand_track) = (party_id.clone(), track_id.to_string());
        self.context.scheduler.schedule(
            config.suggest_expand_at_ms,
            Box::new(move || {
                if let Some(session) = context.session_by_id(&expand_party) {
                    session.expand_suggestion(&expand_track);
                }
            }),
        );

        let context = self.context.clone();
        let (expire_party, expire_track) = (party_id, track_id.to_string());
        self.context.scheduler.schedule(
            config.suggest_expire_at_ms,
            Box::new(move || {
                if let Some(session) = context.session_by_id(&expire_party) {
                    session.expire_suggestion(&expire_track);
                }
            }),
        );
    }

    /// Redraws a doubled sample for a still-running test. Does nothing when
    /// the suggestion settled or was already expanded, so a duplicate timer
    /// fire is harmless.
    pub fn expand_suggestion(&self, track_id: &str) {
        let now = self.context.now_ms();
        let config = self.context.config.clone();

        let mut state = self.state.lock();

        // The audience may have changed since creation, so it is sampled fresh
        let active = self.active_ids(&state, now);
        let party_id = state.party.id.clone();

        let Some(suggestion) = state.suggestion_mut(track_id) else {
            return;
        };

        if suggestion.song.status != SongStatus::Testing || suggestion.expanded_at.is_some() {
            return;
        }

        let expanded_size = config.expanded_sample_size(suggestion.sample_user_ids.len());
        suggestion.sample_user_ids = random_sample(&active, expanded_size);
        suggestion.expanded_at = Some(now);

        info!(
            "Expanded test for track {} in party {} to {} members",
            track_id,
            party_id,
            suggestion.sample_user_ids.len()
        );

        self.context.emit(PartyEvent::SuggestionTesting {
            party_id,
            track_id: suggestion.track_id.clone(),
            song: suggestion.song.clone(),
            sample_user_ids: suggestion.sample_user_ids.clone(),
            // The deadline stays anchored to the original creation time
            expires_at: suggestion.created_at + config.suggest_expire_at_ms,
        });
    }

    /// Expires a test that never crossed a threshold. Safe against stale fires.
    pub fn expire_suggestion(&self, track_id: &str) {
        let mut state = self.state.lock();
        let party_id = state.party.id.clone();

        let Some(suggestion) = state.suggestion_mut(track_id) else {
            return;
        };

        if suggestion.song.status != SongStatus::Testing {
            return;
        }

        suggestion.song.status = SongStatus::Expired;

        info!("Test for track {} in party {} expired", track_id, party_id);

        self.context.emit(PartyEvent::SuggestionExpired {
            party_id,
            track_id: track_id.to_string(),
        });
    }
}

#[cfg(test)]
mod test {
    use super::super::session::test::{drain_events, live_party, setup};
    use crate::{
        PartyError, PartyEvent, PartySetting, SongSource, SongStatus, TrackMetadata, VoteContext,
        VoteKind,
    };

    #[test]
    fn suggestions_draw_a_minimum_sample_from_the_active_audience() {
        let (jam, _) = setup();
        // Ten active members, host included
        let session = live_party(&jam, 9);

        let suggestion = session.suggest("g1", TrackMetadata::mock("s1")).unwrap();

        assert_eq!(suggestion.sample_user_ids.len(), 3);
        assert_eq!(suggestion.song.status, SongStatus::Testing);
        assert_eq!(suggestion.song.source, SongSource::GuestSuggestion);

        let snapshot = session.snapshot(None);
        let member_ids: Vec<_> = snapshot.members.iter().map(|m| &m.user_id).collect();

        assert!(suggestion
            .sample_user_ids
            .iter()
            .all(|id| member_ids.contains(&id)));
        assert_eq!(snapshot.testing_suggestions.len(), 1);
        assert!(snapshot.queue.is_empty());
    }

    #[test]
    fn the_sample_cannot_outgrow_the_audience() {
        let (jam, _) = setup();
        // Two members total, below the sample floor of three
        let session = live_party(&jam, 1);

        let suggestion = session.suggest("g1", TrackMetadata::mock("s1")).unwrap();
        assert_eq!(suggestion.sample_user_ids.len(), 2);
    }

    #[test]
    fn suggestions_are_rejected_outside_a_live_party() {
        let (jam, _) = setup();
        let session = jam
            .parties
            .create_party(crate::NewParty {
                host_id: "host".to_string(),
                mood: None,
                kid_friendly: None,
                allow_suggestions: None,
            })
            .unwrap();

        assert!(matches!(
            session.suggest("host", TrackMetadata::mock("s1")),
            Err(PartyError::PartyNotLive)
        ));
    }

    #[test]
    fn explicit_tracks_are_blocked_in_kid_friendly_parties() {
        let (jam, _) = setup();
        let session = live_party(&jam, 9);
        session
            .update_setting("host", PartySetting::KidFriendly(true))
            .unwrap();

        let result = session.suggest("g1", TrackMetadata::mock_explicit("s1"));
        assert!(matches!(result, Err(PartyError::ExplicitContentBlocked)));

        // No record is left behind
        assert!(session.suggestion("s1").is_none());
        assert!(session.snapshot(None).testing_suggestions.is_empty());
    }

    #[test]
    fn the_explicit_check_outranks_the_disabled_check() {
        let (jam, _) = setup();
        let session = live_party(&jam, 9);
        session
            .update_setting("host", PartySetting::KidFriendly(true))
            .unwrap();
        session
            .update_setting("host", PartySetting::AllowSuggestions(false))
            .unwrap();

        assert!(matches!(
            session.suggest("g1", TrackMetadata::mock_explicit("s1")),
            Err(PartyError::ExplicitContentBlocked)
        ));

        assert!(matches!(
            session.suggest("g1", TrackMetadata::mock("s2")),
            Err(PartyError::SuggestionsDisabled)
        ));
    }

    #[test]
    fn duplicate_tracks_cannot_be_suggested() {
        let (jam, _) = setup();
        let session = live_party(&jam, 9);

        session
            .seed_queue("host", vec![TrackMetadata::mock("t1")])
            .unwrap();
        session.suggest("g1", TrackMetadata::mock("s1")).unwrap();

        assert!(matches!(
            session.suggest("g2", TrackMetadata::mock("t1")),
            Err(PartyError::DuplicateTrack)
        ));
        assert!(matches!(
            session.suggest("g2", TrackMetadata::mock("s1")),
            Err(PartyError::DuplicateTrack)
        ));
    }

    #[test]
    fn only_the_sampled_members_are_notified_of_a_test() {
        let (jam, _) = setup();
        let session = live_party(&jam, 9);

        drain_events(&jam);
        let suggestion = session.suggest("g1", TrackMetadata::mock("s1")).unwrap();

        let events = drain_events(&jam);
        let testing = events
            .iter()
            .find_map(|e| match e {
                PartyEvent::SuggestionTesting {
                    sample_user_ids,
                    expires_at,
                    ..
                } => Some((sample_user_ids.clone(), *expires_at)),
                _ => None,
            })
            .expect("a testing event is emitted");

        assert_eq!(testing.0, suggestion.sample_user_ids);
        assert_eq!(testing.1, suggestion.created_at + 300_000);
    }

    #[test]
    fn enough_upvotes_promote_a_suggestion_into_the_queue() {
        let (jam, _) = setup();
        // Ten active members, so the bar sits at four upvotes
        let session = live_party(&jam, 9);
        session.suggest("g1", TrackMetadata::mock("s1")).unwrap();

        for i in 1..=3 {
            let result = session
                .vote(&format!("g{}", i), "s1", VoteKind::Up, VoteContext::Testing)
                .unwrap();
            assert_eq!(result.status, SongStatus::Testing);
        }

        drain_events(&jam);
        let result = session
            .vote("g4", "s1", VoteKind::Up, VoteContext::Testing)
            .unwrap();

        assert_eq!(result.upvotes, 4);
        assert_eq!(result.status, SongStatus::Promoted);

        let snapshot = session.snapshot(None);
        let queued: Vec<_> = snapshot
            .queue
            .iter()
            .filter(|s| s.track_id == "s1")
            .collect();

        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].status, SongStatus::Promoted);
        assert!(snapshot.testing_suggestions.is_empty());

        let events = drain_events(&jam);
        assert!(events
            .iter()
            .any(|e| matches!(e, PartyEvent::SuggestionPromoted { track_id, .. } if track_id == "s1")));
    }

    #[test]
    fn promotion_happens_exactly_once() {
        let (jam, _) = setup();
        let session = live_party(&jam, 9);
        session.suggest("g1", TrackMetadata::mock("s1")).unwrap();

        for i in 1..=4 {
            session
                .vote(&format!("g{}", i), "s1", VoteKind::Up, VoteContext::Testing)
                .unwrap();
        }

        // A fifth upvote crosses the bar again, but the track is settled
        let result = session
            .vote("g5", "s1", VoteKind::Up, VoteContext::Testing)
            .unwrap();

        assert_eq!(result.status, SongStatus::Promoted);
        assert_eq!(
            session
                .snapshot(None)
                .queue
                .iter()
                .filter(|s| s.track_id == "s1")
                .count(),
            1
        );
    }

    #[test]
    fn the_sample_expands_once_and_then_the_test_expires() {
        let (jam, time) = setup();
        let session = live_party(&jam, 9);

        session.suggest("g1", TrackMetadata::mock("s1")).unwrap();
        drain_events(&jam);

        // Two minutes in, the sample doubles
        time.advance(120_000);

        let expanded = session.suggestion("s1").unwrap();
        assert_eq!(expanded.sample_user_ids.len(), 6);
        assert_eq!(expanded.expanded_at, Some(expanded.created_at + 120_000));
        assert_eq!(expanded.song.status, SongStatus::Testing);

        let events = drain_events(&jam);
        assert!(events.iter().any(|e| matches!(
            e,
            PartyEvent::SuggestionTesting { expires_at, .. }
                if *expires_at == expanded.created_at + 300_000
        )));

        // Five minutes in, the untested suggestion dies
        time.advance(180_000);

        let expired = session.suggestion("s1").unwrap();
        assert_eq!(expired.song.status, SongStatus::Expired);
        assert!(session.snapshot(None).testing_suggestions.is_empty());

        let events = drain_events(&jam);
        assert!(events
            .iter()
            .any(|e| matches!(e, PartyEvent::SuggestionExpired { track_id, .. } if track_id == "s1")));
    }

    #[test]
    fn a_duplicate_expand_fire_changes_nothing() {
        let (jam, time) = setup();
        let session = live_party(&jam, 9);

        session.suggest("g1", TrackMetadata::mock("s1")).unwrap();
        time.advance(120_000);

        let first = session.suggestion("s1").unwrap();

        // Simulate the timer firing twice
        session.expand_suggestion("s1");
        let second = session.suggestion("s1").unwrap();

        assert_eq!(first.sample_user_ids, second.sample_user_ids);
        assert_eq!(first.expanded_at, second.expanded_at);
    }

    #[test]
    fn settled_suggestions_do_not_expire() {
        let (jam, time) = setup();
        let session = live_party(&jam, 9);

        session.suggest("g1", TrackMetadata::mock("s1")).unwrap();

        for i in 1..=4 {
            session
                .vote(&format!("g{}", i), "s1", VoteKind::Up, VoteContext::Testing)
                .unwrap();
        }

        drain_events(&jam);

        // Both timers fire on a promoted track and must leave it alone
        time.advance(300_000);

        let suggestion = session.suggestion("s1").unwrap();
        assert_eq!(suggestion.song.status, SongStatus::Promoted);
        assert!(suggestion.expanded_at.is_none());

        let events = drain_events(&jam);
        assert!(!events
            .iter()
            .any(|e| matches!(e, PartyEvent::SuggestionExpired { .. })));
    }
}
