use crate::{PartyEvent, RemovalReason};

use super::{
    PartyError, PartyStatus, Session, SessionState, SongStatus, VoteContext, VoteData, VoteKind,
    VoteResult,
};

/// Up and down tallies for a single track
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub upvotes: usize,
    pub downvotes: usize,
}

/// Recomputes the tally for a track from the live vote table.
/// This is the only place counts are ever derived from.
fn tally(votes: &[VoteData], track_id: &str) -> VoteTally {
    let mut tally = VoteTally::default();

    for vote in votes.iter().filter(|v| v.track_id == track_id) {
        match vote.kind {
            VoteKind::Up => tally.upvotes += 1,
            VoteKind::Down => tally.downvotes += 1,
            // Cleared votes are deleted, not stored
            VoteKind::None => {}
        }
    }

    tally
}

impl Session {
    /// Records a vote and applies the threshold policy against the active
    /// member count at this moment. A removal crossing always wins over a
    /// promotion crossing, and settled tracks stay settled.
    pub fn vote(
        &self,
        user_id: &str,
        track_id: &str,
        kind: VoteKind,
        context: VoteContext,
    ) -> Result<VoteResult, PartyError> {
        if user_id.is_empty() {
            return Err(PartyError::InvalidRequest("userId"));
        }

        if track_id.is_empty() {
            return Err(PartyError::InvalidRequest("trackId"));
        }

        let now = self.context.now_ms();
        let mut state = self.state.lock();

        if state.party.status != PartyStatus::Live {
            return Err(PartyError::PartyNotLive);
        }

        let party_id = state.party.id.clone();

        // Voting counts as activity
        state.touch(user_id, now);
        state.record_vote(user_id, track_id, kind, context, now);

        let tally = tally(&state.votes, track_id);
        state.sync_song_counts(track_id, tally);

        // The bar moves with the audience, so it is recomputed at vote time
        let active_members = self.active_count(&state, now);
        let config = &self.context.config;

        let mut status = state.song_status(track_id).unwrap_or(match context {
            VoteContext::Queue => SongStatus::Queued,
            VoteContext::Testing => SongStatus::Testing,
        });

        if !status.is_terminal() {
            if config.crosses_removal(tally.downvotes, active_members) {
                status = SongStatus::Removed;
                state.set_song_status(track_id, SongStatus::Removed);

                if context == VoteContext::Queue && state.drop_from_queue(track_id) {
                    self.context.emit(PartyEvent::SongRemoved {
                        party_id: party_id.clone(),
                        track_id: track_id.to_string(),
                        reason: RemovalReason::DownvoteThreshold,
                    });

                    self.context.emit(PartyEvent::QueueUpdated {
                        party_id: party_id.clone(),
                        queue: state.queue.clone(),
                    });
                }
            } else if context == VoteContext::Testing
                && config.crosses_promotion(tally.upvotes, active_members)
                && state.promote_suggestion(track_id)
            {
                status = SongStatus::Promoted;

                self.context.emit(PartyEvent::SuggestionPromoted {
                    party_id: party_id.clone(),
                    track_id: track_id.to_string(),
                });

                self.context.emit(PartyEvent::QueueUpdated {
                    party_id: party_id.clone(),
                    queue: state.queue.clone(),
                });
            }
        }

        self.context.emit(PartyEvent::VoteUpdate {
            party_id,
            track_id: track_id.to_string(),
            upvotes: tally.upvotes,
            downvotes: tally.downvotes,
            status,
            context,
        });

        Ok(VoteResult {
            track_id: track_id.to_string(),
            upvotes: tally.upvotes,
            downvotes: tally.downvotes,
            status,
            context,
        })
    }
}

impl SessionState {
    /// Upserts the user's vote slot for a track. A `None` vote deletes the
    /// slot outright, it is never stored as a third state.
    fn record_vote(
        &mut self,
        user_id: &str,
        track_id: &str,
        kind: VoteKind,
        context: VoteContext,
        now: u64,
    ) {
        self.votes
            .retain(|v| !(v.user_id == user_id && v.track_id == track_id));

        if kind != VoteKind::None {
            self.votes.push(VoteData {
                user_id: user_id.to_string(),
                track_id: track_id.to_string(),
                kind,
                context,
                timestamp: now,
            });
        }
    }

    /// Writes a recomputed tally onto the song, wherever it lives
    fn sync_song_counts(&mut self, track_id: &str, tally: VoteTally) {
        if let Some(song) = self.queue.iter_mut().find(|s| s.track_id == track_id) {
            song.upvotes = tally.upvotes;
            song.downvotes = tally.downvotes;
        }

        if let Some(suggestion) = self.suggestion_mut(track_id) {
            suggestion.song.upvotes = tally.upvotes;
            suggestion.song.downvotes = tally.downvotes;
        }
    }

    /// Moves a tested suggestion into the queue. The suggestion record is
    /// kept so later lookups against the track still resolve.
    fn promote_suggestion(&mut self, track_id: &str) -> bool {
        let Some(suggestion) = self.suggestion_mut(track_id) else {
            return false;
        };

        // Only a live test can promote, a settled one stays settled
        if suggestion.song.status != SongStatus::Testing {
            return false;
        }

        suggestion.song.status = SongStatus::Promoted;
        let song = suggestion.song.clone();
        self.queue.push(song);

        true
    }
}
