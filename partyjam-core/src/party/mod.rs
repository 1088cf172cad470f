mod data;
mod session;
mod suggestions;
mod votes;

use std::sync::Arc;

use log::info;
use thiserror::Error;

pub use data::*;
pub use session::*;
pub use votes::*;

use crate::{random_join_code, random_string, PartyContext};

/// Creates parties and resolves join codes.
pub struct PartyManager {
    context: PartyContext,
}

#[derive(Debug, Error)]
pub enum PartyError {
    #[error("{0} is required")]
    InvalidRequest(&'static str),
    #[error("Party not found")]
    PartyNotFound,
    #[error("User is not a member of this party")]
    MemberNotFound,
    #[error("Track not found")]
    TrackNotFound,
    #[error("Join code does not resolve to a party")]
    JoinCodeNotFound,
    #[error("Only the host can do this")]
    NotHost,
    #[error("The host has disabled suggestions")]
    SuggestionsDisabled,
    #[error("Explicit tracks are not allowed in a kid friendly party")]
    ExplicitContentBlocked,
    #[error("This action is not valid while the party is {0:?}")]
    InvalidState(PartyStatus),
    #[error("Party must be live to do this")]
    PartyNotLive,
    #[error("Track is already in the queue or under test")]
    DuplicateTrack,
}

impl PartyError {
    /// A stable code per failure condition, for clients to branch on
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::PartyNotFound => "PARTY_NOT_FOUND",
            Self::MemberNotFound => "MEMBER_NOT_FOUND",
            Self::TrackNotFound => "TRACK_NOT_FOUND",
            Self::JoinCodeNotFound => "JOIN_CODE_NOT_FOUND",
            Self::NotHost => "NOT_HOST",
            Self::SuggestionsDisabled => "SUGGESTIONS_DISABLED",
            Self::ExplicitContentBlocked => "EXPLICIT_CONTENT_BLOCKED",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::PartyNotLive => "PARTY_NOT_LIVE",
            Self::DuplicateTrack => "DUPLICATE_TRACK",
        }
    }
}

impl PartyManager {
    /// How many fresh draws a clashing join code gets before the draw is kept anyway
    const JOIN_CODE_ATTEMPTS: usize = 16;

    pub fn new(context: &PartyContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Creates a new party with the caller as host and first member
    pub fn create_party(&self, new_party: NewParty) -> Result<Arc<Session>, PartyError> {
        if new_party.host_id.is_empty() {
            return Err(PartyError::InvalidRequest("hostId"));
        }

        let now = self.context.now_ms();
        let party_id = format!("party_{}_{}", now, random_string(9));
        let join_code = self.unique_join_code();

        let party = PartyData {
            id: party_id.clone(),
            host_id: new_party.host_id,
            status: PartyStatus::Created,
            mood: new_party.mood.unwrap_or_else(|| "chill".to_string()),
            kid_friendly: new_party.kid_friendly.unwrap_or(false),
            allow_suggestions: new_party.allow_suggestions.unwrap_or(true),
            created_at: now,
        };

        let session = Arc::new(Session::new(&self.context, party, join_code.clone()));
        session.register_host();

        self.context.parties.insert(party_id.clone(), session.clone());
        self.context.join_codes.insert(join_code, party_id);

        info!(
            "Party {} created by {}",
            session.id(),
            session.data().host_id
        );

        Ok(session)
    }

    /// Resolves a join code to its party. Codes match case-insensitively.
    pub fn resolve_join_code(&self, code: &str) -> Result<Arc<Session>, PartyError> {
        let code = code.trim().to_ascii_uppercase();

        let party_id = self
            .context
            .join_codes
            .get(&code)
            .map(|id| id.value().clone())
            .ok_or(PartyError::JoinCodeNotFound)?;

        self.party_by_id(&party_id)
    }

    /// Returns the session for a party, if it exists
    pub fn party_by_id(&self, party_id: &str) -> Result<Arc<Session>, PartyError> {
        self.context
            .session_by_id(party_id)
            .ok_or(PartyError::PartyNotFound)
    }

    fn unique_join_code(&self) -> String {
        for _ in 0..Self::JOIN_CODE_ATTEMPTS {
            let code = random_join_code();

            if !self.context.join_codes.contains_key(&code) {
                return code;
            }
        }

        // 36^6 codes make a clash streak this long practically impossible
        random_join_code()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::{Config, ManualTime, NewParty, PartyError, PartyJam};

    fn new_party(host_id: &str) -> NewParty {
        NewParty {
            host_id: host_id.to_string(),
            mood: None,
            kid_friendly: None,
            allow_suggestions: None,
        }
    }

    fn setup() -> PartyJam {
        let time = ManualTime::new(1_000);
        PartyJam::with_timing(Config::default(), time.clone(), time)
    }

    #[test]
    fn created_parties_have_defaults_and_a_host_member() {
        let jam = setup();

        let session = jam.parties.create_party(new_party("host")).unwrap();
        let party = session.data();

        assert_eq!(party.host_id, "host");
        assert_eq!(party.mood, "chill");
        assert!(!party.kid_friendly);
        assert!(party.allow_suggestions);

        let snapshot = session.snapshot(None);
        assert_eq!(snapshot.members.len(), 1);
        assert_eq!(snapshot.members[0].user_id, "host");
        assert_eq!(snapshot.active_members_count, 1);
    }

    #[test]
    fn create_party_requires_a_host_id() {
        let jam = setup();

        let result = jam.parties.create_party(new_party(""));
        assert!(matches!(result, Err(PartyError::InvalidRequest("hostId"))));
    }

    #[test]
    fn join_codes_resolve_case_insensitively() {
        let jam = setup();

        let session = jam.parties.create_party(new_party("host")).unwrap();
        let code = session.join_code().to_string();

        let resolved = jam
            .parties
            .resolve_join_code(&code.to_ascii_lowercase())
            .unwrap();
        assert!(Arc::ptr_eq(&resolved, &session));

        assert!(matches!(
            jam.parties.resolve_join_code("NOPE42"),
            Err(PartyError::JoinCodeNotFound)
        ));
    }

    #[test]
    fn unknown_parties_are_not_found() {
        let jam = setup();

        assert!(matches!(
            jam.parties.party_by_id("party_missing"),
            Err(PartyError::PartyNotFound)
        ));
    }
}
