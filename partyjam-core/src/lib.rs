use std::sync::Arc;

use crossbeam::channel::unbounded;
use dashmap::DashMap;

mod config;
mod events;
mod party;
mod timing;
mod util;

pub use config::*;
pub use events::*;
pub use party::*;
pub use timing::*;
pub use util::*;

// Reduces verbosity
type Store<Id, T> = Arc<DashMap<Id, Arc<T>>>;

/// The party jam system, facilitating party sessions, crowd voting, and suggestion testing.
pub struct PartyJam {
    context: PartyContext,
    event_receiver: EventReceiver,

    pub parties: PartyManager,
}

/// A type passed to various components of the system, to access state, emit events, and read the clock.
#[derive(Clone)]
pub struct PartyContext {
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    pub scheduler: Arc<dyn Scheduler>,

    event_sender: EventSender,

    pub parties: Store<PartyId, Session>,
    pub join_codes: Arc<DashMap<String, PartyId>>,
}

impl PartyJam {
    pub fn new(config: Config) -> Self {
        Self::with_timing(
            config,
            Arc::new(SystemClock),
            Arc::new(TokioScheduler::new()),
        )
    }

    /// Creates the system with a custom clock and scheduler.
    pub fn with_timing(
        config: Config,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let (event_sender, event_receiver) = unbounded();

        let context = PartyContext {
            config,
            clock,
            scheduler,
            event_sender,

            parties: Default::default(),
            join_codes: Default::default(),
        };

        let parties = PartyManager::new(&context);

        Self {
            context,
            event_receiver,
            parties,
        }
    }

    /// Receive events from the system, blocking until one is emitted.
    pub fn wait_for_event(&self) -> PartyEvent {
        self.event_receiver
            .recv()
            .expect("event is received without error")
    }

    /// Receive the next event if one is pending.
    pub fn poll_event(&self) -> Option<PartyEvent> {
        self.event_receiver.try_recv().ok()
    }

    pub fn config(&self) -> &Config {
        &self.context.config
    }
}

impl PartyContext {
    pub fn emit(&self, event: PartyEvent) {
        self.event_sender.send(event).expect("event is sent");
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Returns the session for a party, if it exists.
    pub fn session_by_id(&self, party_id: &str) -> Option<Arc<Session>> {
        self.parties.get(party_id).map(|s| s.value().clone())
    }
}
