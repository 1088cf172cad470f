/// The configuration of the party engine
#[derive(Debug, Clone)]
pub struct Config {
    /// How long a member counts as active after their last action, in minutes
    pub active_window_min: u64,
    /// The fraction of active members whose upvotes promote a tested suggestion
    pub promote_threshold: f64,
    /// The fraction of active members whose downvotes remove a track
    pub remove_threshold: f64,
    /// The fraction of active members sampled to test a suggestion
    pub sample_percent: f64,
    /// The smallest sample ever drawn
    pub sample_min: usize,
    /// The largest sample ever drawn
    pub sample_cap: usize,
    /// How long after creation a suggestion's sample is expanded, in milliseconds
    pub suggest_expand_at_ms: u64,
    /// How long after creation an untested suggestion expires, in milliseconds
    pub suggest_expire_at_ms: u64,
}

impl Config {
    /// The active window in milliseconds
    pub fn active_window_ms(&self) -> u64 {
        self.active_window_min * 60 * 1000
    }

    /// Whether a member who last acted at `last_active_at` still counts as active at `now`
    pub fn is_active(&self, now: u64, last_active_at: u64) -> bool {
        now.saturating_sub(last_active_at) <= self.active_window_ms()
    }

    /// The sample size for a new suggestion test, given the current active member count
    pub fn sample_size(&self, active_members: usize) -> usize {
        let scaled = (active_members as f64 * self.sample_percent).ceil() as usize;
        scaled.clamp(self.sample_min, self.sample_cap)
    }

    /// The sample size after the one-time expansion
    pub fn expanded_sample_size(&self, initial_size: usize) -> usize {
        (initial_size * 2).min(self.sample_cap)
    }

    /// Whether a downvote tally crosses the removal threshold.
    /// The integer tally is compared against the real-valued bar, which is never rounded.
    pub fn crosses_removal(&self, downvotes: usize, active_members: usize) -> bool {
        downvotes as f64 >= self.remove_threshold * active_members as f64
    }

    /// Whether an upvote tally crosses the promotion threshold
    pub fn crosses_promotion(&self, upvotes: usize, active_members: usize) -> bool {
        upvotes as f64 >= self.promote_threshold * active_members as f64
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            active_window_min: 10,
            promote_threshold: 0.40,
            remove_threshold: 0.40,
            sample_percent: 0.05,
            sample_min: 3,
            sample_cap: 15,
            // Two minutes into the five minute test window
            suggest_expand_at_ms: 120_000,
            suggest_expire_at_ms: 300_000,
        }
    }
}
