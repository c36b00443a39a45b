//! Online representative tracking.
//!
//! Quorum is measured against representatives actually voting, not the full
//! delegation table: a representative is online if it voted within the last
//! five announcement periods. A configured floor keeps the quorum
//! denominator from collapsing when few representatives are visible.

use ferrite_types::{Account, Amount};
use std::collections::HashMap;
use std::sync::Mutex;

pub struct OnlineReps {
    /// Representative → last vote time (milliseconds).
    seen: Mutex<HashMap<Account, u64>>,
    window_ms: u64,
}

impl OnlineReps {
    pub fn new(window_ms: u64) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            window_ms,
        }
    }

    /// Record a vote from `representative` at `now` (milliseconds).
    pub fn observe(&self, representative: Account, now_ms: u64) {
        let mut seen = self.seen.lock().expect("online reps poisoned");
        let entry = seen.entry(representative).or_insert(0);
        if now_ms > *entry {
            *entry = now_ms;
        }
    }

    /// Representatives that voted within the window.
    pub fn list(&self, now_ms: u64) -> Vec<Account> {
        let cutoff = now_ms.saturating_sub(self.window_ms);
        self.seen
            .lock()
            .expect("online reps poisoned")
            .iter()
            .filter(|(_, &last)| last >= cutoff)
            .map(|(rep, _)| *rep)
            .collect()
    }

    /// Total weight of the representatives currently online.
    pub fn online_stake(&self, now_ms: u64, weight_of: impl Fn(&Account) -> Amount) -> Amount {
        self.list(now_ms)
            .into_iter()
            .fold(Amount::ZERO, |acc, rep| acc.saturating_add(weight_of(&rep)))
    }

    /// Drop representatives that fell out of the window.
    pub fn prune(&self, now_ms: u64) {
        let cutoff = now_ms.saturating_sub(self.window_ms);
        self.seen
            .lock()
            .expect("online reps poisoned")
            .retain(|_, &mut last| last >= cutoff);
    }

    pub fn len(&self) -> usize {
        self.seen.lock().expect("online reps poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rep(n: u8) -> Account {
        Account::new([n; 32])
    }

    #[test]
    fn window_filters_stale_voters() {
        let online = OnlineReps::new(1000);
        online.observe(rep(1), 100);
        online.observe(rep(2), 1500);

        let listed = online.list(1600);
        assert_eq!(listed, vec![rep(2)]);
    }

    #[test]
    fn stake_sums_online_weights() {
        let online = OnlineReps::new(1000);
        online.observe(rep(1), 500);
        online.observe(rep(2), 600);
        online.observe(rep(3), 0); // stale at query time

        let stake = online.online_stake(1200, |account| {
            Amount::new(account.as_bytes()[0] as u128 * 100)
        });
        assert_eq!(stake, Amount::new(300));
    }

    #[test]
    fn older_observation_does_not_regress() {
        let online = OnlineReps::new(1000);
        online.observe(rep(1), 900);
        online.observe(rep(1), 200);
        assert_eq!(online.list(1500), vec![rep(1)]);
    }

    #[test]
    fn prune_drops_stale_entries() {
        let online = OnlineReps::new(100);
        online.observe(rep(1), 10);
        online.observe(rep(2), 500);
        online.prune(550);
        assert_eq!(online.len(), 1);
    }
}
