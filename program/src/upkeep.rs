// Upkeep scheduling: decides whether an open round may close
use solana_program::clock::UnixTimestamp;

use crate::raffle_state::{RafflePhase, Round};

/// Individual conditions behind the upkeep decision
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpkeepCheck {
    pub is_open: bool,
    pub interval_elapsed: bool,
    pub has_entrants: bool,
    pub has_balance: bool,
}

impl UpkeepCheck {
    pub fn is_needed(&self) -> bool {
        self.is_open && self.interval_elapsed && self.has_entrants && self.has_balance
    }
}

/// Evaluate the upkeep conditions at `now`. Reads only.
pub fn check_upkeep(round: &Round, now: UnixTimestamp) -> UpkeepCheck {
    // A clock behind the last close never counts as elapsed
    let interval_elapsed = u64::try_from(now.saturating_sub(round.last_close_timestamp))
        .map(|elapsed| elapsed >= round.interval)
        .unwrap_or(false);

    UpkeepCheck {
        is_open: round.phase == RafflePhase::Open,
        interval_elapsed,
        has_entrants: !round.entrants.is_empty(),
        has_balance: round.pooled_balance > 0,
    }
}

pub fn is_upkeep_needed(round: &Round, now: UnixTimestamp) -> bool {
    check_upkeep(round, now).is_needed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry_ledger::record_entry;
    use crate::test_utils::open_round;
    use solana_program::pubkey::Pubkey;

    #[test]
    fn empty_round_never_needs_upkeep() {
        let round = open_round(100, 30);

        for now in [0, 30, 31, 10_000, i64::MAX] {
            assert!(!is_upkeep_needed(&round, now));
        }
    }

    #[test]
    fn needed_once_interval_elapses_with_entrants() {
        let mut round = open_round(100, 30);
        record_entry(&mut round, Pubkey::new_unique(), 100).unwrap();

        assert!(!is_upkeep_needed(&round, 29));
        assert!(is_upkeep_needed(&round, 30));
        assert!(is_upkeep_needed(&round, 31));
    }

    #[test]
    fn closing_round_does_not_need_upkeep() {
        let mut round = open_round(100, 30);
        record_entry(&mut round, Pubkey::new_unique(), 100).unwrap();
        round.phase = RafflePhase::Closing;

        let check = check_upkeep(&round, 100);

        assert!(!check.is_open);
        assert!(check.interval_elapsed && check.has_entrants && check.has_balance);
        assert!(!check.is_needed());
    }

    #[test]
    fn clock_before_last_close_is_not_elapsed() {
        let mut round = open_round(100, 0);
        record_entry(&mut round, Pubkey::new_unique(), 100).unwrap();
        round.last_close_timestamp = 50;

        assert!(!is_upkeep_needed(&round, 49));
        assert!(is_upkeep_needed(&round, 50));
    }

    #[test]
    fn repeated_checks_are_stable_and_read_only() {
        let mut round = open_round(100, 30);
        record_entry(&mut round, Pubkey::new_unique(), 100).unwrap();
        let before = round.clone();

        let first = check_upkeep(&round, 45);
        for _ in 0..10 {
            assert_eq!(check_upkeep(&round, 45), first);
        }
        assert_eq!(round, before);
    }
}
