// Entry ledger: the only code that appends entrants or touches the pool on entry
use solana_program::{entrypoint::ProgramResult, msg, pubkey::Pubkey};

use crate::raffle_error::RaffleError;
use crate::raffle_state::{RafflePhase, Round, MAX_ENTRANTS};

/// Append `participant` to the round for exactly one entry fee.
///
/// The same participant may enter repeatedly; each entry is its own slot.
pub fn record_entry(round: &mut Round, participant: Pubkey, amount: u64) -> ProgramResult {
    if round.phase != RafflePhase::Open {
        msg!("Round is not open, entry from {} rejected", participant);
        return Err(RaffleError::RoundNotOpen.into());
    }

    if amount != round.entry_fee {
        msg!(
            "Incorrect entry amount: expected {} lamports, got {}",
            round.entry_fee,
            amount
        );
        return Err(RaffleError::IncorrectFee.into());
    }

    if round.entrants.len() >= MAX_ENTRANTS {
        msg!("Round is full at {} entrants", MAX_ENTRANTS);
        return Err(RaffleError::RoundFull.into());
    }

    let pooled_balance = round
        .pooled_balance
        .checked_add(amount)
        .ok_or(RaffleError::AmountOverflow)?;

    round.entrants.push(participant);
    round.pooled_balance = pooled_balance;
    Ok(())
}

/// Clear entrants and zero the pool once the payout has been made
pub(crate) fn reset(round: &mut Round) {
    round.entrants.clear();
    round.pooled_balance = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::open_round;

    #[test]
    fn pool_tracks_fee_times_entrants() {
        let mut round = open_round(100, 30);

        for expected in [100, 200, 300] {
            record_entry(&mut round, Pubkey::new_unique(), 100).unwrap();
            assert_eq!(round.pooled_balance(), expected);
            assert_eq!(
                round.pooled_balance(),
                round.entry_fee() * round.entrant_count() as u64
            );
        }
    }

    #[test]
    fn repeat_entries_take_separate_slots() {
        let mut round = open_round(100, 30);
        let player = Pubkey::new_unique();

        record_entry(&mut round, player, 100).unwrap();
        record_entry(&mut round, player, 100).unwrap();

        assert_eq!(round.entrants(), &[player, player]);
        assert_eq!(round.pooled_balance(), 200);
    }

    #[test]
    fn wrong_amount_is_rejected() {
        let mut round = open_round(100, 30);

        for amount in [99, 101, 0] {
            assert_eq!(
                record_entry(&mut round, Pubkey::new_unique(), amount).unwrap_err(),
                RaffleError::IncorrectFee.into()
            );
        }
        assert_eq!(round.pooled_balance(), 0);
        assert_eq!(round.entrant_count(), 0);
    }

    #[test]
    fn closing_round_rejects_entries() {
        let mut round = open_round(100, 30);
        record_entry(&mut round, Pubkey::new_unique(), 100).unwrap();
        round.phase = RafflePhase::Closing;

        assert_eq!(
            record_entry(&mut round, Pubkey::new_unique(), 100).unwrap_err(),
            RaffleError::RoundNotOpen.into()
        );
        assert_eq!(round.entrant_count(), 1);
        assert_eq!(round.pooled_balance(), 100);
    }

    #[test]
    fn full_round_rejects_entries() {
        let mut round = open_round(1, 30);
        for _ in 0..MAX_ENTRANTS {
            record_entry(&mut round, Pubkey::new_unique(), 1).unwrap();
        }

        assert_eq!(
            record_entry(&mut round, Pubkey::new_unique(), 1).unwrap_err(),
            RaffleError::RoundFull.into()
        );
        assert_eq!(round.pooled_balance(), MAX_ENTRANTS as u64);
    }

    #[test]
    fn reset_empties_the_round() {
        let mut round = open_round(100, 30);
        record_entry(&mut round, Pubkey::new_unique(), 100).unwrap();

        reset(&mut round);

        assert_eq!(round.entrant_count(), 0);
        assert_eq!(round.pooled_balance(), 0);
    }
}
