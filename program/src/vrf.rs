// Randomness request coordination for raffle rounds
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    log::sol_log_data,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::payout;
use crate::raffle_error::RaffleError;
use crate::raffle_state::{RafflePhase, Round};
use crate::upkeep;

/// Confirmations the oracle waits before answering
pub const REQUEST_CONFIRMATIONS: u16 = 3;
/// Random words requested per round
pub const NUM_WORDS: u32 = 1;

/// Oracle parameters fixed at raffle construction
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomnessConfig {
    /// Gas lane / key hash identifying the oracle's proving key
    pub key_hash: [u8; 32],
    /// Oracle subscription billed for the request
    pub subscription_id: u64,
    /// Compute budget reserved for the fulfillment callback
    pub callback_gas_limit: u32,
}

impl Default for RandomnessConfig {
    fn default() -> Self {
        Self {
            key_hash: [
                71, 78, 52, 160, 119, 223, 88, 128, 125, 190, 156, 150, 211, 192, 9, 178, 59, 60,
                109, 12, 206, 67, 62, 89, 187, 245, 179, 79, 130, 59, 197, 108,
            ],
            subscription_id: 0,
            callback_gas_limit: 500_000,
        }
    }
}

/// Everything the oracle needs to answer one request
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomnessSeed {
    pub nonce: u64,
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

impl RandomnessSeed {
    pub fn new(nonce: u64, config: &RandomnessConfig) -> Self {
        Self {
            nonce,
            key_hash: config.key_hash,
            subscription_id: config.subscription_id,
            request_confirmations: REQUEST_CONFIRMATIONS,
            callback_gas_limit: config.callback_gas_limit,
            num_words: NUM_WORDS,
        }
    }
}

/// Outbound side of the randomness oracle.
///
/// `request` must not block on the answer; the matching fulfillment arrives
/// later as a separate invocation carrying the returned id.
pub trait RandomnessOracle {
    fn request(&mut self, seed: &RandomnessSeed) -> Result<u64, ProgramError>;
}

/// Publishes requests in the program log for the off-chain oracle to pick up.
/// The request id is the round's nonce.
pub struct LoggedRequestOracle;

impl RandomnessOracle for LoggedRequestOracle {
    fn request(&mut self, seed: &RandomnessSeed) -> Result<u64, ProgramError> {
        let data = seed
            .try_to_vec()
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
        sol_log_data(&[b"randomness_request", &data]);
        msg!(
            "Randomness requested: id={}, subscription={}, confirmations={}, gas_limit={}, words={}",
            seed.nonce,
            seed.subscription_id,
            seed.request_confirmations,
            seed.callback_gas_limit,
            seed.num_words
        );
        Ok(seed.nonce)
    }
}

/// Winner chosen for a validated fulfillment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WinnerSelection {
    pub request_id: u64,
    pub index: usize,
    pub winner: Pubkey,
}

/// Close the round and ask the oracle for randomness.
///
/// Eligibility is re-checked here rather than trusted from the trigger.
/// The oracle is called before any field changes, so a failed request
/// leaves the round untouched.
pub fn request_randomness<O: RandomnessOracle>(
    round: &mut Round,
    now: UnixTimestamp,
    oracle: &mut O,
) -> Result<u64, ProgramError> {
    if round.phase != RafflePhase::Open {
        msg!(
            "Round is closing on request {:?}, cannot request again",
            round.pending_request_id
        );
        return Err(RaffleError::RoundNotOpen.into());
    }

    let check = upkeep::check_upkeep(round, now);
    if !check.is_needed() {
        msg!(
            "Upkeep not needed: balance={}, players={}, elapsed={}s of {}s",
            round.pooled_balance,
            round.entrants.len(),
            now.saturating_sub(round.last_close_timestamp),
            round.interval
        );
        return Err(RaffleError::UpkeepNotNeeded.into());
    }

    let nonce = round
        .request_nonce
        .checked_add(1)
        .ok_or(RaffleError::AmountOverflow)?;
    let request_id = oracle.request(&RandomnessSeed::new(nonce, &round.randomness))?;

    round.request_nonce = nonce;
    round.phase = RafflePhase::Closing;
    round.pending_request_id = Some(request_id);
    round.last_close_timestamp = now;

    Ok(request_id)
}

/// Validate an inbound fulfillment and pick the winner.
///
/// Does not mutate the round; settlement clears the pending request only
/// once the payout has gone through.
pub fn fulfill(
    round: &Round,
    caller: &Pubkey,
    request_id: u64,
    random_value: u64,
) -> Result<WinnerSelection, ProgramError> {
    if *caller != round.oracle {
        msg!(
            "Fulfillment from {} rejected, expected oracle {}",
            caller,
            round.oracle
        );
        return Err(RaffleError::UnauthorizedFulfiller.into());
    }

    match (round.phase, round.pending_request_id) {
        (RafflePhase::Closing, Some(pending)) if pending == request_id => {}
        (phase, pending) => {
            msg!(
                "Rejected fulfillment for request {}: phase={:?}, pending={:?}",
                request_id,
                phase,
                pending
            );
            return Err(RaffleError::UnknownRequest.into());
        }
    }

    let (index, winner) = payout::select_winner(&round.entrants, random_value)?;
    Ok(WinnerSelection {
        request_id,
        index,
        winner,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry_ledger;
    use crate::test_utils::{open_round, RecordingOracle};

    fn ready_round() -> Round {
        let mut round = open_round(100, 30);
        entry_ledger::record_entry(&mut round, Pubkey::new_unique(), 100).unwrap();
        round
    }

    #[test]
    fn request_closes_round_and_records_seed() {
        let mut round = ready_round();
        let mut oracle = RecordingOracle::default();

        let request_id = request_randomness(&mut round, 30, &mut oracle).unwrap();

        assert_eq!(request_id, 1);
        assert_eq!(round.phase(), RafflePhase::Closing);
        assert_eq!(round.pending_request_id(), Some(1));
        assert_eq!(round.last_close_timestamp(), 30);
        assert_eq!(oracle.seeds.len(), 1);
        assert_eq!(oracle.seeds[0].nonce, 1);
        assert_eq!(oracle.seeds[0].request_confirmations, REQUEST_CONFIRMATIONS);
        assert_eq!(oracle.seeds[0].num_words, NUM_WORDS);
        assert_eq!(oracle.seeds[0].callback_gas_limit, 500_000);
    }

    #[test]
    fn request_before_interval_is_rejected() {
        let mut round = ready_round();
        let before = round.clone();
        let mut oracle = RecordingOracle::default();

        assert_eq!(
            request_randomness(&mut round, 29, &mut oracle).unwrap_err(),
            RaffleError::UpkeepNotNeeded.into()
        );
        assert_eq!(round, before);
        assert!(oracle.seeds.is_empty());
    }

    #[test]
    fn second_request_while_closing_is_rejected() {
        let mut round = ready_round();
        let mut oracle = RecordingOracle::default();
        request_randomness(&mut round, 30, &mut oracle).unwrap();

        assert_eq!(
            request_randomness(&mut round, 1_000, &mut oracle).unwrap_err(),
            RaffleError::RoundNotOpen.into()
        );
        assert_eq!(round.pending_request_id(), Some(1));
        assert_eq!(oracle.seeds.len(), 1);
    }

    #[test]
    fn oracle_failure_leaves_round_open() {
        let mut round = ready_round();
        let before = round.clone();
        let mut oracle = RecordingOracle::failing();

        assert!(request_randomness(&mut round, 30, &mut oracle).is_err());
        assert_eq!(round, before);
    }

    #[test]
    fn fulfill_selects_by_modulo() {
        let mut round = open_round(100, 0);
        let players: Vec<Pubkey> = (0..4).map(|_| Pubkey::new_unique()).collect();
        for player in &players {
            entry_ledger::record_entry(&mut round, *player, 100).unwrap();
        }
        let oracle_key = *round.oracle();
        let request_id = request_randomness(&mut round, 0, &mut RecordingOracle::default()).unwrap();

        let selection = fulfill(&round, &oracle_key, request_id, 10).unwrap();

        assert_eq!(selection.index, 2);
        assert_eq!(selection.winner, players[2]);
        assert_eq!(selection.request_id, request_id);
        assert_eq!(
            payout::select_winner(round.entrants(), 10).unwrap(),
            (selection.index, selection.winner)
        );
    }

    #[test]
    fn fulfill_rejects_mismatched_request() {
        let mut round = ready_round();
        let oracle_key = *round.oracle();
        let request_id = request_randomness(&mut round, 30, &mut RecordingOracle::default()).unwrap();

        assert_eq!(
            fulfill(&round, &oracle_key, request_id + 1, 7).unwrap_err(),
            RaffleError::UnknownRequest.into()
        );
    }

    #[test]
    fn fulfill_rejects_open_round() {
        let round = ready_round();
        let oracle_key = *round.oracle();

        assert_eq!(
            fulfill(&round, &oracle_key, 0, 7).unwrap_err(),
            RaffleError::UnknownRequest.into()
        );
    }

    #[test]
    fn fulfill_rejects_untrusted_caller() {
        let mut round = ready_round();
        let request_id = request_randomness(&mut round, 30, &mut RecordingOracle::default()).unwrap();

        assert_eq!(
            fulfill(&round, &Pubkey::new_unique(), request_id, 7).unwrap_err(),
            RaffleError::UnauthorizedFulfiller.into()
        );
    }
}
