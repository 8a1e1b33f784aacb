// Raffle state machine: sequences the ledger, scheduler, coordinator and payout engine
use solana_program::{
    clock::UnixTimestamp,
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::entry_ledger;
use crate::events::{EventSink, RaffleEvent};
use crate::payout::{self, Settlement, ValueTransfer};
use crate::raffle_state::Round;
use crate::upkeep;
use crate::vrf::{self, RandomnessOracle};

/// Drives one round through OPEN -> CLOSING -> OPEN.
///
/// Every operation either applies fully or returns an error with the round
/// unchanged. Phase checks take the place of locks: the runtime delivers one
/// invocation at a time.
pub struct RaffleMachine<'r, E: EventSink> {
    round: &'r mut Round,
    events: E,
}

impl<'r, E: EventSink> RaffleMachine<'r, E> {
    pub fn new(round: &'r mut Round, events: E) -> Self {
        Self { round, events }
    }

    pub fn round(&self) -> &Round {
        self.round
    }

    pub fn into_events(self) -> E {
        self.events
    }

    /// Accept one entry for exactly the entry fee while the round is open
    pub fn enter(&mut self, participant: Pubkey, amount: u64) -> ProgramResult {
        entry_ledger::record_entry(self.round, participant, amount)?;
        msg!(
            "Entry accepted from {}: {} entrants, pool {} lamports",
            participant,
            self.round.entrant_count(),
            self.round.pooled_balance()
        );
        self.events.emit(RaffleEvent::EntryAccepted { participant });
        Ok(())
    }

    pub fn check_upkeep(&self, now: UnixTimestamp) -> bool {
        upkeep::is_upkeep_needed(self.round, now)
    }

    /// Close the round and request randomness; returns the request id
    pub fn perform_upkeep<O: RandomnessOracle>(
        &mut self,
        now: UnixTimestamp,
        oracle: &mut O,
    ) -> Result<u64, ProgramError> {
        let request_id = vrf::request_randomness(self.round, now, oracle)?;
        msg!(
            "Round closed with {} entrants, awaiting request {}",
            self.round.entrant_count(),
            request_id
        );
        self.events.emit(RaffleEvent::RandomnessRequested { request_id });
        Ok(request_id)
    }

    /// Consume the oracle's answer for the pending request and pay the winner
    pub fn fulfill<T: ValueTransfer>(
        &mut self,
        caller: &Pubkey,
        request_id: u64,
        random_value: u64,
        transfer: &mut T,
    ) -> Result<Settlement, ProgramError> {
        let selection = vrf::fulfill(self.round, caller, request_id, random_value)?;
        msg!(
            "Request {} picked slot {} of {}: {}",
            request_id,
            selection.index,
            self.round.entrant_count(),
            selection.winner
        );

        let settlement = payout::settle(self.round, selection.winner, transfer)?;
        msg!(
            "Paid {} lamports to {}, round reopened",
            settlement.amount,
            settlement.winner
        );
        self.events.emit(RaffleEvent::WinnerPicked {
            winner: settlement.winner,
        });
        Ok(settlement)
    }
}
