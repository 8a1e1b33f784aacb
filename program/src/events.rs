// Observable raffle events
//
// Each event goes out both as a readable log line and as a borsh-encoded
// data log, so indexers can follow rounds without reading account state.
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{log::sol_log_data, msg, pubkey::Pubkey};

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    /// A participant was added to the current round
    EntryAccepted { participant: Pubkey },
    /// The round closed and randomness was requested
    RandomnessRequested { request_id: u64 },
    /// The pool was paid out and the round reopened
    WinnerPicked { winner: Pubkey },
}

pub trait EventSink {
    fn emit(&mut self, event: RaffleEvent);
}

impl EventSink for Vec<RaffleEvent> {
    fn emit(&mut self, event: RaffleEvent) {
        self.push(event);
    }
}

/// Writes events to the program log
pub struct ProgramLog;

impl EventSink for ProgramLog {
    fn emit(&mut self, event: RaffleEvent) {
        msg!("Event: {:?}", event);
        match event.try_to_vec() {
            Ok(data) => sol_log_data(&[b"raffle_event", &data]),
            Err(err) => msg!("Failed to encode event: {}", err),
        }
    }
}
