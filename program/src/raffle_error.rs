use solana_program::{decode_error::DecodeError, msg, program_error::PrintProgramError, program_error::ProgramError};
use thiserror::Error;

/// Errors that may be returned by the raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstructionData,

    /// Entry amount does not match the round's entry fee
    #[error("Entry amount does not match the entry fee")]
    IncorrectFee,

    /// Round is settling, entries and closing are rejected
    #[error("Raffle round is not open")]
    RoundNotOpen,

    /// Closing attempted while the upkeep predicate is false
    #[error("Upkeep not needed")]
    UpkeepNotNeeded,

    /// Fulfillment does not match the pending randomness request
    #[error("Unknown randomness request")]
    UnknownRequest,

    /// Fulfillment signed by someone other than the trusted oracle
    #[error("Only the randomness oracle can fulfill requests")]
    UnauthorizedFulfiller,

    /// Transfer of the pooled balance to the winner did not succeed
    #[error("Payout transfer to the winner failed")]
    PayoutTransferFailed,

    /// Entrant lookup past the end of the current round
    #[error("Entrant index out of range")]
    IndexOutOfRange,

    /// Winner selection attempted on an empty round
    #[error("Round has no entrants")]
    NoEntrants,

    /// The round account has no free entrant slot left
    #[error("Round is full")]
    RoundFull,

    /// Raffle configuration rejected at construction
    #[error("Invalid raffle configuration")]
    InvalidConfig,

    /// Price feed answer is older than the accepted age
    #[error("Price feed answer is stale")]
    StalePrice,

    /// Price feed answer is zero, negative or not initialized
    #[error("Price feed answer is invalid")]
    InvalidPrice,

    /// Arithmetic on lamport amounts overflowed
    #[error("Amount overflow")]
    AmountOverflow,

    /// The round account was already initialized
    #[error("Raffle already initialized")]
    RaffleAlreadyInitialized,
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
