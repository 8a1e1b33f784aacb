// Payout engine: winner selection and the pooled balance transfer
use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::entry_ledger;
use crate::raffle_error::RaffleError;
use crate::raffle_state::{RafflePhase, Round};

/// All-or-nothing value transfer. A failure must not have moved any funds.
pub trait ValueTransfer {
    fn transfer(&mut self, to: &Pubkey, amount: u64) -> ProgramResult;
}

/// Moves lamports out of the program-owned round account.
///
/// The recipient account has to be the winner picked by the round; anything
/// else is refused before balances change.
pub struct LamportTransfer<'a, 'b> {
    vault: &'a AccountInfo<'b>,
    recipient: &'a AccountInfo<'b>,
}

impl<'a, 'b> LamportTransfer<'a, 'b> {
    pub fn new(vault: &'a AccountInfo<'b>, recipient: &'a AccountInfo<'b>) -> Self {
        Self { vault, recipient }
    }
}

impl<'a, 'b> ValueTransfer for LamportTransfer<'a, 'b> {
    fn transfer(&mut self, to: &Pubkey, amount: u64) -> ProgramResult {
        if self.recipient.key != to {
            msg!("Recipient account {} is not the winner {}", self.recipient.key, to);
            return Err(ProgramError::InvalidArgument);
        }
        if !self.recipient.is_writable {
            msg!("Winner account must be writable");
            return Err(ProgramError::InvalidArgument);
        }

        let vault_lamports = self
            .vault
            .lamports()
            .checked_sub(amount)
            .ok_or(ProgramError::InsufficientFunds)?;
        let recipient_lamports = self
            .recipient
            .lamports()
            .checked_add(amount)
            .ok_or(RaffleError::AmountOverflow)?;

        **self.vault.try_borrow_mut_lamports()? = vault_lamports;
        **self.recipient.try_borrow_mut_lamports()? = recipient_lamports;
        Ok(())
    }
}

/// Result of a completed settlement
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub winner: Pubkey,
    pub amount: u64,
}

/// Position of the winning slot among `entrant_count` entries
pub fn winner_index(random_value: u64, entrant_count: usize) -> Result<usize, ProgramError> {
    if entrant_count == 0 {
        return Err(RaffleError::NoEntrants.into());
    }
    Ok((random_value % entrant_count as u64) as usize)
}

/// Winning slot and its entrant
pub fn select_winner(
    entrants: &[Pubkey],
    random_value: u64,
) -> Result<(usize, Pubkey), ProgramError> {
    let index = winner_index(random_value, entrants.len())?;
    Ok((index, entrants[index]))
}

/// Pay the pool to `winner` and reopen the round.
///
/// The transfer runs first; if it fails the round is left exactly as it was,
/// still closing on the same pending request, so the fulfillment can be
/// retried.
pub fn settle<T: ValueTransfer>(
    round: &mut Round,
    winner: Pubkey,
    transfer: &mut T,
) -> Result<Settlement, ProgramError> {
    if round.phase != RafflePhase::Closing {
        msg!("No pending request to settle");
        return Err(RaffleError::UnknownRequest.into());
    }

    let amount = round.pooled_balance;
    if let Err(err) = transfer.transfer(&winner, amount) {
        msg!("Payout of {} lamports to {} failed: {}", amount, winner, err);
        return Err(RaffleError::PayoutTransferFailed.into());
    }

    round.recent_winner = Some(winner);
    entry_ledger::reset(round);
    round.pending_request_id = None;
    round.phase = RafflePhase::Open;

    Ok(Settlement { winner, amount })
}
