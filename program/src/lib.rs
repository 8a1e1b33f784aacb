// Upkeep Raffle
// A self-running raffle on Solana: entries, timed closing, oracle randomness and payout

// Round bookkeeping
pub mod entry_ledger;
pub mod payout;
pub mod raffle_state;
pub mod upkeep;
pub mod utils;

// Randomness and prices
pub mod price_feed;
pub mod vrf;

// Program surface
pub mod events;
pub mod raffle_error;
pub mod raffle_instruction;
pub mod raffle_machine;
pub mod raffle_processor;

#[cfg(not(feature = "no-entrypoint"))]
mod raffle_entrypoint;

#[cfg(test)]
mod test_utils;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    raffle_processor::Processor::process(program_id, accounts, instruction_data)
}
