// In-memory collaborators for unit tests
use solana_program::{entrypoint::ProgramResult, program_error::ProgramError, pubkey::Pubkey};

use crate::payout::ValueTransfer;
use crate::raffle_state::{RaffleConfig, Round};
use crate::vrf::{RandomnessOracle, RandomnessSeed};

pub fn open_round(entry_fee: u64, interval: u64) -> Round {
    let config = RaffleConfig {
        authority: Pubkey::new_unique(),
        oracle: Pubkey::new_unique(),
        entry_fee,
        interval,
        ..RaffleConfig::default()
    };
    Round::new(&config, 0, 255).unwrap()
}

/// Hands out ids 1, 2, 3... and keeps every seed it was given
#[derive(Default)]
pub struct RecordingOracle {
    pub seeds: Vec<RandomnessSeed>,
    pub fail: bool,
}

impl RecordingOracle {
    pub fn failing() -> Self {
        Self {
            seeds: Vec::new(),
            fail: true,
        }
    }
}

impl RandomnessOracle for RecordingOracle {
    fn request(&mut self, seed: &RandomnessSeed) -> Result<u64, ProgramError> {
        if self.fail {
            return Err(ProgramError::Custom(9_000));
        }
        self.seeds.push(*seed);
        Ok(self.seeds.len() as u64)
    }
}

/// Records payouts, or refuses all of them when `fail` is set
#[derive(Default)]
pub struct ScriptedTransfer {
    pub payouts: Vec<(Pubkey, u64)>,
    pub fail: bool,
}

impl ValueTransfer for ScriptedTransfer {
    fn transfer(&mut self, to: &Pubkey, amount: u64) -> ProgramResult {
        if self.fail {
            return Err(ProgramError::InsufficientFunds);
        }
        self.payouts.push((*to, amount));
        Ok(())
    }
}
