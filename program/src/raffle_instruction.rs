use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use std::convert::TryInto;

use crate::price_feed::EntryFeeSource;
use crate::raffle_error::RaffleError;
use crate::utils::find_raffle_address;
use crate::vrf::RandomnessConfig;

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Create the round account and open the first round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The authority creating the raffle (pays for the round account)
    /// 1. `[writable]` The round account (PDA of ["raffle", authority])
    /// 2. `[]` The randomness oracle allowed to fulfill requests
    /// 3. `[]` The system program
    /// 4. `[]` (optional) Price feed account, required for a fiat entry fee
    InitializeRaffle {
        /// Fixed lamport fee or fiat cents converted at the feed price
        entry_fee: EntryFeeSource,
        /// Minimum seconds between round closings
        interval: u64,
        /// Parameters sent with each randomness request
        randomness: RandomnessConfig,
    },

    /// Enter the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The participant (pays the entry fee)
    /// 1. `[writable]` The round account
    /// 2. `[]` The system program
    EnterRaffle {
        /// Must equal the round's entry fee
        amount: u64,
    },

    /// Close the round and request randomness (anyone can trigger this)
    ///
    /// Accounts expected:
    /// 0. `[signer]` The trigger
    /// 1. `[writable]` The round account
    PerformUpkeep {},

    /// Deliver randomness for the pending request and pay the winner
    ///
    /// Accounts expected:
    /// 0. `[signer]` The randomness oracle
    /// 1. `[writable]` The round account
    /// 2. `[writable]` The winning entrant, entrants[random mod count]
    FulfillRandomness {
        /// Id of the pending request
        request_id: u64,
        /// Oracle output; the first 8 bytes are the random word
        randomness: [u8; 32],
    },

    /// Report whether the round can be closed, as one byte of return data
    ///
    /// Accounts expected:
    /// 0. `[]` The round account
    CheckUpkeep {},
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(RaffleError::InvalidInstructionData)?;

        Ok(match tag {
            0 => {
                let (fee_kind, rest) = Self::unpack_u8(rest)?;
                let (fee_value, rest) = Self::unpack_u64(rest)?;
                let entry_fee = match fee_kind {
                    0 => EntryFeeSource::Lamports(fee_value),
                    1 => EntryFeeSource::FiatCents(fee_value),
                    _ => return Err(RaffleError::InvalidInstructionData.into()),
                };
                let (interval, rest) = Self::unpack_u64(rest)?;
                let (key_hash, rest) = Self::unpack_fixed_bytes::<32>(rest)?;
                let (subscription_id, rest) = Self::unpack_u64(rest)?;
                let (callback_gas_limit, _) = Self::unpack_u32(rest)?;
                Self::InitializeRaffle {
                    entry_fee,
                    interval,
                    randomness: RandomnessConfig {
                        key_hash,
                        subscription_id,
                        callback_gas_limit,
                    },
                }
            }
            1 => {
                let (amount, _) = Self::unpack_u64(rest)?;
                Self::EnterRaffle { amount }
            }
            2 => Self::PerformUpkeep {},
            3 => {
                let (request_id, rest) = Self::unpack_u64(rest)?;
                let (randomness, _) = Self::unpack_fixed_bytes::<32>(rest)?;
                Self::FulfillRandomness {
                    request_id,
                    randomness,
                }
            }
            4 => Self::CheckUpkeep {},
            _ => return Err(RaffleError::InvalidInstructionData.into()),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match *self {
            Self::InitializeRaffle {
                entry_fee,
                interval,
                ref randomness,
            } => {
                buf.push(0);
                let (fee_kind, fee_value) = match entry_fee {
                    EntryFeeSource::Lamports(lamports) => (0u8, lamports),
                    EntryFeeSource::FiatCents(cents) => (1u8, cents),
                };
                buf.push(fee_kind);
                buf.extend_from_slice(&fee_value.to_le_bytes());
                buf.extend_from_slice(&interval.to_le_bytes());
                buf.extend_from_slice(&randomness.key_hash);
                buf.extend_from_slice(&randomness.subscription_id.to_le_bytes());
                buf.extend_from_slice(&randomness.callback_gas_limit.to_le_bytes());
            }
            Self::EnterRaffle { amount } => {
                buf.push(1);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::PerformUpkeep {} => buf.push(2),
            Self::FulfillRandomness {
                request_id,
                ref randomness,
            } => {
                buf.push(3);
                buf.extend_from_slice(&request_id.to_le_bytes());
                buf.extend_from_slice(randomness);
            }
            Self::CheckUpkeep {} => buf.push(4),
        }
        buf
    }

    fn unpack_u8(input: &[u8]) -> Result<(u8, &[u8]), ProgramError> {
        let (value, rest) = input
            .split_first()
            .ok_or(RaffleError::InvalidInstructionData)?;
        Ok((*value, rest))
    }

    fn unpack_u32(input: &[u8]) -> Result<(u32, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<4>(input)?;
        Ok((u32::from_le_bytes(bytes), rest))
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<8>(input)?;
        Ok((u64::from_le_bytes(bytes), rest))
    }

    fn unpack_fixed_bytes<const N: usize>(input: &[u8]) -> Result<([u8; N], &[u8]), ProgramError> {
        if input.len() < N {
            return Err(RaffleError::InvalidInstructionData.into());
        }
        let (bytes, rest) = input.split_at(N);
        let bytes: [u8; N] = bytes
            .try_into()
            .map_err(|_| RaffleError::InvalidInstructionData)?;
        Ok((bytes, rest))
    }
}

/// Create an initialize_raffle instruction
pub fn initialize_raffle(
    program_id: &Pubkey,
    authority: &Pubkey,
    oracle: &Pubkey,
    price_feed: Option<&Pubkey>,
    entry_fee: EntryFeeSource,
    interval: u64,
    randomness: RandomnessConfig,
) -> Instruction {
    let (round, _) = find_raffle_address(program_id, authority);
    let mut accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(round, false),
        AccountMeta::new_readonly(*oracle, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    if let Some(price_feed) = price_feed {
        accounts.push(AccountMeta::new_readonly(*price_feed, false));
    }

    Instruction {
        program_id: *program_id,
        accounts,
        data: RaffleInstruction::InitializeRaffle {
            entry_fee,
            interval,
            randomness,
        }
        .pack(),
    }
}

/// Create an enter_raffle instruction
pub fn enter_raffle(
    program_id: &Pubkey,
    participant: &Pubkey,
    authority: &Pubkey,
    amount: u64,
) -> Instruction {
    let (round, _) = find_raffle_address(program_id, authority);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*participant, true),
            AccountMeta::new(round, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::EnterRaffle { amount }.pack(),
    }
}

/// Create a perform_upkeep instruction
pub fn perform_upkeep(program_id: &Pubkey, trigger: &Pubkey, authority: &Pubkey) -> Instruction {
    let (round, _) = find_raffle_address(program_id, authority);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*trigger, true),
            AccountMeta::new(round, false),
        ],
        data: RaffleInstruction::PerformUpkeep {}.pack(),
    }
}

/// Create a fulfill_randomness instruction
pub fn fulfill_randomness(
    program_id: &Pubkey,
    oracle: &Pubkey,
    authority: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    randomness: [u8; 32],
) -> Instruction {
    let (round, _) = find_raffle_address(program_id, authority);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*oracle, true),
            AccountMeta::new(round, false),
            AccountMeta::new(*winner, false),
        ],
        data: RaffleInstruction::FulfillRandomness {
            request_id,
            randomness,
        }
        .pack(),
    }
}

/// Create a check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey, authority: &Pubkey) -> Instruction {
    let (round, _) = find_raffle_address(program_id, authority);
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(round, false)],
        data: RaffleInstruction::CheckUpkeep {}.pack(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_raffle_wire_format() {
        let instruction = RaffleInstruction::InitializeRaffle {
            entry_fee: EntryFeeSource::FiatCents(3_000),
            interval: 30,
            randomness: RandomnessConfig::default(),
        };
        let data = instruction.pack();

        assert_eq!(data.len(), 1 + 1 + 8 + 8 + 32 + 8 + 4);
        assert_eq!(data[0], 0);
        assert_eq!(data[1], 1);
        assert_eq!(RaffleInstruction::unpack(&data).unwrap(), instruction);
    }

    #[test]
    fn fulfill_carries_request_id_and_randomness() {
        let data = RaffleInstruction::FulfillRandomness {
            request_id: 5,
            randomness: [9u8; 32],
        }
        .pack();

        assert_eq!(data[0], 3);
        assert_eq!(&data[1..9], &5u64.to_le_bytes());
        assert_eq!(&data[9..], &[9u8; 32]);
    }

    #[test]
    fn truncated_or_unknown_data_is_rejected() {
        let invalid: ProgramError = RaffleError::InvalidInstructionData.into();

        assert_eq!(RaffleInstruction::unpack(&[]).unwrap_err(), invalid);
        assert_eq!(RaffleInstruction::unpack(&[1, 0, 0]).unwrap_err(), invalid);
        assert_eq!(RaffleInstruction::unpack(&[0, 2, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap_err(), invalid);
        assert_eq!(RaffleInstruction::unpack(&[42]).unwrap_err(), invalid);
    }
}
