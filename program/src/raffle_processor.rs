use crate::events::ProgramLog;
use crate::payout::LamportTransfer;
use crate::price_feed::{self, AggregatorFeed, EntryFeeSource, PriceFeed};
use crate::raffle_error::RaffleError;
use crate::raffle_instruction::RaffleInstruction;
use crate::raffle_machine::RaffleMachine;
use crate::raffle_state::{RaffleConfig, Round};
use crate::upkeep;
use crate::utils::{self, RAFFLE_SEED};
use crate::vrf::{LoggedRequestOracle, RandomnessConfig};

use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack},
    pubkey::Pubkey,
    system_instruction,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeRaffle {
                entry_fee,
                interval,
                randomness,
            } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(accounts, entry_fee, interval, randomness, program_id)
            }
            RaffleInstruction::EnterRaffle { amount } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(accounts, amount, program_id)
            }
            RaffleInstruction::PerformUpkeep {} => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(accounts, program_id)
            }
            RaffleInstruction::FulfillRandomness {
                request_id,
                randomness,
            } => {
                msg!("Instruction: Fulfill Randomness");
                Self::process_fulfill_randomness(accounts, request_id, randomness, program_id)
            }
            RaffleInstruction::CheckUpkeep {} => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(accounts, program_id)
            }
        }
    }

    /// Create the round account for `authority` and open the first round.
    ///
    /// A fiat entry fee is converted to lamports here, once.
    fn process_initialize_raffle(
        accounts: &[AccountInfo],
        entry_fee: EntryFeeSource,
        interval: u64,
        randomness: RandomnessConfig,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let round_info = next_account_info(account_info_iter)?;
        let oracle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;
        let price_feed_info = next_account_info(account_info_iter).ok();

        if !authority_info.is_signer {
            msg!("Authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (expected_round_pubkey, bump_seed) =
            utils::find_raffle_address(program_id, authority_info.key);
        if *round_info.key != expected_round_pubkey {
            msg!("Invalid round account address");
            return Err(ProgramError::InvalidArgument);
        }

        if round_info.owner == program_id {
            let existing = Round::unpack_unchecked(&round_info.data.borrow())?;
            if existing.is_initialized() {
                msg!("Round account is already initialized");
                return Err(RaffleError::RaffleAlreadyInitialized.into());
            }
        }

        let now = Clock::get()?.unix_timestamp;
        let feed = price_feed_info
            .map(|info| AggregatorFeed::from_account_info(info, now))
            .transpose()?;
        let entry_fee = price_feed::resolve_entry_fee(
            entry_fee,
            feed.as_ref().map(|feed| feed as &dyn PriceFeed),
        )?;

        let config = RaffleConfig {
            authority: *authority_info.key,
            oracle: *oracle_info.key,
            entry_fee,
            interval,
            randomness,
            price_feed: price_feed_info.map(|info| *info.key),
        };
        let round = Round::new(&config, now, bump_seed)?;

        if round_info.owner != program_id {
            Self::create_round_account(
                authority_info,
                round_info,
                system_program_info,
                &[RAFFLE_SEED, authority_info.key.as_ref(), &[bump_seed]],
                program_id,
            )?;
        }

        Round::pack(round, &mut round_info.data.borrow_mut())?;

        msg!(
            "Raffle initialized: Oracle={}, EntryFee={} lamports ({} SOL), Interval={}s",
            oracle_info.key,
            entry_fee,
            utils::lamports_to_sol(entry_fee),
            interval
        );
        Ok(())
    }

    fn process_enter_raffle(
        accounts: &[AccountInfo],
        amount: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let participant_info = next_account_info(account_info_iter)?;
        let round_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !participant_info.is_signer {
            msg!("Participant must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut round = Self::load_round(round_info, program_id)?;
        RaffleMachine::new(&mut round, ProgramLog).enter(*participant_info.key, amount)?;

        invoke(
            &system_instruction::transfer(participant_info.key, round_info.key, amount),
            &[
                participant_info.clone(),
                round_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        Round::pack(round, &mut round_info.data.borrow_mut())?;
        Ok(())
    }

    /// Anyone may trigger upkeep; eligibility is checked by the round itself
    fn process_perform_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let trigger_info = next_account_info(account_info_iter)?;
        let round_info = next_account_info(account_info_iter)?;

        if !trigger_info.is_signer {
            msg!("Trigger must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut round = Self::load_round(round_info, program_id)?;
        let now = Clock::get()?.unix_timestamp;
        RaffleMachine::new(&mut round, ProgramLog)
            .perform_upkeep(now, &mut LoggedRequestOracle)?;

        Round::pack(round, &mut round_info.data.borrow_mut())?;
        Ok(())
    }

    fn process_fulfill_randomness(
        accounts: &[AccountInfo],
        request_id: u64,
        randomness: [u8; 32],
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let oracle_info = next_account_info(account_info_iter)?;
        let round_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        if !oracle_info.is_signer {
            msg!("Oracle must sign the fulfillment");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut round = Self::load_round(round_info, program_id)?;
        let random_value = utils::random_value_from_bytes(&randomness);
        let mut transfer = LamportTransfer::new(round_info, winner_info);
        RaffleMachine::new(&mut round, ProgramLog).fulfill(
            oracle_info.key,
            request_id,
            random_value,
            &mut transfer,
        )?;

        Round::pack(round, &mut round_info.data.borrow_mut())?;
        Ok(())
    }

    fn process_check_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let round_info = next_account_info(account_info_iter)?;

        let round = Self::load_round(round_info, program_id)?;
        let now = Clock::get()?.unix_timestamp;
        let check = upkeep::check_upkeep(&round, now);

        msg!(
            "Upkeep needed: {} (open={}, interval_elapsed={}, entrants={}, balance={})",
            check.is_needed(),
            check.is_open,
            check.interval_elapsed,
            round.entrant_count(),
            round.pooled_balance()
        );
        set_return_data(&[check.is_needed() as u8]);
        Ok(())
    }

    /// Allocate the round account at its PDA and hand it to this program.
    ///
    /// The address is public, so it may already hold lamports; in that case
    /// `create_account` would fail and the account is topped up, allocated
    /// and assigned instead.
    fn create_round_account<'a>(
        payer_info: &AccountInfo<'a>,
        round_info: &AccountInfo<'a>,
        system_program_info: &AccountInfo<'a>,
        signer_seeds: &[&[u8]],
        program_id: &Pubkey,
    ) -> ProgramResult {
        let rent = Rent::get()?;
        let required_lamports = rent.minimum_balance(Round::LEN);

        if round_info.lamports() == 0 {
            msg!("Creating round account");
            return invoke_signed(
                &system_instruction::create_account(
                    payer_info.key,
                    round_info.key,
                    required_lamports,
                    Round::LEN as u64,
                    program_id,
                ),
                &[
                    payer_info.clone(),
                    round_info.clone(),
                    system_program_info.clone(),
                ],
                &[signer_seeds],
            );
        }

        msg!(
            "Round address already holds {} lamports, allocating in place",
            round_info.lamports()
        );
        let top_up = required_lamports.saturating_sub(round_info.lamports());
        if top_up > 0 {
            invoke(
                &system_instruction::transfer(payer_info.key, round_info.key, top_up),
                &[
                    payer_info.clone(),
                    round_info.clone(),
                    system_program_info.clone(),
                ],
            )?;
        }
        invoke_signed(
            &system_instruction::allocate(round_info.key, Round::LEN as u64),
            &[round_info.clone(), system_program_info.clone()],
            &[signer_seeds],
        )?;
        invoke_signed(
            &system_instruction::assign(round_info.key, program_id),
            &[round_info.clone(), system_program_info.clone()],
            &[signer_seeds],
        )
    }

    /// Read the round and check it sits at the address its bump seed derives
    fn load_round(round_info: &AccountInfo, program_id: &Pubkey) -> Result<Round, ProgramError> {
        if round_info.owner != program_id {
            msg!("Round account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }
        let round = Round::unpack(&round_info.data.borrow())?;

        let expected =
            utils::raffle_address_with_bump(program_id, round.authority(), round.bump())?;
        if *round_info.key != expected {
            msg!(
                "Round account {} is not the raffle address {} of {}",
                round_info.key,
                expected,
                round.authority()
            );
            return Err(ProgramError::InvalidArgument);
        }
        Ok(round)
    }
}
