use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::{
    clock::UnixTimestamp,
    msg,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
};
use std::convert::TryFrom;

use crate::raffle_error::RaffleError;
use crate::vrf::RandomnessConfig;

/// Maximum number of entry slots a round account can hold
pub const MAX_ENTRANTS: usize = 256;

const ENTRANTS_SPACE: usize = 32 * MAX_ENTRANTS;
const HEADER_LEN: usize =
    1 + 32 + 32 + 1 + 8 + 8 + 8 + 8 + 1 + 8 + 8 + 1 + 32 + 32 + 8 + 4 + 1 + 32 + 1 + 4;

/// Phase of the current round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RafflePhase {
    /// Accepting entries
    Open,
    /// Randomness requested, settlement pending
    Closing,
}

impl TryFrom<u8> for RafflePhase {
    type Error = &'static str;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(RafflePhase::Open),
            1 => Ok(RafflePhase::Closing),
            _ => Err("Invalid raffle phase"),
        }
    }
}

impl From<RafflePhase> for u8 {
    fn from(phase: RafflePhase) -> Self {
        match phase {
            RafflePhase::Open => 0,
            RafflePhase::Closing => 1,
        }
    }
}

/// Construction-time configuration of a raffle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Operator that created the raffle; seeds the round address
    pub authority: Pubkey,
    /// The only key allowed to deliver randomness
    pub oracle: Pubkey,
    /// Entry fee in lamports
    pub entry_fee: u64,
    /// Minimum seconds between round closings
    pub interval: u64,
    /// Parameters sent with every randomness request
    pub randomness: RandomnessConfig,
    /// Aggregator the entry fee was priced from, if it was given in fiat
    pub price_feed: Option<Pubkey>,
}

impl Default for RaffleConfig {
    fn default() -> Self {
        // Development values: 30 second rounds, 0.015 SOL (~30 USD at 2000 USD/SOL)
        Self {
            authority: Pubkey::default(),
            oracle: Pubkey::default(),
            entry_fee: 15_000_000,
            interval: 30,
            randomness: RandomnessConfig::default(),
            price_feed: None,
        }
    }
}

/// The raffle round aggregate.
///
/// Mutation happens only through the entry ledger, the randomness
/// coordinator and the payout engine; everything else reads through the
/// accessors below.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round {
    pub(crate) is_initialized: bool,
    pub(crate) authority: Pubkey,
    pub(crate) oracle: Pubkey,
    pub(crate) phase: RafflePhase,
    pub(crate) entry_fee: u64,
    pub(crate) interval: u64,
    pub(crate) last_close_timestamp: UnixTimestamp,
    pub(crate) pooled_balance: u64,
    pub(crate) pending_request_id: Option<u64>,
    /// Last request nonce handed to the oracle, strictly increasing
    pub(crate) request_nonce: u64,
    pub(crate) recent_winner: Option<Pubkey>,
    pub(crate) randomness: RandomnessConfig,
    pub(crate) price_feed: Option<Pubkey>,
    pub(crate) bump: u8,
    pub(crate) entrants: Vec<Pubkey>,
}

impl Round {
    /// Create an open, empty round from the given configuration
    pub fn new(config: &RaffleConfig, now: UnixTimestamp, bump: u8) -> Result<Self, ProgramError> {
        if config.entry_fee == 0 {
            msg!("Entry fee must be greater than zero");
            return Err(RaffleError::InvalidConfig.into());
        }

        Ok(Self {
            is_initialized: true,
            authority: config.authority,
            oracle: config.oracle,
            phase: RafflePhase::Open,
            entry_fee: config.entry_fee,
            interval: config.interval,
            last_close_timestamp: now,
            pooled_balance: 0,
            pending_request_id: None,
            request_nonce: 0,
            recent_winner: None,
            randomness: config.randomness,
            price_feed: config.price_feed,
            bump,
            entrants: Vec::new(),
        })
    }

    pub fn authority(&self) -> &Pubkey {
        &self.authority
    }

    pub fn oracle(&self) -> &Pubkey {
        &self.oracle
    }

    pub fn phase(&self) -> RafflePhase {
        self.phase
    }

    pub fn entry_fee(&self) -> u64 {
        self.entry_fee
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn last_close_timestamp(&self) -> UnixTimestamp {
        self.last_close_timestamp
    }

    pub fn pooled_balance(&self) -> u64 {
        self.pooled_balance
    }

    pub fn pending_request_id(&self) -> Option<u64> {
        self.pending_request_id
    }

    pub fn recent_winner(&self) -> Option<Pubkey> {
        self.recent_winner
    }

    pub fn randomness(&self) -> &RandomnessConfig {
        &self.randomness
    }

    pub fn price_feed(&self) -> Option<Pubkey> {
        self.price_feed
    }

    pub fn bump(&self) -> u8 {
        self.bump
    }

    pub fn entrant_count(&self) -> usize {
        self.entrants.len()
    }

    pub fn entrants(&self) -> &[Pubkey] {
        &self.entrants
    }

    /// Entrant at `index` in entry order
    pub fn entrant(&self, index: usize) -> Result<Pubkey, ProgramError> {
        self.entrants
            .get(index)
            .copied()
            .ok_or_else(|| RaffleError::IndexOutOfRange.into())
    }
}

impl Sealed for Round {}

impl IsInitialized for Round {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for Round {
    const LEN: usize = HEADER_LEN + ENTRANTS_SPACE;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, Round::LEN];
        let (
            is_initialized,
            authority,
            oracle,
            phase,
            entry_fee,
            interval,
            last_close_timestamp,
            pooled_balance,
            has_pending_request,
            pending_request_id,
            request_nonce,
            has_recent_winner,
            recent_winner,
            key_hash,
            subscription_id,
            callback_gas_limit,
            has_price_feed,
            price_feed,
            bump,
            entrant_count,
            entrants,
        ) = array_refs![
            src, 1, 32, 32, 1, 8, 8, 8, 8, 1, 8, 8, 1, 32, 32, 8, 4, 1, 32, 1, 4, ENTRANTS_SPACE
        ];

        let phase = RafflePhase::try_from(phase[0]).map_err(|_| ProgramError::InvalidAccountData)?;

        let entrant_count = u32::from_le_bytes(*entrant_count) as usize;
        if entrant_count > MAX_ENTRANTS {
            return Err(ProgramError::InvalidAccountData);
        }
        let entrants = entrants
            .chunks_exact(32)
            .take(entrant_count)
            .map(|chunk| {
                let mut key = [0u8; 32];
                key.copy_from_slice(chunk);
                Pubkey::new_from_array(key)
            })
            .collect();

        Ok(Round {
            is_initialized: is_initialized[0] != 0,
            authority: Pubkey::new_from_array(*authority),
            oracle: Pubkey::new_from_array(*oracle),
            phase,
            entry_fee: u64::from_le_bytes(*entry_fee),
            interval: u64::from_le_bytes(*interval),
            last_close_timestamp: UnixTimestamp::from_le_bytes(*last_close_timestamp),
            pooled_balance: u64::from_le_bytes(*pooled_balance),
            pending_request_id: if has_pending_request[0] != 0 {
                Some(u64::from_le_bytes(*pending_request_id))
            } else {
                None
            },
            request_nonce: u64::from_le_bytes(*request_nonce),
            recent_winner: if has_recent_winner[0] != 0 {
                Some(Pubkey::new_from_array(*recent_winner))
            } else {
                None
            },
            randomness: RandomnessConfig {
                key_hash: *key_hash,
                subscription_id: u64::from_le_bytes(*subscription_id),
                callback_gas_limit: u32::from_le_bytes(*callback_gas_limit),
            },
            price_feed: if has_price_feed[0] != 0 {
                Some(Pubkey::new_from_array(*price_feed))
            } else {
                None
            },
            bump: bump[0],
            entrants,
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Round::LEN];
        let (
            is_initialized_dst,
            authority_dst,
            oracle_dst,
            phase_dst,
            entry_fee_dst,
            interval_dst,
            last_close_timestamp_dst,
            pooled_balance_dst,
            has_pending_request_dst,
            pending_request_id_dst,
            request_nonce_dst,
            has_recent_winner_dst,
            recent_winner_dst,
            key_hash_dst,
            subscription_id_dst,
            callback_gas_limit_dst,
            has_price_feed_dst,
            price_feed_dst,
            bump_dst,
            entrant_count_dst,
            entrants_dst,
        ) = mut_array_refs![
            dst, 1, 32, 32, 1, 8, 8, 8, 8, 1, 8, 8, 1, 32, 32, 8, 4, 1, 32, 1, 4, ENTRANTS_SPACE
        ];

        is_initialized_dst[0] = self.is_initialized as u8;
        authority_dst.copy_from_slice(self.authority.as_ref());
        oracle_dst.copy_from_slice(self.oracle.as_ref());
        phase_dst[0] = self.phase.into();
        *entry_fee_dst = self.entry_fee.to_le_bytes();
        *interval_dst = self.interval.to_le_bytes();
        *last_close_timestamp_dst = self.last_close_timestamp.to_le_bytes();
        *pooled_balance_dst = self.pooled_balance.to_le_bytes();
        has_pending_request_dst[0] = self.pending_request_id.is_some() as u8;
        *pending_request_id_dst = self.pending_request_id.unwrap_or_default().to_le_bytes();
        *request_nonce_dst = self.request_nonce.to_le_bytes();
        has_recent_winner_dst[0] = self.recent_winner.is_some() as u8;
        recent_winner_dst.copy_from_slice(self.recent_winner.unwrap_or_default().as_ref());
        key_hash_dst.copy_from_slice(&self.randomness.key_hash);
        *subscription_id_dst = self.randomness.subscription_id.to_le_bytes();
        *callback_gas_limit_dst = self.randomness.callback_gas_limit.to_le_bytes();
        has_price_feed_dst[0] = self.price_feed.is_some() as u8;
        price_feed_dst.copy_from_slice(self.price_feed.unwrap_or_default().as_ref());
        bump_dst[0] = self.bump;

        // The ledger caps entrants at MAX_ENTRANTS, so the count always fits
        *entrant_count_dst = (self.entrants.len() as u32).to_le_bytes();
        entrants_dst.fill(0);
        for (slot, entrant) in entrants_dst.chunks_exact_mut(32).zip(self.entrants.iter()) {
            slot.copy_from_slice(entrant.as_ref());
        }
    }
}
