// Price oracle adapter: SOL price in fiat cents, read once when a raffle is created
use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::{
    account_info::AccountInfo,
    clock::UnixTimestamp,
    msg,
    native_token::LAMPORTS_PER_SOL,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
};

use crate::raffle_error::RaffleError;

/// Maximum age of a price answer in seconds
pub const MAX_PRICE_AGE_SECONDS: i64 = 3600;

/// Cents have two decimals
const CENT_DECIMALS: i32 = 2;

/// Where the entry fee of a new raffle comes from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryFeeSource {
    /// Fixed fee in lamports
    Lamports(u64),
    /// Fiat amount in cents, converted at the current SOL price
    FiatCents(u64),
}

pub trait PriceFeed {
    /// Current price of one SOL in fiat cents
    fn current_price(&self) -> Result<u64, ProgramError>;
}

/// Aggregator answer as stored in the price feed account
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AggregatorAnswer {
    pub is_initialized: bool,
    /// Decimals of `answer`
    pub decimals: u8,
    /// Price of one SOL scaled by 10^decimals
    pub answer: i64,
    /// When the answer was last updated
    pub updated_at: UnixTimestamp,
}

impl Sealed for AggregatorAnswer {}

impl IsInitialized for AggregatorAnswer {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for AggregatorAnswer {
    const LEN: usize = 1 + 1 + 8 + 8;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, AggregatorAnswer::LEN];
        let (is_initialized, decimals, answer, updated_at) = array_refs![src, 1, 1, 8, 8];

        Ok(AggregatorAnswer {
            is_initialized: is_initialized[0] != 0,
            decimals: decimals[0],
            answer: i64::from_le_bytes(*answer),
            updated_at: UnixTimestamp::from_le_bytes(*updated_at),
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, AggregatorAnswer::LEN];
        let (is_initialized_dst, decimals_dst, answer_dst, updated_at_dst) =
            mut_array_refs![dst, 1, 1, 8, 8];

        is_initialized_dst[0] = self.is_initialized as u8;
        decimals_dst[0] = self.decimals;
        *answer_dst = self.answer.to_le_bytes();
        *updated_at_dst = self.updated_at.to_le_bytes();
    }
}

/// Reads an aggregator answer and enforces freshness at `now`
pub struct AggregatorFeed {
    answer: AggregatorAnswer,
    now: UnixTimestamp,
}

impl AggregatorFeed {
    pub fn new(answer: AggregatorAnswer, now: UnixTimestamp) -> Self {
        Self { answer, now }
    }

    pub fn from_account_info(info: &AccountInfo, now: UnixTimestamp) -> Result<Self, ProgramError> {
        let data = info.try_borrow_data()?;
        if data.len() < AggregatorAnswer::LEN {
            msg!("Price feed account {} is too small", info.key);
            return Err(RaffleError::InvalidPrice.into());
        }
        let answer = AggregatorAnswer::unpack_from_slice(&data[..AggregatorAnswer::LEN])?;
        Ok(Self::new(answer, now))
    }
}

impl PriceFeed for AggregatorFeed {
    fn current_price(&self) -> Result<u64, ProgramError> {
        if !self.answer.is_initialized || self.answer.answer <= 0 {
            msg!("Price feed answer {} is not usable", self.answer.answer);
            return Err(RaffleError::InvalidPrice.into());
        }

        let age = self.now.saturating_sub(self.answer.updated_at);
        if age > MAX_PRICE_AGE_SECONDS {
            msg!("Price feed answer is {}s old, limit {}s", age, MAX_PRICE_AGE_SECONDS);
            return Err(RaffleError::StalePrice.into());
        }

        normalize_to_cents(self.answer.answer, self.answer.decimals)
    }
}

/// Rescale a `decimals`-precision answer to cents
pub fn normalize_to_cents(answer: i64, decimals: u8) -> Result<u64, ProgramError> {
    let answer = u128::try_from(answer).map_err(|_| RaffleError::InvalidPrice)?;
    let shift = CENT_DECIMALS - decimals as i32;
    let scale = 10u128
        .checked_pow(shift.unsigned_abs())
        .ok_or(RaffleError::AmountOverflow)?;
    let cents = if shift >= 0 {
        answer.checked_mul(scale).ok_or(RaffleError::AmountOverflow)?
    } else {
        answer / scale
    };

    if cents == 0 {
        return Err(RaffleError::InvalidPrice.into());
    }
    u64::try_from(cents).map_err(|_| RaffleError::AmountOverflow.into())
}

/// Lamports worth `fiat_cents` at `price_cents` per SOL, rounded down
pub fn lamports_for_fiat_cents(fiat_cents: u64, price_cents: u64) -> Result<u64, ProgramError> {
    if price_cents == 0 {
        return Err(RaffleError::InvalidPrice.into());
    }
    let lamports = (fiat_cents as u128)
        .checked_mul(LAMPORTS_PER_SOL as u128)
        .ok_or(RaffleError::AmountOverflow)?
        / price_cents as u128;
    u64::try_from(lamports).map_err(|_| RaffleError::AmountOverflow.into())
}

/// Fix the entry fee in lamports. The feed is only consulted for fiat fees.
pub fn resolve_entry_fee(
    source: EntryFeeSource,
    feed: Option<&dyn PriceFeed>,
) -> Result<u64, ProgramError> {
    match source {
        EntryFeeSource::Lamports(lamports) => Ok(lamports),
        EntryFeeSource::FiatCents(cents) => {
            let feed = feed.ok_or_else(|| {
                msg!("A price feed account is required for a fiat entry fee");
                ProgramError::NotEnoughAccountKeys
            })?;
            let price_cents = feed.current_price()?;
            let lamports = lamports_for_fiat_cents(cents, price_cents)?;
            msg!(
                "Entry fee of {} cents at {} cents/SOL is {} lamports",
                cents,
                price_cents,
                lamports
            );
            Ok(lamports)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(answer: i64, decimals: u8, updated_at: UnixTimestamp) -> AggregatorAnswer {
        AggregatorAnswer {
            is_initialized: true,
            decimals,
            answer,
            updated_at,
        }
    }

    #[test]
    fn eight_decimal_answer_is_rescaled_to_cents() {
        let feed = AggregatorFeed::new(answer(2_000_00000000, 8, 100), 100);
        assert_eq!(feed.current_price().unwrap(), 200_000);
    }

    #[test]
    fn thirty_dollars_at_two_thousand_is_fifteen_thousandths_sol() {
        let feed = AggregatorFeed::new(answer(2_000_00000000, 8, 100), 100);

        let fee = resolve_entry_fee(EntryFeeSource::FiatCents(3_000), Some(&feed)).unwrap();

        assert_eq!(fee, 15_000_000);
    }

    #[test]
    fn lamport_fee_ignores_feed() {
        assert_eq!(resolve_entry_fee(EntryFeeSource::Lamports(100), None).unwrap(), 100);
    }

    #[test]
    fn fiat_fee_without_feed_fails() {
        assert_eq!(
            resolve_entry_fee(EntryFeeSource::FiatCents(3_000), None).unwrap_err(),
            ProgramError::NotEnoughAccountKeys
        );
    }

    #[test]
    fn stale_answer_is_rejected() {
        let feed = AggregatorFeed::new(answer(2_000_00000000, 8, 0), MAX_PRICE_AGE_SECONDS + 1);
        assert_eq!(feed.current_price().unwrap_err(), RaffleError::StalePrice.into());
    }

    #[test]
    fn non_positive_answer_is_rejected() {
        for value in [0, -5] {
            let feed = AggregatorFeed::new(answer(value, 8, 10), 10);
            assert_eq!(feed.current_price().unwrap_err(), RaffleError::InvalidPrice.into());
        }
    }

    #[test]
    fn low_precision_answer_is_scaled_up() {
        assert_eq!(normalize_to_cents(2_000, 0).unwrap(), 200_000);
        assert_eq!(normalize_to_cents(1, 8).unwrap_err(), RaffleError::InvalidPrice.into());
    }

    #[test]
    fn answer_survives_the_account_layout() {
        let stored = answer(1_234_56, 2, 77);
        let mut data = [0u8; AggregatorAnswer::LEN];
        AggregatorAnswer::pack(stored, &mut data).unwrap();

        assert_eq!(AggregatorAnswer::unpack(&data).unwrap(), stored);
    }
}
