// Upkeep Raffle - Utility Functions
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

/// Seed prefix of the round account
pub const RAFFLE_SEED: &[u8] = b"raffle";

/// Find the program derived address of the raffle run by `authority`
pub fn find_raffle_address(program_id: &Pubkey, authority: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[RAFFLE_SEED, authority.as_ref()], program_id)
}

/// Recreate the raffle address of `authority` from its stored bump seed
pub fn raffle_address_with_bump(
    program_id: &Pubkey,
    authority: &Pubkey,
    bump: u8,
) -> Result<Pubkey, ProgramError> {
    Pubkey::create_program_address(&[RAFFLE_SEED, authority.as_ref(), &[bump]], program_id)
        .map_err(|_| ProgramError::InvalidSeeds)
}

/// Random word used for winner selection: the first 8 bytes of the oracle
/// output, little endian
pub fn random_value_from_bytes(randomness: &[u8; 32]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&randomness[..8]);
    u64::from_le_bytes(bytes)
}

/// Oracle output whose random word is `value`
pub fn randomness_from_value(value: u64) -> [u8; 32] {
    let mut randomness = [0u8; 32];
    randomness[..8].copy_from_slice(&value.to_le_bytes());
    randomness
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1_000_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_word_reads_leading_bytes() {
        let mut randomness = [0xffu8; 32];
        randomness[..8].copy_from_slice(&7u64.to_le_bytes());

        assert_eq!(random_value_from_bytes(&randomness), 7);
        assert_eq!(random_value_from_bytes(&randomness_from_value(u64::MAX)), u64::MAX);
    }

    #[test]
    fn raffle_address_depends_on_authority() {
        let program_id = Pubkey::new_unique();
        let (first, _) = find_raffle_address(&program_id, &Pubkey::new_unique());
        let (second, _) = find_raffle_address(&program_id, &Pubkey::new_unique());

        assert_ne!(first, second);
    }

    #[test]
    fn stored_bump_recreates_the_raffle_address() {
        let program_id = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let (address, bump) = find_raffle_address(&program_id, &authority);

        assert_eq!(raffle_address_with_bump(&program_id, &authority, bump).unwrap(), address);
        assert_ne!(
            raffle_address_with_bump(&program_id, &Pubkey::new_unique(), bump).ok(),
            Some(address)
        );
    }
}
