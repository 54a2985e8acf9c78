//! Promotion code string generation.
//!
//! Batch codes look like `SUMMER3_48213` (prefix, 1-based index, five random
//! digits); single generated codes look like `VIP_7KQ2M9XA`. Uniqueness is not
//! checked locally, Stripe rejects a code that is already active.

use uuid::Uuid;

const DEFAULT_BATCH_PREFIX: &str = "PROMO";
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 8;

/// Small splitmix64 generator. Not cryptographic, only needs to spread codes.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    state: u64,
}

impl CodeGenerator {
    pub fn from_entropy() -> Self {
        let bits = Uuid::new_v4().as_u128();
        Self::seeded((bits >> 64) as u64 ^ bits as u64)
    }

    pub fn seeded(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }

    /// `UPPER(prefix) + index + "_" + 5 digits`, prefix defaulting to `PROMO`.
    pub fn batch_code(&mut self, prefix: Option<&str>, index: usize) -> String {
        let prefix = match prefix.map(str::trim) {
            Some(p) if !p.is_empty() => p.to_uppercase(),
            _ => DEFAULT_BATCH_PREFIX.to_string(),
        };
        format!("{}{}_{:05}", prefix, index, self.below(100_000))
    }

    /// `UPPER(prefix) + "_" + 8 chars of [A-Z0-9]`.
    pub fn single_code(&mut self, prefix: &str) -> String {
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| CODE_ALPHABET[self.below(CODE_ALPHABET.len() as u64) as usize] as char)
            .collect();
        format!("{}_{}", prefix.trim().to_uppercase(), suffix)
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}
