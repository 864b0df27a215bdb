//! Battle replay codes.
//! Code format: `VB-<WORD><NN>`, e.g., VB-DOGE42, VB-MOON07
//!
//! A code names one seed below [`CODE_SPACE`]: the low six bits pick the word
//! and the remaining bits hold the two-digit number.

const CODE_PREFIX: &str = "VB";
const WORD_BITS: u32 = 6;
const WORD_MASK: u64 = (1 << WORD_BITS) - 1;
const NUMBER_SPAN: u64 = 100;

// Word list for replay codes
pub const WORD_LIST: [&str; 64] = [
    "DOGE", "PEPE", "MOON", "LAMBO", "WAGMI", "HODL", "PUMP", "DUMP", "APE", "DEGEN", "BONK",
    "SHIB", "FROG", "WOJAK", "CHAD", "COPE", "REKT", "GWEI", "MINT", "BURN", "STAKE", "YIELD",
    "VAULT", "POOL", "SWAP", "BRIDGE", "ORACLE", "LEDGER", "WHALE", "SHRIMP", "BULL", "BEAR",
    "CANDLE", "WICK", "DIP", "RALLY", "ROCKET", "GEM", "ALPHA", "BETA", "GAMMA", "DELTA", "SATS",
    "BLOCK", "CHAIN", "NODE", "GAS", "FORK", "AIRDROP", "SNIPE", "FOMO", "FUD", "NGMI", "GM",
    "GN", "SER", "ANON", "BASED", "JEET", "FLIP", "FARM", "RUG", "LOOT", "CLAIM",
];

const _: () = assert!(WORD_LIST.len() == 1 << WORD_BITS);

/// Number of seeds that have a replay code.
pub const CODE_SPACE: u64 = NUMBER_SPAN << WORD_BITS;

/// Render the replay code that names `seed`, if it has one.
#[must_use]
pub fn encode_friendly(seed: u64) -> Option<String> {
    if seed >= CODE_SPACE {
        return None;
    }
    let word = usize::try_from(seed & WORD_MASK)
        .ok()
        .and_then(|index| WORD_LIST.get(index))?;
    let number = seed >> WORD_BITS;
    Some(format!("{CODE_PREFIX}-{word}{number:02}"))
}

/// Decode a replay code back to its seed. Case-insensitive; anything that is
/// not a known word followed by exactly two digits is rejected.
#[must_use]
pub fn decode_to_seed(code: &str) -> Option<u64> {
    let (prefix, rest) = code.trim().split_once('-')?;
    if !prefix.eq_ignore_ascii_case(CODE_PREFIX) || !rest.is_ascii() {
        return None;
    }
    let split = rest.find(|c: char| c.is_ascii_digit())?;
    let (word, digits) = rest.split_at(split);
    if digits.len() != 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let number: u64 = digits.parse().ok()?;
    let index = WORD_LIST
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(word))?;
    Some((number << WORD_BITS) | u64::try_from(index).ok()?)
}
