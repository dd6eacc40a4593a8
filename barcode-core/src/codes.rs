//! Unique code synthesis.
//!
//! Random modes draw characters uniformly from a fixed alphabet and reject
//! duplicates; sequential mode counts upward from a zero-padded start value.

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SheetError};

const DIGITS: &[u8] = b"0123456789";
const ALPHANUMERIC: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
// Printable ASCII without the space character.
const FULL_ASCII: &[u8] = b"!\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~";

/// Widest sequential code that still fits in a `u128` counter.
pub const MAX_SEQUENTIAL_WIDTH: usize = 38;

/// Most codes one run may request. Generated codes, placements and rendered
/// pages are all held for the whole run, so the count is capped up front.
pub const MAX_COUNT: usize = 100_000;

/// Rejects counts above [`MAX_COUNT`].
pub fn check_count(count: usize) -> Result<()> {
    if count > MAX_COUNT {
        return Err(SheetError::configuration(format!(
            "count must be at most {MAX_COUNT}, got {count}"
        )));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    RandomDigits,
    RandomAlphanumeric,
    RandomFullAscii,
    Sequential,
}

impl Mode {
    /// Alphabet sampled by the random modes. `None` for sequential.
    pub fn alphabet(self) -> Option<&'static [u8]> {
        match self {
            Mode::RandomDigits => Some(DIGITS),
            Mode::RandomAlphanumeric => Some(ALPHANUMERIC),
            Mode::RandomFullAscii => Some(FULL_ASCII),
            Mode::Sequential => None,
        }
    }

    pub fn is_random(self) -> bool {
        self.alphabet().is_some()
    }
}

/// Number of distinct codes of `length` characters over `alphabet_size`
/// symbols, or `None` when the value does not fit in a `u64` (treated as
/// unbounded by callers).
pub fn capacity(alphabet_size: usize, length: usize) -> Option<u64> {
    let length = u32::try_from(length).ok()?;
    (alphabet_size as u64).checked_pow(length)
}

/// Rejects a random-mode request that could never complete.
pub fn check_capacity(count: usize, mode: Mode, length: usize) -> Result<()> {
    let Some(alphabet) = mode.alphabet() else {
        return Ok(());
    };
    match capacity(alphabet.len(), length) {
        Some(cap) if count as u64 > cap => Err(SheetError::configuration(format!(
            "capacity exceeded: {count} codes requested but only {cap} distinct codes of length {length} exist"
        ))),
        _ => Ok(()),
    }
}

/// Generates `count` distinct codes using the thread-local RNG.
pub fn generate(
    count: usize,
    mode: Mode,
    length: usize,
    start_code: Option<&str>,
) -> Result<Vec<String>> {
    generate_with(&mut rand::rng(), count, mode, length, start_code)
}

/// Same as [`generate`] with an explicit entropy source.
pub fn generate_with<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    mode: Mode,
    length: usize,
    start_code: Option<&str>,
) -> Result<Vec<String>> {
    if length == 0 {
        return Err(SheetError::configuration("code length must be at least 1"));
    }
    check_count(count)?;
    match mode.alphabet() {
        Some(alphabet) => {
            check_capacity(count, mode, length)?;
            Ok(random_codes(rng, alphabet, count, length))
        }
        None => {
            let start = start_code.ok_or_else(|| {
                SheetError::configuration("sequential mode requires a start code")
            })?;
            sequential_codes(start, count, length)
        }
    }
}

fn random_codes<R: Rng + ?Sized>(
    rng: &mut R,
    alphabet: &[u8],
    count: usize,
    length: usize,
) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(count);
    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        let code: String = (0..length)
            .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
            .collect();
        if seen.insert(code.clone()) {
            out.push(code);
        }
    }
    out
}

fn sequential_codes(start: &str, count: usize, length: usize) -> Result<Vec<String>> {
    if length > MAX_SEQUENTIAL_WIDTH {
        return Err(SheetError::configuration(format!(
            "sequential codes are limited to {MAX_SEQUENTIAL_WIDTH} digits"
        )));
    }
    if start.len() != length || !start.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SheetError::configuration(format!(
            "start code must be exactly {length} digits, got {start:?}"
        )));
    }
    let first: u128 = start
        .parse()
        .map_err(|_| SheetError::configuration(format!("invalid start code {start:?}")))?;
    if count == 0 {
        return Ok(Vec::new());
    }
    // 10^length is at most 10^38 which still fits in u128.
    let limit = 10u128.pow(length as u32);
    let last = first + (count as u128 - 1);
    if last >= limit {
        return Err(SheetError::Overflow(format!(
            "sequence from {start} with {count} codes exceeds {length} digits"
        )));
    }
    Ok((first..=last)
        .map(|n| format!("{n:0width$}", width = length))
        .collect())
}
