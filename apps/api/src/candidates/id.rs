//! Candidate id generation: `{FI}-{LA}-{suffix}-{YYYYmmddHHMMSS}`.
//!
//! Uniqueness is probabilistic. Two candidates with the same initials and
//! phone suffix registered within the same second collide.

use chrono::NaiveDateTime;
use rand::Rng;

/// Last name used when the full name has a single token.
pub const UNKNOWN_LAST_NAME: &str = "Unknown";

const SUFFIX_LEN: usize = 4;

/// Splits on whitespace: first token is the first name, the rest joined with
/// a space is the last name. `None` for a blank name.
pub fn split_full_name(full_name: &str) -> Option<(String, String)> {
    let mut tokens = full_name.split_whitespace();
    let first = tokens.next()?.to_string();
    let rest: Vec<&str> = tokens.collect();
    let last = if rest.is_empty() {
        UNKNOWN_LAST_NAME.to_string()
    } else {
        rest.join(" ")
    };
    Some((first, last))
}

/// First two characters, uppercased. Characters that cannot appear in an
/// artifact key are replaced with `X`.
fn initials(name: &str) -> String {
    name.chars()
        .take(2)
        .flat_map(char::to_uppercase)
        .map(|c| if c.is_alphanumeric() { c } else { 'X' })
        .collect()
}

/// Last four digits of the phone number, or all of them if it has fewer.
/// `None` when the phone contains no digits.
pub fn phone_suffix(phone: &str) -> Option<String> {
    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let start = digits.len().saturating_sub(SUFFIX_LEN);
    Some(digits[start..].iter().collect())
}

pub fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Builds a candidate id. Returns `None` when `full_name` is blank.
pub fn generate_candidate_id<R: Rng + ?Sized>(
    full_name: &str,
    phone: &str,
    now: NaiveDateTime,
    rng: &mut R,
) -> Option<String> {
    let (first, last) = split_full_name(full_name)?;
    let suffix = phone_suffix(phone).unwrap_or_else(|| random_suffix(rng));
    Some(format!(
        "{}-{}-{}-{}",
        initials(&first),
        initials(&last),
        suffix,
        now.format("%Y%m%d%H%M%S")
    ))
}
