//! generated secrets
use rand::rngs::OsRng;
use rand::seq::SliceRandom;

pub const PASSWORD_LENGTH: usize = 20;
const SYMBOLS: &[u8] = b"!@#$%^&*_-+=?";
const LETTERS_AND_DIGITS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A password with at least one lowercase letter, uppercase letter, digit and symbol
///
/// Characters are drawn uniformly from the OS random source; candidates missing a class are
/// discarded.
pub fn generate_password() -> String {
    let alphabet: Vec<u8> = LETTERS_AND_DIGITS.iter().chain(SYMBOLS).copied().collect();

    loop {
        let candidate: String = (0..PASSWORD_LENGTH)
            .filter_map(|_| alphabet.choose(&mut OsRng))
            .map(|&b| b as char)
            .collect();

        if is_complex(&candidate) {
            return candidate;
        }
    }
}

fn is_complex(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.bytes().any(|b| SYMBOLS.contains(&b))
}
