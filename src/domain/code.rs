use derive_more::Display;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The 62 characters short codes are drawn from, in generation order.
pub const DEFAULT_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Column width of `unique_code` in the store.
pub const MAX_CODE_LENGTH: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlphabetError {
    #[error("alphabet must not be empty")]
    Empty,
    #[error("alphabet must be ASCII")]
    NotAscii,
    #[error("alphabet contains '{0}' more than once")]
    Duplicate(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet(Vec<u8>);

impl Alphabet {
    pub fn new(chars: &str) -> Result<Self, AlphabetError> {
        if chars.is_empty() {
            return Err(AlphabetError::Empty);
        }
        if !chars.is_ascii() {
            return Err(AlphabetError::NotAscii);
        }

        let bytes = chars.as_bytes();
        for (i, b) in bytes.iter().enumerate() {
            if bytes[..i].contains(b) {
                return Err(AlphabetError::Duplicate(*b as char));
            }
        }
        Ok(Self(bytes.to_vec()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, c: char) -> bool {
        c.is_ascii() && self.0.contains(&(c as u8))
    }

    /// Maps a uniformly random `u32` onto the alphabet by plain modulo.
    ///
    /// 2^32 is not a multiple of 62, so the first `2^32 % 62` characters are
    /// very slightly more likely than the rest. Codes already issued were
    /// produced this way, so the mapping stays as it is.
    fn pick(&self, value: u32) -> u8 {
        self.0[(value % self.0.len() as u32) as usize]
    }

    /// Builds one code of `length` characters, each from 4 fresh bytes of `rng`.
    pub fn random_code<R: RngCore + CryptoRng>(&self, rng: &mut R, length: usize) -> String {
        let mut bytes = [0u8; 4];
        let mut code = String::with_capacity(length);

        for _ in 0..length {
            rng.fill_bytes(&mut bytes);
            code.push(self.pick(u32::from_le_bytes(bytes)) as char);
        }
        code
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self(DEFAULT_ALPHABET.as_bytes().to_vec())
    }
}

#[derive(Debug, Display, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ShortCode(String);

impl ShortCode {
    /// Wraps a code that came out of the generator or the store.
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Accepts user input only if it could have been issued: 1..=10 characters
    /// from the default alphabet.
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || s.len() > MAX_CODE_LENGTH {
            return None;
        }

        let alphabet = Alphabet::default();
        s.chars()
            .all(|c| alphabet.contains(c))
            .then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use rand::{CryptoRng, RngCore};
    use std::collections::{HashSet, VecDeque};

    /// Hands out a fixed sequence of `u32` values, little-endian, then zeros.
    pub(crate) struct ScriptedRng {
        values: VecDeque<u32>,
        pub(crate) draws: usize,
    }

    impl ScriptedRng {
        pub(crate) fn new(values: impl IntoIterator<Item = u32>) -> Self {
            Self {
                values: values.into_iter().collect(),
                draws: 0,
            }
        }

        /// Script that spells `code` over the default alphabet.
        pub(crate) fn spelling(codes: &[&str]) -> Self {
            let values = codes.iter().flat_map(|code| {
                code.chars()
                    .map(|c| DEFAULT_ALPHABET.find(c).expect("char in alphabet") as u32)
                    .collect::<Vec<_>>()
            });
            Self::new(values)
        }
    }

    impl RngCore for ScriptedRng {
        fn next_u32(&mut self) -> u32 {
            self.draws += 1;
            self.values.pop_front().unwrap_or(0)
        }

        fn next_u64(&mut self) -> u64 {
            self.next_u32() as u64
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for chunk in dest.chunks_mut(4) {
                let bytes = self.next_u32().to_le_bytes();
                chunk.copy_from_slice(&bytes[..chunk.len()]);
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for ScriptedRng {}

    #[test]
    fn test_default_alphabet() {
        let alphabet = Alphabet::default();
        let unique: HashSet<_> = DEFAULT_ALPHABET.chars().collect();

        assert_eq!(alphabet.len(), 62);
        assert_eq!(unique.len(), 62);
        assert!(DEFAULT_ALPHABET.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_alphabet_rejects_bad_input() {
        assert_eq!(Alphabet::new(""), Err(AlphabetError::Empty));
        assert_eq!(Alphabet::new("abé"), Err(AlphabetError::NotAscii));
        assert_eq!(Alphabet::new("abca"), Err(AlphabetError::Duplicate('a')));
        assert!(Alphabet::new("ab").is_ok());
    }

    #[test]
    fn test_modulo_mapping() {
        let mut rng = ScriptedRng::new([0, 25, 26, 61, 62, u32::MAX]);
        let code = Alphabet::default().random_code(&mut rng, 6);

        // u32::MAX % 62 == 3
        assert_eq!(code, "AZa9AD");
        assert_eq!(rng.draws, 6);
    }

    #[test]
    fn test_zero_length_draws_nothing() {
        let mut rng = ScriptedRng::new([1, 2, 3]);
        assert_eq!(Alphabet::default().random_code(&mut rng, 0), "");
        assert_eq!(rng.draws, 0);
    }

    #[test]
    fn test_random_code_with_os_rng() {
        let code = Alphabet::default().random_code(&mut OsRng, DEFAULT_CODE_LENGTH);
        assert!(ShortCode::parse(&code).is_some());
    }

    #[test]
    fn test_parse() {
        assert!(ShortCode::parse("aB3xY9").is_some());
        assert!(ShortCode::parse("abcdefghij").is_some());
        assert!(ShortCode::parse("").is_none());
        assert!(ShortCode::parse("abcdefghijk").is_none());
        assert!(ShortCode::parse("ab-cd").is_none());
        assert!(ShortCode::parse("favicon.ico").is_none());
    }
}
