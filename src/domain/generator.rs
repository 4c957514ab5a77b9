use std::collections::HashSet;

use rand::{CryptoRng, RngCore};

use crate::domain::{
    code::{Alphabet, ShortCode},
    error::GenerateError,
    repository::CodeStore,
};

pub const MAX_RETRIES: usize = 3;
pub const BATCH_SIZE: usize = 10;

/// Allocates short codes that are not yet in a [`CodeStore`].
///
/// The store check and the later insert are two separate steps, so two
/// callers can be handed the same code. The unique constraint on the stored
/// codes is what actually rejects the second insert; this check only keeps
/// such rejections rare.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    alphabet: Alphabet,
    max_retries: usize,
    batch_size: usize,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self {
            alphabet: Alphabet::default(),
            max_retries: MAX_RETRIES,
            batch_size: BATCH_SIZE,
        }
    }
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alphabet(mut self, alphabet: Alphabet) -> Self {
        self.alphabet = alphabet;
        self
    }

    /// Candidates in generation order, duplicates dropped.
    fn candidate_batch<R: RngCore + CryptoRng>(&self, rng: &mut R, length: usize) -> Vec<String> {
        let mut seen = HashSet::with_capacity(self.batch_size);
        let mut batch = Vec::with_capacity(self.batch_size);

        for _ in 0..self.batch_size {
            let candidate = self.alphabet.random_code(rng, length);
            if seen.insert(candidate.clone()) {
                batch.push(candidate);
            }
        }
        batch
    }

    pub async fn generate<S, R>(
        &self,
        store: &S,
        rng: &mut R,
        length: usize,
    ) -> Result<ShortCode, GenerateError>
    where
        S: CodeStore,
        R: RngCore + CryptoRng,
    {
        if length == 0 {
            return Err(GenerateError::InvalidLength);
        }

        for round in 1..=self.max_retries {
            let batch = self.candidate_batch(rng, length);
            let existing = store
                .existing_codes(&batch)
                .await
                .map_err(GenerateError::Store)?;

            if let Some(code) = batch.into_iter().find(|c| !existing.contains(c)) {
                tracing::debug!(round, code = code.as_str(), "Allocated unique code");
                return Ok(ShortCode::new(code));
            }

            tracing::warn!(
                round,
                length,
                max_retries = self.max_retries,
                "Every candidate in the batch is already taken"
            );
        }

        Err(GenerateError::Exhausted {
            rounds: self.max_retries,
        })
    }
}
