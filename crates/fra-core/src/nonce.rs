use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::clock::Clock;

/// Half of a token's lifetime. A token stays valid for the tick it was issued
/// in and the one after.
const TICK_SECONDS: i64 = 12 * 60 * 60;
const TOKEN_LEN: usize = 10;

/// Issues and checks request-forgery tokens bound to an action and a user.
pub struct NonceVerifier {
    secret: Vec<u8>,
    clock: Arc<dyn Clock>,
}

impl NonceVerifier {
    pub fn new(secret: impl Into<Vec<u8>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: secret.into(),
            clock,
        }
    }

    #[must_use]
    pub fn issue(&self, action: &str, user_id: u64) -> String {
        self.token_for_tick(self.current_tick(), action, user_id)
    }

    #[must_use]
    pub fn verify(&self, token: &str, action: &str, user_id: u64) -> bool {
        if token.is_empty() {
            return false;
        }
        let tick = self.current_tick();
        // Both ticks are always compared.
        [tick, tick - 1]
            .into_iter()
            .map(|candidate| tokens_match(&self.token_for_tick(candidate, action, user_id), token))
            .fold(false, |matched, ok| matched | ok)
    }

    fn current_tick(&self) -> i64 {
        self.clock.now().timestamp().div_euclid(TICK_SECONDS) + 1
    }

    fn token_for_tick(&self, tick: i64, action: &str, user_id: u64) -> String {
        let digest = Sha256::new()
            .chain_update(&self.secret)
            .chain_update(format!("|{tick}|{action}|{user_id}"))
            .finalize();

        let mut token = format!("{digest:x}");
        token.truncate(TOKEN_LEN);
        token
    }
}

/// Compare without stopping at the first differing byte.
fn tokens_match(expected: &str, given: &str) -> bool {
    expected.len() == given.len()
        && expected
            .bytes()
            .zip(given.bytes())
            .fold(0_u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}
