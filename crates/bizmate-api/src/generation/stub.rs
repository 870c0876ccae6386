use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{GenerationError, GenerationProvider};

const CANNED_REPLIES: &[&str] = &[
    "Thanks for reaching out! We'd be happy to help. What are you looking for today?",
    "Great question! Let me share a few options that might suit you.",
    "We appreciate your interest! Would you like to hear about our current offers?",
];

/// Offline provider with no model behind it. Replies and template choices
/// come from a seedable RNG: the same seed gives the same sequence, which is
/// what tests and demos rely on.
pub struct StubGenerationProvider {
    rng: Mutex<StdRng>,
}

impl StubGenerationProvider {
    pub fn seeded(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    pub fn from_os_rng() -> Self {
        Self { rng: Mutex::new(StdRng::from_os_rng()) }
    }

    /// Pick one of `options`, or `None` if there are none.
    pub fn choose<'a, T>(&self, options: &'a [T]) -> Option<&'a T> {
        if options.is_empty() {
            return None;
        }
        let idx = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            rng.random_range(0..options.len())
        };
        options.get(idx)
    }
}

#[async_trait]
impl GenerationProvider for StubGenerationProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        let reply = self
            .choose(CANNED_REPLIES)
            .ok_or_else(|| GenerationError::Malformed("no canned replies".into()))?;
        Ok(format!("[stub] {reply}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_choices() {
        let options = ["a", "b", "c", "d", "e"];
        let first = StubGenerationProvider::seeded(7);
        let second = StubGenerationProvider::seeded(7);

        let picks_a: Vec<_> = (0..20).map(|_| *first.choose(&options).unwrap()).collect();
        let picks_b: Vec<_> = (0..20).map(|_| *second.choose(&options).unwrap()).collect();
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn empty_options_yield_none() {
        let stub = StubGenerationProvider::seeded(1);
        let empty: [&str; 0] = [];
        assert_eq!(stub.choose(&empty), None);
    }

    #[tokio::test]
    async fn replies_are_labeled() {
        let stub = StubGenerationProvider::seeded(3);
        let reply = stub.generate("anything").await.unwrap();
        assert!(reply.starts_with("[stub] "));
        assert!(CANNED_REPLIES.iter().any(|r| reply.ends_with(r)));
    }
}
