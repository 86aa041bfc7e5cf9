//! Synthetic value generation for pseudonymized columns

use crate::config::FakerConfig;
use fake::faker::internet::en::{DomainSuffix, SafeEmail};
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Source of fabricated values. Production code uses [`FakerEngine`]; tests can
/// plug in a deterministic implementation.
pub trait SyntheticSource: Send {
    fn full_name(&mut self) -> String;
    fn email(&mut self) -> String;
    fn url(&mut self) -> String;
    fn yes_no(&mut self) -> &'static str;
}

#[derive(Clone)]
pub struct FakerEngine {
    rng: StdRng,
}

impl FakerEngine {
    pub fn new(config: &FakerConfig) -> Self {
        let rng = if let Some(seed) = config.seed {
            debug!("Seeding synthetic value generator with {}", seed);
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_entropy()
        };

        Self { rng }
    }
}

impl SyntheticSource for FakerEngine {
    fn full_name(&mut self) -> String {
        let first: String = FirstName().fake_with_rng(&mut self.rng);
        let last: String = LastName().fake_with_rng(&mut self.rng);
        format!("{} {}", first, last)
    }

    fn email(&mut self) -> String {
        SafeEmail().fake_with_rng(&mut self.rng)
    }

    // Shaped like "https://www.walsh.com/"
    fn url(&mut self) -> String {
        let last: String = LastName().fake_with_rng(&mut self.rng);
        let mut word: String = last
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        if word.is_empty() {
            word = "example".to_string();
        }
        let domain_suffix: String = DomainSuffix().fake_with_rng(&mut self.rng);

        format!("https://www.{}.{}/", word, domain_suffix)
    }

    fn yes_no(&mut self) -> &'static str {
        if self.rng.gen_bool(0.5) {
            "Yes"
        } else {
            "No"
        }
    }
}
