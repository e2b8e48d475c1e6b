//! Team display names.
//!
//! The arbiter only needs names to be unique within a game. The mission
//! asks an injected [`NameSource`] for one per join, so tests can pin names
//! while real runs get memorable random ones.

use std::collections::VecDeque;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const ADJECTIVES: &[&str] = &[
    "amber", "bold", "brisk", "calm", "clever", "dusty", "eager", "frosty", "gentle", "hardy",
    "keen", "lucky", "mellow", "nimble", "quiet", "rapid", "rusty", "steady", "sunny", "swift",
];

const NOUNS: &[&str] = &[
    "badger", "beetle", "comet", "crater", "falcon", "gecko", "heron", "lynx", "marmot", "meteor",
    "otter", "pika", "quasar", "raven", "rover", "sparrow", "tern", "vole", "wombat", "yak",
];

/// A supplier of team display names.
pub trait NameSource: Send {
    /// The next name to join with.
    fn next_name(&mut self) -> String;
}

/// Random `adjective-noun-NN` names.
#[derive(Debug, Clone)]
pub struct RandomNames {
    rng: SmallRng,
}

impl RandomNames {
    /// Names seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Reproducible names from a fixed seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn pick(&mut self, words: &[&'static str]) -> &'static str {
        let index = self.rng.random_range(0..words.len());
        words.get(index).copied().unwrap_or("team")
    }
}

impl Default for RandomNames {
    fn default() -> Self {
        Self::new()
    }
}

impl NameSource for RandomNames {
    fn next_name(&mut self) -> String {
        let adjective = self.pick(ADJECTIVES);
        let noun = self.pick(NOUNS);
        let number: u32 = self.rng.random_range(10..100);
        format!("{adjective}-{noun}-{number}")
    }
}

/// Names handed out from a fixed list, then `{prefix}-{n}` once it runs dry.
#[derive(Debug, Clone, Default)]
pub struct FixedNames {
    queue: VecDeque<String>,
    prefix: String,
    issued: u32,
}

impl FixedNames {
    /// Serve `names` in order, then fall back to `team-{n}`.
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            queue: names.into_iter().map(Into::into).collect(),
            prefix: "team".to_owned(),
            issued: 0,
        }
    }

    /// Only ever serve `{prefix}-{n}`, counting from 1.
    pub fn numbered(prefix: &str) -> Self {
        Self {
            queue: VecDeque::new(),
            prefix: prefix.to_owned(),
            issued: 0,
        }
    }
}

impl NameSource for FixedNames {
    fn next_name(&mut self) -> String {
        self.issued = self.issued.saturating_add(1);
        self.queue
            .pop_front()
            .unwrap_or_else(|| format!("{}-{}", self.prefix, self.issued))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_names_are_reproducible() {
        let mut a = RandomNames::with_seed(7);
        let mut b = RandomNames::with_seed(7);
        for _ in 0..5 {
            assert_eq!(a.next_name(), b.next_name());
        }
    }

    #[test]
    fn random_names_have_three_parts() {
        let mut names = RandomNames::with_seed(1);
        let name = names.next_name();
        let parts: Vec<&str> = name.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts.first().is_some_and(|p| ADJECTIVES.contains(p)));
        assert!(parts.get(1).is_some_and(|p| NOUNS.contains(p)));
    }

    #[test]
    fn fixed_names_then_numbers() {
        let mut names = FixedNames::new(["alpha", "bravo"]);
        assert_eq!(names.next_name(), "alpha");
        assert_eq!(names.next_name(), "bravo");
        assert_eq!(names.next_name(), "team-3");

        let mut numbered = FixedNames::numbered("sim");
        assert_eq!(numbered.next_name(), "sim-1");
        assert_eq!(numbered.next_name(), "sim-2");
    }
}
