//! Duration distributions for service time and inter-arrival gaps.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Uniform duration between `min_ms` and `max_ms` inclusive. Equal bounds mean fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Delay {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Delay {
    pub const fn fixed(ms: u64) -> Self {
        Self {
            min_ms: ms,
            max_ms: ms,
        }
    }

    pub const fn between(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn is_fixed(&self) -> bool {
        self.min_ms == self.max_ms
    }

    pub fn is_valid(&self) -> bool {
        self.min_ms <= self.max_ms
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min_ms >= self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rng.gen_range(self.min_ms..=self.max_ms))
    }

    /// Parse `"<ms>"` or `"<min>..<max>"`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.split_once("..") {
            Some((min, max)) => {
                let min = min.trim().parse().ok()?;
                let max = max.trim().parse().ok()?;
                Some(Self::between(min, max))
            }
            None => s.trim().parse().ok().map(Self::fixed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn fixed_delay_always_samples_same_value() {
        let mut rng = StdRng::seed_from_u64(7);
        let delay = Delay::fixed(250);
        for _ in 0..10 {
            assert_eq!(delay.sample(&mut rng), Duration::from_millis(250));
        }
        assert!(delay.is_fixed());
    }

    #[test]
    fn ranged_delay_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let delay = Delay::between(1000, 2500);
        for _ in 0..100 {
            let d = delay.sample(&mut rng);
            assert!(d >= Duration::from_millis(1000));
            assert!(d <= Duration::from_millis(2500));
        }
    }

    #[test]
    fn parse_forms() {
        assert_eq!(Delay::parse("5000"), Some(Delay::fixed(5000)));
        assert_eq!(Delay::parse("1000..2500"), Some(Delay::between(1000, 2500)));
        assert_eq!(Delay::parse("abc"), None);
        assert_eq!(Delay::parse("10..x"), None);
    }

    #[test]
    fn inverted_bounds_are_invalid() {
        assert!(!Delay::between(10, 5).is_valid());
        assert!(Delay::between(5, 10).is_valid());
    }
}
