//! ELO rating math.
//!
//! Expected score of `a` against `b` is `1 / (1 + 10^((b - a) / 400))`. A
//! rating update against a series of opponents sums the per-game deviations
//! before scaling by K, so every game in the series is evaluated against the
//! same pre-update rating.

/// Result of a single game from the rated player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    pub fn score(self) -> f64 {
        match self {
            Outcome::Win => 1.0,
            Outcome::Draw => 0.5,
            Outcome::Loss => 0.0,
        }
    }
}

/// Rating scale denominator (2 * beta with beta = 200).
const SCALE: f64 = 400.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elo {
    k_factor: f64,
}

impl Default for Elo {
    fn default() -> Self {
        Self { k_factor: 10.0 }
    }
}

impl Elo {
    pub fn new(k_factor: f64) -> Self {
        Self { k_factor }
    }

    pub fn k_factor(&self) -> f64 {
        self.k_factor
    }

    /// Probability that `rating` beats `opponent`.
    pub fn expected(rating: i64, opponent: i64) -> f64 {
        let diff = (opponent - rating) as f64;
        1.0 / (1.0 + 10f64.powf(diff / SCALE))
    }

    /// New rating after a series of games, all played at `rating`.
    pub fn rate(&self, rating: i64, series: &[(Outcome, i64)]) -> i64 {
        let deviation: f64 = series
            .iter()
            .map(|(outcome, opponent)| outcome.score() - Self::expected(rating, *opponent))
            .sum();
        (rating as f64 + self.k_factor * deviation).round() as i64
    }
}


/// Property-based tests using proptest
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Beating opponents rated at least as high always gains rating,
        /// bounded by K per game.
        #[test]
        fn win_against_stronger_gains(
            rating in 800i64..1600,
            gaps in prop::collection::vec(0i64..400, 1..6),
            k in 4.0f64..40.0,
        ) {
            let elo = Elo::new(k);
            let series: Vec<(Outcome, i64)> =
                gaps.iter().map(|g| (Outcome::Win, rating + g)).collect();
            let new = elo.rate(rating, &series);
            prop_assert!(new > rating);
            prop_assert!((new - rating) as f64 <= k * series.len() as f64 + 0.5);
        }

        /// Losing to an opponent rated at most as high always costs rating,
        /// bounded by K.
        #[test]
        fn loss_against_weaker_loses(
            rating in 800i64..1600,
            gap in 0i64..400,
            k in 4.0f64..40.0,
        ) {
            let elo = Elo::new(k);
            let new = elo.rate(rating, &[(Outcome::Loss, rating - gap)]);
            prop_assert!(new < rating);
            prop_assert!((rating - new) as f64 <= k + 0.5);
        }
    }
}
