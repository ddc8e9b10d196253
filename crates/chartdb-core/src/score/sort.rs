//! Score orderings.
//!
//! Every comparator ends with the `sort_hack` counter so that scores with
//! identical keys still have a strict, repeatable order.

use std::cmp::Ordering;

use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use super::record::Score;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr, EnumIter)]
pub enum SortMethod {
    #[strum(serialize = "Sort By Accuracy")]
    Accuracy,
    #[strum(serialize = "Sort By Combo")]
    Combo,
    #[strum(serialize = "Sort By Date")]
    Date,
    #[strum(serialize = "Sort By Misses")]
    Misses,
    #[strum(serialize = "Sort By Score")]
    Score,
    #[strum(serialize = "Sort By Unstable Rate")]
    UnstableRate,
    #[strum(serialize = "Sort By pp")]
    Pp,
}

impl SortMethod {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }

    pub fn all() -> impl Iterator<Item = SortMethod> {
        Self::iter()
    }

    /// `Ordering::Less` means `a` is listed before `b`.
    pub fn compare(&self, a: &Score, b: &Score) -> Ordering {
        match self {
            Self::Accuracy => b
                .accuracy()
                .total_cmp(&a.accuracy())
                .then_with(|| by_score(a, b)),
            Self::Combo => b.combo_max.cmp(&a.combo_max).then_with(|| by_score(a, b)),
            Self::Date => b
                .timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.sort_hack.cmp(&a.sort_hack)),
            Self::Misses => a.num_misses.cmp(&b.num_misses).then_with(|| by_score(a, b)),
            Self::Score => by_score(a, b),
            Self::UnstableRate => has_unstable_rate(b)
                .cmp(&has_unstable_rate(a))
                .then_with(|| a.unstable_rate.total_cmp(&b.unstable_rate))
                .then_with(|| by_score(a, b)),
            Self::Pp => has_pp(b)
                .cmp(&has_pp(a))
                .then_with(|| b.pp.total_cmp(&a.pp))
                .then_with(|| by_score(a, b)),
        }
    }

    pub fn sort(&self, scores: &mut [Score]) {
        scores.sort_by(|a, b| self.compare(a, b));
    }
}

/// Score, then newest first, then insertion order (newest first).
fn by_score(a: &Score, b: &Score) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.timestamp.cmp(&a.timestamp))
        .then_with(|| b.sort_hack.cmp(&a.sort_hack))
}

// Legacy scores have no real pp/UR data and always go after those that do.
fn has_pp(score: &Score) -> bool {
    !score.legacy
}

fn has_unstable_rate(score: &Score) -> bool {
    !score.legacy && score.unstable_rate > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(score: u64, timestamp: u64, sort_hack: u64) -> Score {
        Score {
            score,
            timestamp,
            sort_hack,
            ..Score::new()
        }
    }

    fn order(method: SortMethod, scores: &[Score]) -> Vec<u64> {
        let mut scores = scores.to_vec();
        method.sort(&mut scores);
        scores.iter().map(|s| s.sort_hack).collect()
    }

    #[test]
    fn test_names_round_trip() {
        for method in SortMethod::all() {
            assert_eq!(SortMethod::from_name(method.name()), Some(method));
        }
        assert_eq!(SortMethod::all().count(), 7);
        assert_eq!(SortMethod::from_name("Sort By Luck"), None);
    }

    #[test]
    fn test_score_then_date_then_hack() {
        let scores = [score(100, 5, 1), score(200, 1, 2), score(100, 9, 3), score(100, 9, 4)];
        assert_eq!(order(SortMethod::Score, &scores), vec![2, 4, 3, 1]);
    }

    #[test]
    fn test_equal_keys_total_order_is_deterministic() {
        let scores = [score(100, 5, 3), score(100, 5, 1), score(100, 5, 2)];
        for method in SortMethod::all() {
            let first = order(method, &scores);
            let mut reversed = scores.to_vec();
            reversed.reverse();
            assert_eq!(order(method, &reversed), first, "{:?}", method);
            assert_eq!(first, vec![3, 2, 1], "{:?}", method);
        }
    }

    #[test]
    fn test_misses_ascending() {
        let a = Score {
            num_misses: 3,
            ..score(500, 1, 1)
        };
        let b = Score {
            num_misses: 0,
            ..score(100, 1, 2)
        };
        assert_eq!(order(SortMethod::Misses, &[a, b]), vec![2, 1]);
    }

    #[test]
    fn test_pp_puts_legacy_last() {
        let legacy = Score {
            legacy: true,
            ..score(1_000_000, 1, 1)
        };
        let low_pp = Score {
            pp: 10.0,
            ..score(10, 1, 2)
        };
        let high_pp = Score {
            pp: 200.0,
            ..score(5, 1, 3)
        };
        assert_eq!(order(SortMethod::Pp, &[legacy, low_pp, high_pp]), vec![3, 2, 1]);
    }

    #[test]
    fn test_unstable_rate_lowest_first_legacy_last() {
        let legacy = Score {
            legacy: true,
            ..score(1_000_000, 1, 1)
        };
        let shaky = Score {
            unstable_rate: 150.0,
            ..score(10, 1, 2)
        };
        let steady = Score {
            unstable_rate: 80.0,
            ..score(5, 1, 3)
        };
        assert_eq!(
            order(SortMethod::UnstableRate, &[legacy, shaky, steady]),
            vec![3, 2, 1]
        );
    }

    #[test]
    fn test_accuracy_then_score() {
        let perfect = Score {
            num300: 10,
            ..score(100, 1, 1)
        };
        let worse = Score {
            num300: 9,
            num100: 1,
            ..score(999, 1, 2)
        };
        assert_eq!(order(SortMethod::Accuracy, &[worse, perfect]), vec![1, 2]);
    }

    #[test]
    fn test_combo_desc() {
        let a = Score {
            combo_max: 100,
            ..score(1, 1, 1)
        };
        let b = Score {
            combo_max: 300,
            ..score(1, 1, 2)
        };
        assert_eq!(order(SortMethod::Combo, &[a, b]), vec![2, 1]);
    }

    #[test]
    fn test_date_newest_first() {
        let scores = [score(1, 10, 1), score(1, 30, 2), score(1, 20, 3)];
        assert_eq!(order(SortMethod::Date, &scores), vec![2, 3, 1]);
    }
}
