//! Properties of the weighting and level curves used by player statistics.

use chartdb_core::score::stats::{
    bonus_pp, level_for_score, percent_to_next_level, required_score_for_level, weight_for_index,
    weight_sum, MAX_LEVEL,
};

mod weight_tests {
    use super::*;

    #[test]
    fn test_weights_strictly_decrease() {
        assert_eq!(weight_for_index(0), 1.0);
        for i in 0..200 {
            assert!(weight_for_index(i + 1) < weight_for_index(i));
        }
    }

    #[test]
    fn test_weight_sum_matches_series() {
        for count in [0usize, 1, 2, 10, 100] {
            let series: f64 = (0..count).map(weight_for_index).sum();
            assert!((weight_sum(count) - series).abs() < 1e-9, "count {}", count);
        }
    }

    #[test]
    fn test_weight_sum_bounded() {
        assert!(weight_sum(10_000) <= 20.0);
        assert!(weight_sum(10_000) > 19.99);
    }

    #[test]
    fn test_bonus_pp_saturates() {
        assert_eq!(bonus_pp(0), 0.0);
        assert!(bonus_pp(10) < bonus_pp(100));
        assert_eq!(bonus_pp(1000), bonus_pp(5000));
        assert!(bonus_pp(1000) < 417.0);
    }
}

mod level_tests {
    use super::*;

    #[test]
    fn test_requirements_increase() {
        for level in 1..MAX_LEVEL {
            assert!(required_score_for_level(level + 1) > required_score_for_level(level));
        }
    }

    #[test]
    fn test_level_at_exact_requirement() {
        for level in [2u32, 10, 50, 100, 101] {
            let required = required_score_for_level(level);
            assert_eq!(level_for_score(required), level);
            assert_eq!(level_for_score(required - 1), level - 1);
        }
    }

    #[test]
    fn test_level_capped() {
        assert_eq!(level_for_score(u64::MAX), MAX_LEVEL);
    }

    #[test]
    fn test_percent_to_next_level_in_range() {
        for score in [0u64, 1, 30_000, 1_000_000, 50_000_000_000] {
            let percent = percent_to_next_level(score);
            assert!((0.0..=1.0).contains(&percent), "score {}", score);
        }
    }
}
