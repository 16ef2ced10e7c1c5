//! Star ratings.

/// Number of stars in a rating widget.
pub const MAX_STARS: u8 = 5;

/// Fill fraction (0.0 to 1.0) of each of the five stars for `value`.
///
/// Star `n` (1-based) is filled by `clamp(value - (n - 1), 0, 1)`, so `3.5`
/// renders three full stars and one half star.
#[must_use]
pub fn star_fills(value: f64) -> [f64; MAX_STARS as usize] {
    let mut fills = [0.0; MAX_STARS as usize];
    for (n, fill) in (0_u8..).zip(fills.iter_mut()) {
        *fill = (value - f64::from(n)).clamp(0.0, 1.0);
    }
    fills
}

/// Accessible label, e.g. `"3.5 out of 5 stars"`. The value is clamped to 0..=5.
#[must_use]
pub fn rating_label(value: f64) -> String {
    format!(
        "{:.1} out of {MAX_STARS} stars",
        value.clamp(0.0, f64::from(MAX_STARS))
    )
}

/// Average rating rounded half-up to a whole star, clamped to 0..=5.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn round_average(average: f64) -> u8 {
    if !average.is_finite() {
        return 0;
    }
    (average + 0.5).floor().clamp(0.0, f64::from(MAX_STARS)) as u8
}

/// Whether a submitted rating is a whole number of stars between 1 and 5.
#[must_use]
pub fn is_valid_rating(rating: u8) -> bool {
    (1..=MAX_STARS).contains(&rating)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_fills_half() {
        assert_eq!(star_fills(3.5), [1.0, 1.0, 1.0, 0.5, 0.0]);
    }

    #[test]
    fn test_star_fills_bounds() {
        assert_eq!(star_fills(0.0), [0.0; 5]);
        assert_eq!(star_fills(7.0), [1.0; 5]);
        assert_eq!(star_fills(-2.0), [0.0; 5]);
    }

    #[test]
    fn test_rating_label_clamps() {
        assert_eq!(rating_label(4.3), "4.3 out of 5 stars");
        assert_eq!(rating_label(9.0), "5.0 out of 5 stars");
        assert_eq!(rating_label(-1.0), "0.0 out of 5 stars");
    }

    #[test]
    fn test_round_average() {
        assert_eq!(round_average(3.5), 4);
        assert_eq!(round_average(3.49), 3);
        assert_eq!(round_average(0.0), 0);
        assert_eq!(round_average(f64::NAN), 0);
    }

    #[test]
    fn test_is_valid_rating() {
        assert!(is_valid_rating(1));
        assert!(is_valid_rating(5));
        assert!(!is_valid_rating(0));
        assert!(!is_valid_rating(6));
    }
}
