//! Practice progress calculations

/// Percentage of correct practice attempts out of all attempts.
///
/// Returns `0.0` when no attempts were made. The value is not rounded;
/// see [`round_percentage`] for the presentation form.
///
/// # Examples
///
/// ```
/// use mathmap_common::calculate_mastery_level;
///
/// assert_eq!(calculate_mastery_level(0, 0), 0.0);
/// assert_eq!(calculate_mastery_level(3, 4), 75.0);
/// ```
pub fn calculate_mastery_level(correct_practices: i64, total_practices: i64) -> f64 {
    if total_practices == 0 {
        return 0.0;
    }
    100.0 * correct_practices as f64 / total_practices as f64
}

/// Round a percentage to two decimal places (half away from zero)
pub fn round_percentage(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
