/// Lowest top edge of the WPM axis.
const MIN_WPM_BOUND: u32 = 50;

/// Per-tick WPM samples as chart points, x counting seconds from 1.
pub fn history_points(history: &[u32]) -> Vec<(f64, f64)> {
    history
        .iter()
        .enumerate()
        .map(|(idx, wpm)| ((idx + 1) as f64, *wpm as f64))
        .collect()
}

/// X (seconds) and Y (WPM) bounds for the results chart, or None when there
/// are too few samples to draw a line.
pub fn compute_chart_params(history: &[u32], personal_best: u32) -> Option<(f64, f64)> {
    if history.len() < 2 {
        return None;
    }
    let highest = history
        .iter()
        .copied()
        .chain([personal_best, MIN_WPM_BOUND])
        .max()
        .unwrap_or(MIN_WPM_BOUND);
    Some((history.len() as f64, highest as f64))
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_chart_params_needs_two_samples() {
        assert_eq!(compute_chart_params(&[], 40), None);
        assert_eq!(compute_chart_params(&[30], 40), None);
    }

    #[test]
    fn test_compute_chart_params_y_bound() {
        assert_eq!(compute_chart_params(&[10, 20], 0), Some((2.0, 50.0)));
        assert_eq!(compute_chart_params(&[10, 20, 30], 72), Some((3.0, 72.0)));
        assert_eq!(compute_chart_params(&[90, 20], 72), Some((2.0, 90.0)));
    }

    #[test]
    fn test_history_points() {
        assert_eq!(history_points(&[12, 30]), vec![(1.0, 12.0), (2.0, 30.0)]);
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(1.0), "1");
        assert_eq!(format_label(1.2345), "1.23");
    }
}
