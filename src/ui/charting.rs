use itertools::Itertools;

/// Compute X (seconds) and Y (WPM) bounds for the results chart
pub fn compute_chart_params(wpm_series: &[(f64, f64)], duration_secs: u32) -> (f64, f64) {
    let highest_wpm = wpm_series
        .iter()
        .map(|&(_, wpm)| wpm)
        .minmax()
        .into_option()
        .map(|(_, max)| max)
        .unwrap_or(0.0);

    let overall_duration = match wpm_series.last() {
        Some(&(t, _)) => t.max(1.0),
        None => (duration_secs as f64).max(1.0),
    };

    (overall_duration, highest_wpm.round())
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
