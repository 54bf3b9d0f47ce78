use reckon::challenge::RoundResult;

/// (round index, net score) pairs for the report chart
pub fn net_score_points(results: &[RoundResult]) -> Vec<(f64, f64)> {
    results
        .iter()
        .map(|r| (r.round_index as f64, r.net_score as f64))
        .collect()
}

/// Compute X (round) and Y (net score) bounds for the report chart. Zero is
/// always inside the Y range and the range is never flat.
pub fn compute_chart_params(points: &[(f64, f64)]) -> ([f64; 2], [f64; 2]) {
    let last_round = points.last().map_or(1.0, |p| p.0).max(1.0);

    let lowest = points.iter().map(|p| p.1).fold(0.0, f64::min).floor();
    let mut highest = points.iter().map(|p| p.1).fold(0.0, f64::max).ceil();
    if highest - lowest < 1.0 {
        highest = lowest + 1.0;
    }

    ([1.0, last_round], [lowest, highest])
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
