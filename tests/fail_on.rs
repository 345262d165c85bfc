use faultline_core::ImpactLevel;

#[test]
fn fail_on_passes_when_impact_is_below_threshold() {
    // A low-impact commit against a high threshold must not fail the run.
    let level = ImpactLevel::Low;
    let threshold = ImpactLevel::High;

    assert!(!level.meets_threshold(threshold));
}

#[test]
fn fail_on_trips_when_impact_meets_threshold() {
    let level = ImpactLevel::High;
    let threshold = ImpactLevel::Medium;

    assert!(level.meets_threshold(threshold));
}

#[test]
fn fail_on_medium_catches_medium_and_high() {
    let threshold = ImpactLevel::Medium;

    assert!(ImpactLevel::High.meets_threshold(threshold));
    assert!(ImpactLevel::Medium.meets_threshold(threshold));
    assert!(!ImpactLevel::Low.meets_threshold(threshold));
}

#[test]
fn threshold_follows_the_score_boundaries() {
    assert!(ImpactLevel::from_score(71.0).meets_threshold(ImpactLevel::High));
    assert!(!ImpactLevel::from_score(70.0).meets_threshold(ImpactLevel::High));
    assert!(ImpactLevel::from_score(41.0).meets_threshold(ImpactLevel::Medium));
    assert!(!ImpactLevel::from_score(40.0).meets_threshold(ImpactLevel::Medium));
}
