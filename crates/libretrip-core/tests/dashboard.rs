use libretrip_core::dashboard::{DashboardView, DisplaySettings, LinkStatus};
use libretrip_core::reader::ParameterId;
use libretrip_core::telemetry::TelemetrySnapshot;
use pretty_assertions::assert_eq;

fn live_snapshot(at_ms: u64) -> TelemetrySnapshot {
    let mut s = TelemetrySnapshot::default();
    s.mark_link_up();
    s.record(ParameterId::Speed, 100.0, at_ms);
    s.record(ParameterId::MassAirFlow, 4.5, at_ms);
    s
}

#[test]
fn test_staleness_boundaries() {
    let settings = DisplaySettings::default();
    let snapshot = live_snapshot(10_000);

    let view = |now| DashboardView::from_snapshot(&snapshot, now, &settings).link;
    assert_eq!(view(10_000), LinkStatus::Live);
    assert_eq!(view(10_499), LinkStatus::Live);
    assert_eq!(view(10_500), LinkStatus::Stale);
    // Link still up, nothing new for five seconds
    assert_eq!(view(15_000), LinkStatus::Stale);
}

#[test]
fn test_down_overrides_fresh_data() {
    let mut snapshot = live_snapshot(10_000);
    snapshot.link_up = false;
    let view = DashboardView::from_snapshot(&snapshot, 10_000, &DisplaySettings::default());
    assert_eq!(view.link, LinkStatus::Down);
}

#[test]
fn test_instant_economy_clamp_follows_settings() {
    let snapshot = live_snapshot(0);

    let view = DashboardView::from_snapshot(&snapshot, 0, &DisplaySettings::default());
    assert_eq!(view.instant_economy_mpg, Some(99.0));

    let settings = DisplaySettings {
        max_display_economy: 90.0,
        ..DisplaySettings::default()
    };
    let view = DashboardView::from_snapshot(&snapshot, 0, &settings);
    assert_eq!(view.instant_economy_mpg, Some(90.0));
}

#[test]
fn test_average_economy_needs_minimum_trip() {
    let mut snapshot = live_snapshot(0);
    snapshot.cumulative_distance_km = 0.05;
    snapshot.cumulative_fuel_liters = 0.01;
    let settings = DisplaySettings::default();
    assert_eq!(
        DashboardView::from_snapshot(&snapshot, 0, &settings).average_economy_mpg,
        None
    );

    snapshot.cumulative_distance_km = 80.0;
    snapshot.cumulative_fuel_liters = 5.0;
    assert_eq!(
        DashboardView::from_snapshot(&snapshot, 0, &settings).average_economy_mpg,
        Some(37.6336)
    );
}
