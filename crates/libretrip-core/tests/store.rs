use std::sync::Arc;
use std::time::Duration;

use libretrip_core::reader::ParameterId;
use libretrip_core::telemetry::{SelectedProgram, TelemetryStore};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_readers_never_see_partial_publish() {
    let store = Arc::new(TelemetryStore::new());

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for i in 1..=2000u64 {
                let v = i as f64;
                store
                    .with_lock(|s| {
                        s.record(ParameterId::Speed, v, i);
                        s.record(ParameterId::MassAirFlow, v, i);
                        s.cumulative_distance_km = v;
                        s.cumulative_fuel_liters = v;
                        s.moving_time_ms = i;
                    })
                    .await;
                if i % 64 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        })
    };

    let reader = {
        let store = store.clone();
        tokio::spawn(async move {
            let mut seen = 0;
            loop {
                let Some(s) = store.try_snapshot(Duration::from_millis(20)).await else {
                    continue;
                };
                let Some(speed) = s.speed_kph.value() else {
                    tokio::task::yield_now().await;
                    continue;
                };
                assert_eq!(s.maf_grams_per_sec.value(), Some(speed));
                assert_eq!(s.cumulative_distance_km, speed);
                assert_eq!(s.cumulative_fuel_liters, speed);
                assert_eq!(s.moving_time_ms, speed as u64);
                assert_eq!(s.last_update_ms, Some(speed as u64));
                seen += 1;
                if speed == 2000.0 {
                    return seen;
                }
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.unwrap();
    let seen = reader.await.unwrap();
    assert!(seen >= 1);
}

#[tokio::test]
async fn test_program_selection_is_seen_by_writer() {
    let store = TelemetryStore::with_program(SelectedProgram::Basic);
    for program in SelectedProgram::ALL {
        assert!(
            store
                .try_select_program(program, Duration::from_millis(5))
                .await
        );
        assert_eq!(store.selected_program().await, program);
    }
}
