//! End-to-end attack tests over in-memory cannons

mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use common::{radar, scan, service_with, service_with_config, FireCall, InFlight, MockCannon};
use endor::error::{EndorErrorTrait, Error, ErrorCategory};
use endor::fleet::{FleetConfig, FleetError};
use endor::models::{Coordinate, EnemyType};
use endor::protocol::ProtocolType;

#[tokio::test]
async fn test_attack_closest_enemy_with_lowest_generation() {
    let backend1 = Arc::new(MockCannon::new("backend1", 1, true).with_casualties(5));
    let backend2 = Arc::new(MockCannon::new("backend2", 2, true));
    let service = service_with(&[backend1.clone(), backend2.clone()], 10);

    let report = service
        .attack(&radar(
            &[ProtocolType::ClosestEnemies],
            vec![scan(10, 20, EnemyType::Soldier, 5, 0)],
        ))
        .await
        .unwrap();

    assert_eq!(report.target, Coordinate::new(10, 20));
    assert_eq!(report.casualties, 5);
    assert_eq!(report.generation, 1);

    assert_eq!(
        backend1.fire_calls(),
        vec![FireCall {
            x: 10,
            y: 20,
            enemies: 5
        }]
    );
    assert!(backend2.fire_calls().is_empty());
    assert_eq!(backend2.status_calls(), 1);
}

#[tokio::test]
async fn test_unavailable_cannon_never_selected() {
    let a = Arc::new(MockCannon::new("a", 1, true));
    let b = Arc::new(MockCannon::new("b", 2, true));
    let c = Arc::new(MockCannon::new("c", 0, false));
    let service = service_with(&[a.clone(), b.clone(), c.clone()], 10);

    let report = service
        .attack(&radar(&[], vec![scan(3, 4, EnemyType::Mech, 2, 0)]))
        .await
        .unwrap();

    assert_eq!(report.generation, 1);
    assert_eq!(a.fire_calls().len(), 1);
    assert!(c.fire_calls().is_empty());
}

#[tokio::test]
async fn test_failed_status_excluded_without_aborting_round() {
    let broken = Arc::new(MockCannon::new("broken", 0, true).failing_status());
    let older = Arc::new(MockCannon::new("older", 3, true));
    let newer = Arc::new(MockCannon::new("newer", 4, true));
    let service = service_with(&[broken.clone(), older.clone(), newer.clone()], 10);

    let report = service
        .attack(&radar(&[], vec![scan(1, 1, EnemyType::Soldier, 1, 0)]))
        .await
        .unwrap();

    assert_eq!(report.generation, 3);
    assert!(broken.fire_calls().is_empty());
    assert_eq!(older.fire_calls().len(), 1);
}

#[tokio::test]
async fn test_all_unavailable_fails() {
    let service = service_with(
        &[
            Arc::new(MockCannon::new("a", 1, false)),
            Arc::new(MockCannon::new("b", 2, false)),
        ],
        10,
    );

    let err = service
        .attack(&radar(&[], vec![scan(1, 1, EnemyType::Soldier, 1, 0)]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Fleet(FleetError::NoBackendAvailable {
            queried: 2,
            failed: 0
        })
    ));
    assert_eq!(err.category(), ErrorCategory::Backend);
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_fire_failure_aborts_attack() {
    let primary = Arc::new(MockCannon::new("primary", 1, true).failing_fire());
    let secondary = Arc::new(MockCannon::new("secondary", 2, true));
    let service = service_with(&[primary.clone(), secondary.clone()], 10);

    let err = service
        .attack(&radar(&[], vec![scan(1, 1, EnemyType::Soldier, 1, 0)]))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "fire_command_failed");
    assert_eq!(primary.fire_calls().len(), 1);
    assert!(secondary.fire_calls().is_empty());
}

#[tokio::test]
async fn test_empty_target_set_never_contacts_cannons() {
    let only = Arc::new(MockCannon::new("only", 1, true));
    let service = service_with(&[only.clone()], 10);

    let err = service
        .attack(&radar(
            &[ProtocolType::AssistAllies],
            vec![scan(1, 1, EnemyType::Soldier, 1, 0)],
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::EmptyTargetSet));
    assert_eq!(err.category(), ErrorCategory::Targeting);
    assert_eq!(only.status_calls(), 0);
}

#[tokio::test]
async fn test_status_round_respects_call_cap() {
    let in_flight = Arc::new(InFlight::default());
    let cannons: Vec<Arc<MockCannon>> = (0..6)
        .map(|i| {
            Arc::new(
                MockCannon::new(&format!("cannon-{i}"), i, true)
                    .with_delay(Duration::from_millis(30))
                    .sharing(in_flight.clone()),
            )
        })
        .collect();
    let service = service_with(&cannons, 2);

    let reports = service.fleet_status().await;

    assert_eq!(reports.len(), 6);
    assert!(in_flight.max() <= 2, "max in flight was {}", in_flight.max());
    assert_eq!(in_flight.max(), 2);
    assert_eq!(service.pool().in_flight(), 0);
}

#[tokio::test]
async fn test_concurrent_attacks_share_call_cap() {
    let in_flight = Arc::new(InFlight::default());
    let cannons: Vec<Arc<MockCannon>> = (0..4)
        .map(|i| {
            Arc::new(
                MockCannon::new(&format!("cannon-{i}"), i, true)
                    .with_delay(Duration::from_millis(20))
                    .sharing(in_flight.clone()),
            )
        })
        .collect();
    let service = service_with(&cannons, 3);
    let request = radar(&[], vec![scan(2, 2, EnemyType::Soldier, 4, 0)]);

    let (first, second) = tokio::join!(service.attack(&request), service.attack(&request));

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert!(in_flight.max() <= 3, "max in flight was {}", in_flight.max());
    // No leasing: both attacks may fire the same cannon
    assert_eq!(cannons[0].fire_calls().len(), 2);
    assert_eq!(service.pool().available(), 3);
}

#[tokio::test]
async fn test_slow_cannon_excluded_by_status_timeout() {
    let slow = Arc::new(MockCannon::new("slow", 0, true).with_delay(Duration::from_secs(5)));
    let fast = Arc::new(MockCannon::new("fast", 7, true));
    let config = FleetConfig {
        status_timeout: Duration::from_millis(50),
        ..FleetConfig::default()
    };
    let service = service_with_config(&[slow.clone(), fast.clone()], 10, config);

    let report = service
        .attack(&radar(&[], vec![scan(1, 1, EnemyType::Soldier, 1, 0)]))
        .await
        .unwrap();

    assert_eq!(report.generation, 7);
    assert!(slow.fire_calls().is_empty());
}

#[tokio::test]
async fn test_cancelled_attack_does_not_fire() {
    let only = Arc::new(MockCannon::new("only", 1, true));
    let service = service_with(&[only.clone()], 10);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = service
        .attack_with_cancel(&radar(&[], vec![scan(1, 1, EnemyType::Soldier, 1, 0)]), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Fleet(FleetError::Cancelled)));
    assert!(only.fire_calls().is_empty());
}

/// After shutdown closes the pool, no attack reaches a cannon
#[tokio::test]
async fn test_closed_pool_stops_cannon_calls() {
    let a = Arc::new(MockCannon::new("a", 1, true));
    let b = Arc::new(MockCannon::new("b", 2, true));
    let service = service_with(&[a.clone(), b.clone()], 4);

    service.pool().close();

    let err = service
        .attack(&radar(&[], vec![scan(1, 1, EnemyType::Soldier, 1, 0)]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Fleet(FleetError::NoBackendAvailable {
            queried: 2,
            failed: 2
        })
    ));
    assert_eq!(a.status_calls() + b.status_calls(), 0);
    assert!(a.fire_calls().is_empty() && b.fire_calls().is_empty());
}
