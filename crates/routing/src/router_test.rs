//! Tests for Router

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::json;
use sluice_config::Config;
use sluice_model::{Bytes, Event, Record};

use crate::component::DataFlowComponent;
use crate::error::{DeliveryError, EvaluationError, RoutingError};
use crate::route::Route;
use crate::router::{DeliveryFailurePolicy, RouteSummary, Router};
use crate::strategy::{CopyOnFanOutStrategy, IdentityStrategy, IsolatingStrategy};

// =============================================================================
// Helpers
// =============================================================================

fn event_record(data: serde_json::Value) -> Record {
    Record::from_event(Event::new("event", data).unwrap())
}

fn type_route(name: &'static str, value: &'static str) -> Route {
    Route::from_fn(name, move |event| {
        Ok(event.get("type")?.as_ref().and_then(|v| v.as_str()) == Some(value))
    })
}

/// r1(type=A), r2(type=B), r3(raw)
fn scenario_batch() -> Vec<Record> {
    vec![
        event_record(json!({"type": "A"})),
        event_record(json!({"type": "B"})),
        Record::raw(Bytes::from_static(b"raw bytes")),
    ]
}

/// Router with routeA and routeB, counting no-route handler calls
fn scenario_router() -> (Router, Arc<Mutex<Vec<Event>>>) {
    let unrouted = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&unrouted);
    let router = Router::builder()
        .route(type_route("routeA", "A"))
        .route(type_route("routeB", "B"))
        .no_route_handler(move |event| sink.lock().push(event.clone()))
        .build()
        .unwrap();
    (router, unrouted)
}

/// Run `route` and collect deliveries as (component, records)
fn deliveries<'a>(
    router: &Router,
    records: &[Record],
    components: &[DataFlowComponent<&'a str>],
) -> (RouteSummary, Vec<(&'a str, Vec<Record>)>) {
    let mut calls = Vec::new();
    let summary = router
        .route(records, components, &IdentityStrategy, |c: &&'a str, d| {
            calls.push((*c, d));
            Ok::<(), Infallible>(())
        })
        .unwrap();
    (summary, calls)
}

/// Positions of delivered records in the original batch (by identity)
fn positions(records: &[Record], delivered: &[Record]) -> Vec<usize> {
    delivered
        .iter()
        .map(|d| {
            records
                .iter()
                .position(|r| r.ptr_eq(d))
                .expect("delivered record not from batch")
        })
        .collect()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_scenario_conditional_and_unconditional() {
    let (router, unrouted) = scenario_router();
    let records = scenario_batch();
    let components = vec![
        DataFlowComponent::new("C1", "C1", ["routeA"]),
        DataFlowComponent::unconditional("C2", "C2"),
    ];

    let (summary, calls) = deliveries(&router, &records, &components);

    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "C1");
    assert_eq!(positions(&records, &calls[0].1), vec![0]);
    assert_eq!(calls[1].0, "C2");
    assert_eq!(positions(&records, &calls[1].1), vec![0, 1, 2]);
    assert!(unrouted.lock().is_empty());

    assert_eq!(
        summary,
        RouteSummary {
            records: 3,
            components_delivered: 2,
            records_delivered: 4,
            unrouted_events: 0,
            unrouted_raw: 0,
            evaluation_failures: 0,
        }
    );
}

#[test]
fn test_scenario_fallback_for_unmatched_event() {
    let (router, unrouted) = scenario_router();
    let records = scenario_batch();
    let components = vec![DataFlowComponent::new("C1", "C1", ["routeA"])];

    let (summary, calls) = deliveries(&router, &records, &components);

    assert_eq!(calls.len(), 1);
    assert_eq!(positions(&records, &calls[0].1), vec![0]);

    let unrouted = unrouted.lock();
    assert_eq!(unrouted.len(), 1);
    assert!(Event::ptr_eq(&unrouted[0], records[1].as_event().unwrap()));

    // The raw record is unclaimed but never reaches the handler
    assert_eq!(summary.unrouted_events, 1);
    assert_eq!(summary.unrouted_raw, 1);
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_set_intersection_matching() {
    let router = Router::builder()
        .route(Route::from_fn("a", |_| Ok(true)))
        .route(Route::from_fn("b", |_| Ok(true)))
        .route(Route::from_fn("c", |_| Ok(false)))
        .build()
        .unwrap();
    let records = vec![event_record(json!({}))];
    let components = vec![
        DataFlowComponent::new("bc", "bc", ["b", "c"]),
        DataFlowComponent::new("c_only", "c_only", ["c"]),
    ];

    let (_, calls) = deliveries(&router, &records, &components);

    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "bc");
}

#[test]
fn test_conservation() {
    let unrouted_seen = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&unrouted_seen);
    let router = Router::builder()
        .route(Route::from_fn("even", |e| {
            Ok(e.get("n")?.and_then(|v| v.as_u64()).is_some_and(|n| n % 2 == 0))
        }))
        .route(Route::from_fn("big", |e| {
            Ok(e.get("n")?.and_then(|v| v.as_u64()).is_some_and(|n| n >= 7))
        }))
        .no_route_handler(move |event| seen.lock().push(event.clone()))
        .build()
        .unwrap();

    let mut records: Vec<Record> = (0..10).map(|n| event_record(json!({"n": n}))).collect();
    records.push(Record::raw(Bytes::from_static(b"raw")));

    let components = vec![
        DataFlowComponent::new("even", "even", ["even"]),
        DataFlowComponent::new("big", "big", ["big"]),
        DataFlowComponent::new("ghost", "ghost", ["undefined"]),
    ];

    let (summary, calls) = deliveries(&router, &records, &components);

    let mut covered = BTreeSet::new();
    for (_, delivered) in &calls {
        covered.extend(positions(&records, delivered));
    }
    for event in unrouted_seen.lock().iter() {
        let index = records
            .iter()
            .position(|r| r.as_event().is_some_and(|e| Event::ptr_eq(e, event)))
            .unwrap();
        assert!(covered.insert(index), "unrouted record {index} was also delivered");
    }
    // Raw record is the only one neither delivered nor handed to the handler
    assert!(!covered.contains(&10));
    covered.insert(10);

    assert_eq!(covered, (0..records.len()).collect::<BTreeSet<_>>());
    // 1, 3, 5 match nothing
    assert_eq!(summary.unrouted_events, 3);
    assert_eq!(summary.unrouted_raw, 1);
}

#[test]
fn test_one_call_per_component_per_batch() {
    let router = Router::builder()
        .route(Route::from_fn("all", |_| Ok(true)))
        .build()
        .unwrap();
    let records: Vec<Record> = (0..50).map(|n| event_record(json!({"n": n}))).collect();
    let components = vec![
        DataFlowComponent::new("x", "x", ["all"]),
        DataFlowComponent::unconditional("y", "y"),
    ];

    let (summary, calls) = deliveries(&router, &records, &components);

    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|(_, d)| d.len() == 50));
    assert_eq!(summary.records_delivered, 100);
}

#[test]
fn test_delivery_order_preserved() {
    let router = Router::builder().build().unwrap();
    let records: Vec<Record> = (0..5).map(|n| event_record(json!({"n": n}))).collect();
    let components = vec![DataFlowComponent::unconditional("all", "all")];

    let (_, calls) = deliveries(&router, &records, &components);
    assert_eq!(positions(&records, &calls[0].1), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_empty_batch() {
    let (router, unrouted) = scenario_router();
    let components = vec![
        DataFlowComponent::new("C1", "C1", ["routeA"]),
        DataFlowComponent::unconditional("C2", "C2"),
    ];

    let (summary, calls) = deliveries(&router, &[], &components);

    assert!(calls.is_empty());
    assert!(unrouted.lock().is_empty());
    assert_eq!(summary, RouteSummary::default());
}

#[test]
fn test_no_components_sends_all_events_to_fallback() {
    let (router, unrouted) = scenario_router();
    let records = scenario_batch();
    let components: Vec<DataFlowComponent<&str>> = Vec::new();

    let (summary, calls) = deliveries(&router, &records, &components);

    assert!(calls.is_empty());
    assert_eq!(unrouted.lock().len(), 2);
    assert_eq!(summary.unrouted_events, 2);
    assert_eq!(summary.unrouted_raw, 1);
}

#[test]
fn test_without_handler_unrouted_only_counted() {
    let router = Router::builder()
        .route(type_route("routeA", "A"))
        .build()
        .unwrap();
    let (summary, _) = deliveries(&router, &scenario_batch(), &[]);
    assert_eq!(summary.unrouted_events, 2);
    assert_eq!(router.metrics().snapshot().unrouted_events, 2);
}

#[test]
fn test_skip_empty_deliveries_tunable() {
    let records = scenario_batch();
    let components = vec![DataFlowComponent::new("none", "none", ["routeC"])];

    let router = Router::builder()
        .route(type_route("routeC", "C"))
        .build()
        .unwrap();
    assert!(router.skip_empty_deliveries());
    let (summary, calls) = deliveries(&router, &records, &components);
    assert!(calls.is_empty());
    assert_eq!(summary.components_delivered, 0);
    assert_eq!(router.metrics().snapshot().empty_deliveries_skipped, 1);

    let router = Router::builder()
        .route(type_route("routeC", "C"))
        .skip_empty_deliveries(false)
        .build()
        .unwrap();
    let (_, calls) = deliveries(&router, &records, &components);
    assert_eq!(calls.len(), 1);
    assert!(calls[0].1.is_empty());
}

#[test]
fn test_evaluation_failure_is_no_match() {
    let router = Router::builder()
        .route(Route::from_fn("broken", |_| {
            Err(EvaluationError::custom("bad field"))
        }))
        .build()
        .unwrap();
    let records = vec![event_record(json!({}))];
    let components = vec![DataFlowComponent::new("x", "x", ["broken"])];

    let (summary, calls) = deliveries(&router, &records, &components);

    assert!(calls.is_empty());
    assert_eq!(summary.evaluation_failures, 1);
    assert_eq!(summary.unrouted_events, 1);
    assert_eq!(router.metrics().snapshot().evaluation_failures, 1);
}

// =============================================================================
// Strategies
// =============================================================================

#[test]
fn test_identity_shares_event() {
    let (router, _) = scenario_router();
    let records = scenario_batch();
    let components = vec![
        DataFlowComponent::unconditional("X", "X"),
        DataFlowComponent::unconditional("Y", "Y"),
    ];

    let (_, calls) = deliveries(&router, &records, &components);
    assert!(calls[0].1[0].ptr_eq(&calls[1].1[0]));
    assert!(calls[0].1[0].ptr_eq(&records[0]));
}

#[test]
fn test_fan_out_independence_with_isolating_strategy() {
    let (router, _) = scenario_router();
    let records = scenario_batch();
    let components = vec![
        DataFlowComponent::new("X", "X", ["routeA"]),
        DataFlowComponent::new("Y", "Y", ["routeA"]),
    ];

    let mut received: Vec<Vec<Record>> = Vec::new();
    router
        .route(&records, &components, &IsolatingStrategy, |_, d| {
            // X mutates its instance before Y is called
            if let Some(event) = d[0].as_event() {
                event.put("touched", true).unwrap();
            }
            received.push(d);
            Ok::<(), Infallible>(())
        })
        .unwrap();

    let x = received[0][0].as_event().unwrap();
    let y = received[1][0].as_event().unwrap();
    assert!(!Event::ptr_eq(x, y));
    assert_eq!(x.get("touched").unwrap(), Some(json!(true)));
    // Y's instance was copied from the untouched original
    assert_eq!(records[0].as_event().unwrap().get("touched").unwrap(), None);
    y.put("other", 1).unwrap();
    assert_eq!(x.get("other").unwrap(), None);
}

#[test]
fn test_copy_on_fan_out_strategy() {
    let (router, _) = scenario_router();
    let records = scenario_batch();
    let components = vec![
        DataFlowComponent::new("X", "X", ["routeA"]),
        DataFlowComponent::unconditional("Y", "Y"),
    ];

    let mut received: Vec<Vec<Record>> = Vec::new();
    router
        .route(&records, &components, &CopyOnFanOutStrategy, |_, d| {
            received.push(d);
            Ok::<(), Infallible>(())
        })
        .unwrap();

    // r1 goes to both: each gets its own copy, neither gets the original
    assert!(!received[0][0].ptr_eq(&records[0]));
    assert!(!received[1][0].ptr_eq(&records[0]));
    assert!(!received[0][0].ptr_eq(&received[1][0]));
    // r2 only goes to Y and keeps its identity
    assert!(received[1][1].ptr_eq(&records[1]));
}

#[test]
fn test_copy_on_fan_out_mutation_by_first_component_invisible_to_second() {
    let (router, _) = scenario_router();
    let records = scenario_batch();
    let components = vec![
        DataFlowComponent::new("X", "X", ["routeA"]),
        DataFlowComponent::unconditional("Y", "Y"),
    ];

    let mut seen_by_y = None;
    router
        .route(&records, &components, &CopyOnFanOutStrategy, |c: &&str, d| {
            match *c {
                "X" => d[0].as_event().unwrap().put("touched", true).unwrap(),
                _ => seen_by_y = Some(d[0].as_event().unwrap().get("touched").unwrap()),
            }
            Ok::<(), Infallible>(())
        })
        .unwrap();

    assert_eq!(seen_by_y, Some(None));
    assert_eq!(records[0].as_event().unwrap().get("touched").unwrap(), None);
}

#[test]
fn test_copy_on_fan_out_later_component_mutation_invisible_to_earlier() {
    let (router, _) = scenario_router();
    let records = scenario_batch();
    let components = vec![
        DataFlowComponent::new("X", "X", ["routeA"]),
        DataFlowComponent::new("Y", "Y", ["routeA"]),
    ];

    let mut kept_by_x = Vec::new();
    router
        .route(&records, &components, &CopyOnFanOutStrategy, |c: &&str, d| {
            match *c {
                "X" => kept_by_x = d,
                _ => d[0].as_event().unwrap().put("touched", true).unwrap(),
            }
            Ok::<(), Infallible>(())
        })
        .unwrap();

    // X holds its batch after the call, as a sink channel would
    assert_eq!(kept_by_x[0].as_event().unwrap().get("touched").unwrap(), None);
}

// =============================================================================
// Delivery failures
// =============================================================================

#[test]
fn test_abort_on_first_failure() {
    let (router, unrouted) = scenario_router();
    assert_eq!(router.failure_policy(), DeliveryFailurePolicy::Abort);
    let records = scenario_batch();
    let components = vec![
        DataFlowComponent::new("C1", "C1", ["routeA"]),
        DataFlowComponent::unconditional("C2", "C2"),
    ];

    let mut called = Vec::new();
    let err = router
        .route(&records, &components, &IdentityStrategy, |c: &&str, _| {
            called.push(*c);
            if *c == "C1" { Err("C1 is down") } else { Ok(()) }
        })
        .unwrap_err();

    assert_eq!(called, vec!["C1"]);
    match err {
        DeliveryError::Component {
            component,
            position,
            source,
        } => {
            assert_eq!(component, "C1");
            assert_eq!(position, 0);
            assert_eq!(source, "C1 is down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // Fallback pass skipped
    assert!(unrouted.lock().is_empty());
    assert_eq!(router.metrics().snapshot().delivery_failures, 1);
}

#[test]
fn test_continue_attempts_all_components() {
    let unrouted = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&unrouted);
    let router = Router::builder()
        .route(type_route("routeA", "A"))
        .route(type_route("routeB", "B"))
        .failure_policy(DeliveryFailurePolicy::Continue)
        .no_route_handler(move |e| sink.lock().push(e.clone()))
        .build()
        .unwrap();
    let records = scenario_batch();
    let components = vec![
        DataFlowComponent::new("C1", "C1", ["routeA"]),
        DataFlowComponent::new("C2", "C2", ["routeB"]),
        DataFlowComponent::new("C3", "C3", ["routeA"]),
    ];

    let mut called = Vec::new();
    let err = router
        .route(&records, &components, &IdentityStrategy, |c: &&str, _| {
            called.push(*c);
            if *c == "C2" { Err("C2 is down") } else { Ok(()) }
        })
        .unwrap_err();

    assert_eq!(called, vec!["C1", "C2", "C3"]);
    assert_eq!(err.failed_components(), vec!["C2"]);
    match err {
        DeliveryError::Partial { failures, summary } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].position, 1);
            assert_eq!(failures[0].error, "C2 is down");
            assert_eq!(summary.components_delivered, 2);
            // r2 was handed to the failed C2, so it counts as claimed
            assert_eq!(summary.unrouted_events, 0);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(unrouted.lock().is_empty());
}

#[test]
fn test_delivery_error_display() {
    let err: DeliveryError<&str> = DeliveryError::Component {
        component: "alerts".into(),
        position: 2,
        source: "closed",
    };
    assert_eq!(err.to_string(), "delivery to component 'alerts' failed: closed");

    let err: DeliveryError<&str> = DeliveryError::Partial {
        failures: Vec::new(),
        summary: RouteSummary::default(),
    };
    assert_eq!(err.to_string(), "delivery failed for 0 component(s)");
}

// =============================================================================
// Building
// =============================================================================

#[test]
fn test_build_rejects_duplicate_routes() {
    let result = Router::builder()
        .route(type_route("A", "A"))
        .route(type_route("A", "B"))
        .build();
    assert!(matches!(result, Err(RoutingError::DuplicateRoute { name }) if name == "A"));
}

#[test]
fn test_validate_component() {
    let (router, _) = scenario_router();
    assert!(router
        .validate_component(&DataFlowComponent::new("ok", (), ["routeA", "routeB"]))
        .is_ok());
    assert!(router
        .validate_component(&DataFlowComponent::unconditional("all", ()))
        .is_ok());

    let err = router
        .validate_component(&DataFlowComponent::new("bad", (), ["routeA", "routeZ"]))
        .unwrap_err();
    assert!(matches!(
        err,
        RoutingError::UnknownRoute { component, route } if component == "bad" && route == "routeZ"
    ));
}

#[test]
fn test_from_config() {
    let config = Config::from_str(
        r#"
[router]
skip_empty_deliveries = false
on_delivery_failure = "continue"

[[routes]]
name = "errors"
[[routes.conditions]]
field = "level"
value = "error"

[[components]]
name = "alerts"
routes = ["errors"]
"#,
    )
    .unwrap();

    let router = crate::router::RouterBuilder::from_config(&config)
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(router.routes().len(), 1);
    assert!(!router.skip_empty_deliveries());
    assert_eq!(router.failure_policy(), DeliveryFailurePolicy::Continue);

    let components: Vec<_> = config
        .enabled_components()
        .map(|c| DataFlowComponent::from_config(c, c.name.clone()))
        .collect();
    let records = vec![
        event_record(json!({"level": "error"})),
        event_record(json!({"level": "info"})),
    ];

    let mut delivered = 0;
    let summary = router
        .route(&records, &components, &IdentityStrategy, |_, d| {
            delivered += d.len();
            Ok::<(), Infallible>(())
        })
        .unwrap();
    assert_eq!(delivered, 1);
    assert_eq!(summary.unrouted_events, 1);
}

#[test]
fn test_shared_metrics() {
    let metrics = Arc::new(crate::metrics::RouterMetrics::new());
    let router = Router::builder()
        .metrics(Arc::clone(&metrics))
        .build()
        .unwrap();
    deliveries(&router, &scenario_batch(), &[]);
    assert_eq!(metrics.snapshot().batches_routed, 1);
    assert!(Arc::ptr_eq(&metrics, &router.metrics_handle()));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_route_calls() {
    let handled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&handled);
    let router = Router::builder()
        .route(type_route("routeA", "A"))
        .no_route_handler(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .build()
        .unwrap();
    let components = vec![DataFlowComponent::new("C1", 0usize, ["routeA"])];

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..100 {
                    let records = scenario_batch();
                    let mut count = 0;
                    router
                        .route(&records, &components, &IdentityStrategy, |_, d| {
                            count += d.len();
                            Ok::<(), Infallible>(())
                        })
                        .unwrap();
                    assert_eq!(count, 1);
                }
            });
        }
    });

    assert_eq!(handled.load(Ordering::Relaxed), 400);
    let snap = router.metrics().snapshot();
    assert_eq!(snap.batches_routed, 400);
    assert_eq!(snap.records_delivered, 400);
}

#[test]
fn test_router_debug() {
    let (router, _) = scenario_router();
    let debug = format!("{:?}", router);
    assert!(debug.contains("Router"));
    assert!(debug.contains("routes: 2"));
}
