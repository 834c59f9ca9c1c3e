//! Summary behaviour through the background worker.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;

use fastmetrics_client::{Collector, Summary};
use fastmetrics_core::clock::ManualClock;

#[test]
fn count_sum_and_quantiles() {
    let worker = common::worker();
    let s = Summary::builder()
        .name("request_seconds")
        .help("Request latency.")
        .quantile(0.5, 0.05)
        .quantile(0.99, 0.001)
        .build(&worker)
        .unwrap();

    for v in 1..=100 {
        s.observe(v as f64).unwrap();
    }
    let v = s.snapshot().unwrap();
    assert_eq!(v.count, 100);
    assert_eq!(v.sum, 5050.0);
    let p50 = v.quantile(0.5).unwrap();
    assert!((45.0..=56.0).contains(&p50), "p50 {p50}");
    let p99 = v.quantile(0.99).unwrap();
    assert!((97.0..=100.0).contains(&p99), "p99 {p99}");
}

#[test]
fn no_quantiles_tracks_count_and_sum_only() {
    let worker = common::worker();
    let s = Summary::builder().name("bytes").help("Payload size.").build(&worker).unwrap();
    s.observe(3.0).unwrap();
    s.observe(4.5).unwrap();
    let v = s.snapshot().unwrap();
    assert_eq!(v.count, 2);
    assert_eq!(v.sum, 7.5);
    assert!(v.quantiles.is_empty());
}

#[test]
fn snapshot_before_any_observation() {
    let worker = common::worker();
    let s = Summary::builder()
        .name("idle")
        .help("Never observed.")
        .quantile(0.5, 0.05)
        .build(&worker)
        .unwrap();
    let v = s.snapshot().unwrap();
    assert_eq!(v.count, 0);
    assert!(v.quantile(0.5).unwrap().is_nan());
}

#[test]
fn observations_from_many_threads_are_all_counted() {
    let worker = common::worker();
    let s = Summary::builder()
        .name("work_seconds")
        .help("Work.")
        .quantile(0.5, 0.05)
        .build(&worker)
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let s = s.clone();
            std::thread::spawn(move || {
                for _ in 0..1_000 {
                    s.observe(1.0).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let v = s.snapshot().unwrap();
    assert_eq!(v.count, 8_000);
    assert_eq!(v.sum, 8_000.0);
}

#[test]
fn labelled_children_are_independent() {
    let worker = common::worker();
    let s = Summary::builder()
        .name("rpc_seconds")
        .help("RPC latency.")
        .label_names(&["method"])
        .build(&worker)
        .unwrap();

    s.labels(&["get"]).unwrap().observe(1.0);
    s.labels(&["get"]).unwrap().observe(2.0);
    s.labels(&["put"]).unwrap().observe(10.0);

    assert_eq!(s.labels(&["get"]).unwrap().snapshot().unwrap().count, 2);
    assert_eq!(s.labels(&["put"]).unwrap().snapshot().unwrap().sum, 10.0);
}

#[test]
fn label_cardinality_is_checked() {
    let worker = common::worker();
    let s = Summary::builder()
        .name("rpc_seconds")
        .help("RPC latency.")
        .label_names(&["method", "code"])
        .build(&worker)
        .unwrap();

    let err = s.labels(&["get"]).err().unwrap();
    assert_eq!(err.code().as_str(), "LABEL_CARDINALITY");
    // labelled summaries have no unlabelled series
    assert!(s.observe(1.0).is_err());
}

#[test]
fn builder_validation() {
    let worker = common::worker();
    let base = || Summary::builder().name("x").help("x");

    let e = base().label_names(&["quantile"]).build(&worker).err().unwrap();
    assert_eq!(e.to_string(), "invalid name: Summary cannot have a label named 'quantile'.");

    let e = base().quantile(1.1, 0.01).build(&worker).err().unwrap();
    assert_eq!(e.code().as_str(), "INVALID_ARGUMENT");
    assert!(base().quantile(0.5, 2.0).build(&worker).is_err());
    assert!(base().max_age_seconds(0).build(&worker).is_err());
    assert!(base().age_buckets(0).build(&worker).is_err());
    assert!(Summary::builder().name("x").build(&worker).is_err());
    assert!(Summary::builder().help("x").build(&worker).is_err());
    assert!(base().name("bad-name").build(&worker).is_err());
    assert!(base().label_names(&["__reserved"]).build(&worker).is_err());
}

#[test]
fn namespace_and_subsystem_prefix_the_name() {
    let worker = common::worker();
    let s = Summary::builder()
        .namespace("app")
        .subsystem("db")
        .name("query_seconds")
        .help("Query latency.")
        .build(&worker)
        .unwrap();
    assert_eq!(s.name(), "app_db_query_seconds");
}

#[test]
fn duplicate_quantiles_collapse() {
    let worker = common::worker();
    let s = Summary::builder()
        .name("dup")
        .help("Duplicate targets.")
        .quantile(0.9, 0.05)
        .quantile(0.5, 0.05)
        .quantile(0.9, 0.01)
        .build(&worker)
        .unwrap();
    s.observe(1.0).unwrap();
    let qs: Vec<f64> = s.snapshot().unwrap().quantiles.iter().map(|(q, _)| *q).collect();
    assert_eq!(qs, vec![0.5, 0.9]);
}

#[test]
fn window_expires_old_observations() {
    let worker = common::worker();
    let clock = Arc::new(ManualClock::new(1_000_000));
    let s = Summary::builder()
        .name("windowed")
        .help("Windowed.")
        .quantile(0.5, 0.01)
        .max_age_seconds(10)
        .age_buckets(2)
        .clock(clock.clone())
        .build(&worker)
        .unwrap();

    s.observe(5.0).unwrap();
    assert_eq!(s.snapshot().unwrap().quantile(0.5), Some(5.0));

    clock.advance(10_001);
    let v = s.snapshot().unwrap();
    assert!(v.quantile(0.5).unwrap().is_nan());
    // count and sum are cumulative, not windowed
    assert_eq!(v.count, 1);
    assert_eq!(v.now_millis, 1_010_001);
}

#[test]
fn collect_emits_quantile_sum_count_per_child() {
    let worker = common::worker();
    let s = Summary::builder()
        .name("rpc_seconds")
        .help("RPC latency.")
        .label_names(&["method"])
        .quantile(0.5, 0.05)
        .build(&worker)
        .unwrap();
    s.labels(&["put"]).unwrap().observe(4.0);
    s.labels(&["get"]).unwrap().observe(2.0);

    let fams = s.collect().unwrap();
    assert_eq!(fams.len(), 1);
    let names: Vec<(&str, String)> = fams[0]
        .samples
        .iter()
        .map(|x| {
            let labels: Vec<String> = x.labels.iter().map(|(k, v)| format!("{k}={v}")).collect();
            (x.name.as_str(), labels.join(","))
        })
        .collect();
    assert_eq!(
        names,
        vec![
            ("rpc_seconds", "method=get,quantile=0.5".to_string()),
            ("rpc_seconds_sum", "method=get".to_string()),
            ("rpc_seconds_count", "method=get".to_string()),
            ("rpc_seconds", "method=put,quantile=0.5".to_string()),
            ("rpc_seconds_sum", "method=put".to_string()),
            ("rpc_seconds_count", "method=put".to_string()),
        ]
    );
    assert_eq!(fams[0].samples[0].value, 2.0);

    let described = s.describe();
    assert!(described[0].samples.is_empty());
}

#[test]
fn remove_and_clear_drop_series() {
    let worker = common::worker();
    let s = Summary::builder()
        .name("rpc_seconds")
        .help("RPC latency.")
        .label_names(&["method"])
        .build(&worker)
        .unwrap();
    s.labels(&["get"]).unwrap().observe(1.0);
    s.labels(&["put"]).unwrap().observe(1.0);

    s.remove(&["get"]);
    assert_eq!(s.collect().unwrap()[0].samples.len(), 2);
    // a re-created child starts from zero
    assert_eq!(s.labels(&["get"]).unwrap().snapshot().unwrap().count, 0);

    s.clear().unwrap();
    assert!(s.collect().unwrap()[0].samples.is_empty());
}

#[test]
fn clear_recreates_unlabelled_series() {
    let worker = common::worker();
    let s = Summary::builder().name("plain").help("Plain.").build(&worker).unwrap();
    s.observe(2.0).unwrap();
    s.clear().unwrap();
    let v = s.snapshot().unwrap();
    assert_eq!(v.count, 0);
}

#[test]
fn timer_observes_elapsed_seconds() {
    let worker = common::worker();
    let s = Summary::builder().name("timed").help("Timed.").build(&worker).unwrap();
    let child = s.labels(&[]).unwrap();

    let t = child.start_timer();
    std::thread::sleep(std::time::Duration::from_millis(5));
    let secs = t.observe_duration();
    assert!(secs >= 0.005);

    {
        let _t = child.start_timer();
    }
    let out = child.time(|| 7);
    assert_eq!(out, 7);

    let v = child.snapshot().unwrap();
    assert_eq!(v.count, 3);
    assert!(v.sum >= 0.005);
}

#[tokio::test]
async fn snapshot_async_from_runtime() {
    let worker = common::worker();
    let s = Summary::builder().name("async_seen").help("Async.").build(&worker).unwrap();
    let child = s.labels(&[]).unwrap();
    child.observe(1.5);
    let v = child.snapshot_async().await.unwrap();
    assert_eq!(v.count, 1);
    assert_eq!(v.sum, 1.5);
}

#[test]
fn minimum_and_maximum_targets() {
    let worker = common::worker();
    let s = Summary::builder()
        .name("extremes")
        .help("Min and max.")
        .quantile(0.0, 0.01)
        .quantile(1.0, 0.01)
        .build(&worker)
        .unwrap();
    for v in 1..=1000 {
        s.observe(v as f64).unwrap();
    }
    let v = s.snapshot().unwrap();
    let min = v.quantile(0.0).unwrap();
    assert!((1.0..=11.0).contains(&min), "min {min}");
    let max = v.quantile(1.0).unwrap();
    assert!((990.0..=1000.0).contains(&max), "max {max}");
}
