//! Worker lifecycle.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use fastmetrics_client::Summary;

#[test]
fn shutdown_drains_then_refuses() {
    let worker = common::worker();
    let s = Summary::builder().name("drained").help("D.").build(&worker).unwrap();
    s.observe(1.0).unwrap();
    let child = s.labels(&[]).unwrap();
    let pending = s.snapshot().unwrap();
    assert_eq!(pending.count, 1);

    worker.shutdown().unwrap();
    // idempotent
    worker.shutdown().unwrap();

    // observe is silently dropped, reads fail
    child.observe(2.0);
    let err = child.snapshot().unwrap_err();
    assert_eq!(err.code().as_str(), "WORKER_UNAVAILABLE");
    assert_eq!(worker.stats().live_series, 0);

    // new series cannot be registered either
    let err = Summary::builder().name("late").help("L.").build(&worker).err().unwrap();
    assert_eq!(err.code().as_str(), "WORKER_UNAVAILABLE");
}

#[test]
fn dropping_handles_frees_series() {
    let worker = common::worker();
    let s = Summary::builder()
        .name("ephemeral")
        .help("E.")
        .label_names(&["k"])
        .build(&worker)
        .unwrap();
    for i in 0..10 {
        s.labels(&[&i.to_string()]).unwrap().observe(1.0);
    }
    let keep = s.labels(&["0"]).unwrap();
    keep.snapshot().unwrap();
    assert_eq!(worker.stats().live_series, 10);

    s.clear().unwrap();
    // `keep` still holds series "0"
    keep.snapshot().unwrap();
    assert_eq!(worker.stats().live_series, 1);
    assert_eq!(keep.snapshot().unwrap().count, 1);
}
