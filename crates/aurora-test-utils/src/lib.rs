//! Test fixtures and a multi-rank harness for Aurora development.
//!
//! [`run_ranks`] runs one closure per rank on its own thread, each with
//! a [`LocalComm`] wired to the others, and collects the results in rank
//! order. [`fixtures`] holds the standard grids and particle builders the
//! integration tests share.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::thread;

use aurora_comm::{LocalComm, LocalUniverse};
use aurora_core::Scalar;

/// Run `body` on `size` ranks concurrently and return the results in
/// rank order.
///
/// Panics in any rank propagate to the caller once every rank finished.
pub fn run_ranks<T, F>(size: usize, body: F) -> Vec<T>
where
    T: Send,
    F: Fn(LocalComm) -> T + Sync,
{
    let comms = LocalUniverse::create(size);
    let body = &body;
    thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .enumerate()
            .map(|(rank, comm)| {
                thread::Builder::new()
                    .name(format!("rank-{rank}"))
                    .spawn_scoped(s, move || body(comm))
                    .expect("failed to spawn rank thread")
            })
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(v) => v,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

/// Assert `|actual - expected| <= tol`.
#[track_caller]
pub fn assert_close(actual: Scalar, expected: Scalar, tol: Scalar) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected}, got {actual} (tolerance {tol})"
    );
}

/// Assert two slices agree element-wise within `tol`.
#[track_caller]
pub fn assert_all_close(actual: &[Scalar], expected: &[Scalar], tol: Scalar) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tol,
            "element {i}: expected {e}, got {a} (tolerance {tol})"
        );
    }
}
