//! Aurora two-rank demo: a pair plasma drifting across a domain seam.
//!
//! Demonstrates:
//!   1. Splitting a periodic 2D mesh over two ranks
//!   2. Filling every cell with electron-positron pairs
//!   3. Driving them with a uniform-field Boris pusher
//!   4. Watching migration traffic and the deposited current per step
//!
//! Run with:
//!   RUST_LOG=aurora_engine=debug cargo run --example two_rank_demo

use std::thread;

use aurora_comm::{Communicator, LocalUniverse};
use aurora_engine::{Engine, EngineConfig, StepError, UniformBoris};
use aurora_exec::Backend;
use aurora_space::{DomainConfig, GridConfig};
use tracing_subscriber::EnvFilter;

// ─── Run parameters ─────────────────────────────────────────────

const RANKS: usize = 2;
const CELLS: u32 = 32;
const PAIRS_PER_CELL: usize = 4;
const STEPS: u64 = 20;

fn run_rank(comm: Box<dyn Communicator>) -> Result<(usize, usize), StepError> {
    let cfg = EngineConfig::<2> {
        grid: GridConfig::uniform(CELLS, 2),
        domain: DomainConfig {
            ranks: [RANKS as u32, 1],
            periodic: [true, true],
        },
        capacity: 1 << 16,
        staging_capacity: 1 << 12,
        dt: 0.4,
        deposit_rho: true,
        backend: Backend::Threaded { threads: Some(2) },
        seed: 2024,
        ..Default::default()
    };
    let pusher = UniformBoris {
        e: [0.05, 0.0, 0.0],
        b: [0.0, 0.0, 1.0],
    };
    let mut engine = match Engine::with_pusher(cfg, comm, pusher) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, "engine configuration rejected");
            return Ok((0, 0));
        }
    };
    let injected = engine
        .fill_multiplicity(PAIRS_PER_CELL, 1.0)
        .unwrap_or_default();

    for _ in 0..STEPS {
        let out = engine.step()?;
        tracing::info!(
            rank = engine.rank(),
            step = out.step.0,
            sent = out.metrics.sent,
            received = out.metrics.received,
            jx = engine.mesh().j(0).total(),
            total_us = out.metrics.total_us,
            "step"
        );
    }
    Ok((injected, engine.particles().live_count()))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let comms = LocalUniverse::create(RANKS);
    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| s.spawn(move || run_rank(Box::new(comm))))
            .collect();
        handles.into_iter().map(|h| h.join()).collect()
    });

    let mut injected = 0;
    let mut held = 0;
    for (rank, result) in results.into_iter().enumerate() {
        match result {
            Ok(Ok((i, h))) => {
                injected += i;
                held += h;
            }
            Ok(Err(e)) => eprintln!("rank {rank}: {e}"),
            Err(_) => eprintln!("rank {rank} panicked"),
        }
    }
    println!("injected {injected} particles, {held} live after {STEPS} steps");
}
