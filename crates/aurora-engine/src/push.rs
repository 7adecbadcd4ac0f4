//! The particle pusher hook and two reference pushers.
//!
//! A [`Pusher`] maps one particle to its [`Motion`]: the new momentum
//! and energy, the new sub-cell position and the cell displacement. It
//! never touches the particle array; the engine commits the motion
//! after deposition has consumed both the old and new positions.

use std::fmt;

use aurora_core::{check_flag, ptc_type, PtcFlag, Scalar};
use aurora_deposit::Motion;
use aurora_particles::Particle;
use aurora_space::Grid;

use crate::config::SpeciesTable;

/// Per-step inputs every pusher may read.
#[derive(Clone, Copy, Debug)]
pub struct PushContext<'a, const D: usize> {
    /// Local grid.
    pub grid: &'a Grid<D>,
    /// Species charges and masses.
    pub species: &'a SpeciesTable,
    /// Timestep.
    pub dt: Scalar,
}

/// Advances one particle by one timestep.
///
/// Called concurrently for different particles; implementations must
/// not keep per-call mutable state.
pub trait Pusher<const D: usize>: Send + Sync + fmt::Debug {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Motion of `ptc` over one step.
    fn push(&self, ptc: &Particle, ctx: &PushContext<'_, D>) -> Motion;
}

/// Move along momentum `p` with Lorentz factor `gamma`.
///
/// Resolved axes advance in cell units and report the whole-cell part
/// as the displacement; the remaining axes advance in physical units.
pub fn advance<const D: usize>(
    x: [Scalar; 3],
    p: [Scalar; 3],
    gamma: Scalar,
    grid: &Grid<D>,
    dt: Scalar,
) -> ([Scalar; 3], [i32; 3]) {
    let inv_delta = grid.inv_delta();
    let mut new_x = x;
    let mut dc = [0i32; 3];
    for d in 0..3 {
        let v = p[d] / gamma * dt;
        if d < D {
            let moved = x[d] + v * inv_delta[d];
            let whole = moved.floor();
            let mut frac = moved - whole;
            dc[d] = whole as i32;
            // A tiny negative `moved` rounds up to exactly one.
            if frac >= 1.0 {
                frac -= 1.0;
                dc[d] += 1;
            }
            new_x[d] = frac;
        } else {
            new_x[d] = x[d] + v;
        }
    }
    (new_x, dc)
}

fn lorentz_factor(p: [Scalar; 3]) -> Scalar {
    (1.0 + p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt()
}

fn cross(a: [Scalar; 3], b: [Scalar; 3]) -> [Scalar; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

// ── FreeStreaming ──────────────────────────────────────────────────

/// Ballistic motion at constant momentum.
#[derive(Clone, Copy, Debug, Default)]
pub struct FreeStreaming;

impl<const D: usize> Pusher<D> for FreeStreaming {
    fn name(&self) -> &str {
        "free-streaming"
    }

    fn push(&self, ptc: &Particle, ctx: &PushContext<'_, D>) -> Motion {
        let gamma = lorentz_factor(ptc.p);
        let (new_x, dc) = advance(ptc.x, ptc.p, gamma, ctx.grid, ctx.dt);
        Motion {
            new_x,
            dc,
            new_p: ptc.p,
            energy: gamma,
        }
    }
}

// ── UniformBoris ───────────────────────────────────────────────────

/// Relativistic Boris push in spatially uniform, static fields.
///
/// Particles flagged [`PtcFlag::IgnoreForce`] or [`PtcFlag::IgnoreEm`]
/// stream freely.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UniformBoris {
    /// Electric field.
    pub e: [Scalar; 3],
    /// Magnetic field.
    pub b: [Scalar; 3],
}

impl UniformBoris {
    /// Momentum after one Boris rotation for charge-to-mass `q_over_m`.
    pub fn kick(&self, p: [Scalar; 3], q_over_m: Scalar, dt: Scalar) -> [Scalar; 3] {
        let h = 0.5 * q_over_m * dt;
        let mut u = [0.0; 3];
        for d in 0..3 {
            u[d] = p[d] + h * self.e[d];
        }
        let gamma = lorentz_factor(u);
        let t = self.b.map(|b| h * b / gamma);
        let t2 = t[0] * t[0] + t[1] * t[1] + t[2] * t[2];
        let s = t.map(|c| 2.0 * c / (1.0 + t2));

        let ut = cross(u, t);
        let mut u_prime = [0.0; 3];
        for d in 0..3 {
            u_prime[d] = u[d] + ut[d];
        }
        let us = cross(u_prime, s);
        let mut out = [0.0; 3];
        for d in 0..3 {
            out[d] = u[d] + us[d] + h * self.e[d];
        }
        out
    }
}

impl<const D: usize> Pusher<D> for UniformBoris {
    fn name(&self) -> &str {
        "uniform-boris"
    }

    fn push(&self, ptc: &Particle, ctx: &PushContext<'_, D>) -> Motion {
        let free = check_flag(ptc.flag, PtcFlag::IgnoreForce)
            || check_flag(ptc.flag, PtcFlag::IgnoreEm);
        let new_p = if free {
            ptc.p
        } else {
            let species = ptc_type(ptc.flag) as usize;
            self.kick(ptc.p, ctx.species.q_over_m(species), ctx.dt)
        };
        let gamma = lorentz_factor(new_p);
        let (new_x, dc) = advance(ptc.x, new_p, gamma, ctx.grid, ctx.dt);
        Motion {
            new_x,
            dc,
            new_p,
            energy: gamma,
        }
    }
}
