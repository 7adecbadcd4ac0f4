//! Esirkepov deposition stencils for one particle.
//!
//! Stencil offsets are relative to the particle's cell before the push.
//! Along each axis the stencil covers `1 - R ..= R`, widened by one on
//! the side the particle moved to:
//!
//! ```text
//! dc = -1   -R    ..= R
//! dc =  0   1 - R ..= R
//! dc = +1   1 - R ..= R + 1
//! ```
//!
//! `s0[i] = S(i - x)` is the shape before the move and
//! `s1[i] = S(i - new_x - dc)` after it, both seen from the old cell.

use aurora_arena::AtomicArray;
use aurora_core::Scalar;
use aurora_exec::ExecPolicy;

use crate::deposit::CurrentMesh;
use crate::shape::{Shape, MAX_RADIUS};

const MAX_POINTS: usize = 2 * MAX_RADIUS as usize + 2;

/// What a push produces for one particle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Motion {
    /// Sub-cell position relative to the new cell (physical coordinate
    /// on axes beyond the mesh dimension).
    pub new_x: [Scalar; 3],
    /// Cell displacement per axis.
    pub dc: [i32; 3],
    /// Momentum after the push.
    pub new_p: [Scalar; 3],
    /// Energy after the push.
    pub energy: Scalar,
}

impl Motion {
    /// True if the particle moved more than one cell along any axis.
    pub fn violates_cfl(&self) -> bool {
        self.dc.iter().any(|d| d.abs() > 1)
    }
}

/// Everything a stencil needs about one particle's move.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trajectory {
    /// Sub-cell position before the push, relative to the old cell.
    pub x: [Scalar; 3],
    /// Sub-cell position after the push, relative to the new cell.
    pub new_x: [Scalar; 3],
    /// Cell displacement, each component in `{-1, 0, 1}`.
    pub dc: [i32; 3],
    /// Charge times statistical weight.
    pub weight: Scalar,
    /// Species index for the charge density.
    pub species: usize,
}

/// Atomic write access to a [`CurrentMesh`] around one old cell.
///
/// Points outside the local extent are dropped.
#[derive(Debug)]
pub struct MeshTarget<'a, P, const D: usize> {
    policy: &'a P,
    mesh: &'a CurrentMesh<D>,
    base: [u32; 3],
    rho: bool,
}

impl<'a, P: ExecPolicy, const D: usize> MeshTarget<'a, P, D> {
    /// Target centred on cell `base`. Charge density is written only
    /// if `rho` is set and the mesh carries it.
    pub fn new(policy: &'a P, mesh: &'a CurrentMesh<D>, base: [u32; 3], rho: bool) -> Self {
        Self {
            policy,
            mesh,
            base,
            rho,
        }
    }

    #[inline]
    fn point(&self, array: &AtomicArray<D>, off: [i32; 3]) -> Option<[u32; D]> {
        let dims = array.extent().dims();
        let mut pos = [0u32; D];
        for d in 0..D {
            let p = i64::from(self.base[d]) + i64::from(off[d]);
            if p < 0 || p >= i64::from(dims[d]) {
                return None;
            }
            pos[d] = p as u32;
        }
        Some(pos)
    }

    /// Add `v` to current component `comp` at `base + off`.
    #[inline]
    pub fn add_j(&self, comp: usize, off: [i32; 3], v: Scalar) {
        let array = self.mesh.j(comp);
        if let Some(pos) = self.point(array, off) {
            self.policy.atomic_add(array.at(pos), v);
        }
    }

    /// Add `v` to the charge density of `species` at `base + off`.
    #[inline]
    pub fn add_rho(&self, species: usize, off: [i32; 3], v: Scalar) {
        if !self.rho {
            return;
        }
        if let Some(array) = self.mesh.rho(species) {
            if let Some(pos) = self.point(array, off) {
                self.policy.atomic_add(array.at(pos), v);
            }
        }
    }
}

/// Shape weights along one axis before and after the move.
#[derive(Clone, Copy, Debug)]
struct AxisWeights {
    lo: i32,
    len: usize,
    s0: [Scalar; MAX_POINTS],
    s1: [Scalar; MAX_POINTS],
}

impl AxisWeights {
    #[inline]
    fn new<S: Shape>(x: Scalar, new_x: Scalar, dc: i32) -> Self {
        let lo = if dc == -1 { -S::RADIUS } else { 1 - S::RADIUS };
        let hi = if dc == 1 { S::RADIUS + 1 } else { S::RADIUS };
        let mut w = Self {
            lo,
            len: (hi - lo + 1) as usize,
            s0: [0.0; MAX_POINTS],
            s1: [0.0; MAX_POINTS],
        };
        let shift = new_x + dc as Scalar;
        for k in 0..w.len {
            let i = (lo + k as i32) as Scalar;
            w.s0[k] = S::eval(i - x);
            w.s1[k] = S::eval(i - shift);
        }
        w
    }

    /// `(slot, offset)` pairs of the stencil.
    #[inline]
    fn offsets(&self) -> impl Iterator<Item = (usize, i32)> {
        let lo = self.lo;
        (0..self.len).map(move |k| (k, lo + k as i32))
    }
}

#[inline]
fn center2d(sx0: Scalar, sx1: Scalar, sy0: Scalar, sy1: Scalar) -> Scalar {
    (2.0 * sx1 * sy1 + sx0 * sy1 + sx1 * sy0 + 2.0 * sx0 * sy0) / 6.0
}

#[inline]
fn movement2d(sx0: Scalar, sx1: Scalar, sy0: Scalar, sy1: Scalar) -> Scalar {
    (sy1 - sy0) * 0.5 * (sx0 + sx1)
}

#[inline]
fn movement3d(
    sx0: Scalar,
    sx1: Scalar,
    sy0: Scalar,
    sy1: Scalar,
    sz0: Scalar,
    sz1: Scalar,
) -> Scalar {
    (sz1 - sz0) * center2d(sx0, sx1, sy0, sy1)
}

/// One-dimensional stencil: `J0` from the cumulative shape difference,
/// `J1` and `J2` from the transverse velocity.
pub fn deposit_1d<S: Shape, P: ExecPolicy, const D: usize>(
    t: &Trajectory,
    out: &MeshTarget<'_, P, D>,
    dt: Scalar,
) {
    let wx = AxisWeights::new::<S>(t.x[0], t.new_x[0], t.dc[0]);
    let vy = (t.new_x[1] - t.x[1]) / dt;
    let vz = (t.new_x[2] - t.x[2]) / dt;
    let mut djx = 0.0;
    for (ii, i) in wx.offsets() {
        let (sx0, sx1) = (wx.s0[ii], wx.s1[ii]);
        let off = [i, 0, 0];
        djx += sx1 - sx0;
        out.add_j(0, off, -t.weight * djx / dt);
        let center = 0.5 * (sx0 + sx1);
        out.add_j(1, off, t.weight * vy * center);
        out.add_j(2, off, t.weight * vz * center);
        out.add_rho(t.species, off, t.weight * sx1);
    }
}

/// Two-dimensional stencil: `J0`, `J1` from cumulative differences,
/// `J2` from the out-of-plane velocity.
pub fn deposit_2d<S: Shape, P: ExecPolicy, const D: usize>(
    t: &Trajectory,
    out: &MeshTarget<'_, P, D>,
    dt: Scalar,
) {
    let wx = AxisWeights::new::<S>(t.x[0], t.new_x[0], t.dc[0]);
    let wy = AxisWeights::new::<S>(t.x[1], t.new_x[1], t.dc[1]);
    let vz = (t.new_x[2] - t.x[2]) / dt;
    let mut djy = [0.0; MAX_POINTS];
    for (jj, j) in wy.offsets() {
        let (sy0, sy1) = (wy.s0[jj], wy.s1[jj]);
        let mut djx = 0.0;
        for (ii, i) in wx.offsets() {
            let (sx0, sx1) = (wx.s0[ii], wx.s1[ii]);
            let off = [i, j, 0];
            djx += movement2d(sy0, sy1, sx0, sx1);
            out.add_j(0, off, -t.weight * djx / dt);
            djy[ii] += movement2d(sx0, sx1, sy0, sy1);
            out.add_j(1, off, -t.weight * djy[ii] / dt);
            out.add_j(2, off, t.weight * vz * center2d(sx0, sx1, sy0, sy1));
            out.add_rho(t.species, off, t.weight * sx1 * sy1);
        }
    }
}

/// Three-dimensional stencil: all components from cumulative differences.
pub fn deposit_3d<S: Shape, P: ExecPolicy, const D: usize>(
    t: &Trajectory,
    out: &MeshTarget<'_, P, D>,
    dt: Scalar,
) {
    let wx = AxisWeights::new::<S>(t.x[0], t.new_x[0], t.dc[0]);
    let wy = AxisWeights::new::<S>(t.x[1], t.new_x[1], t.dc[1]);
    let wz = AxisWeights::new::<S>(t.x[2], t.new_x[2], t.dc[2]);
    let mut djz = [[0.0; MAX_POINTS]; MAX_POINTS];
    for (kk, k) in wz.offsets() {
        let (sz0, sz1) = (wz.s0[kk], wz.s1[kk]);
        let mut djy = [0.0; MAX_POINTS];
        for (jj, j) in wy.offsets() {
            let (sy0, sy1) = (wy.s0[jj], wy.s1[jj]);
            let mut djx = 0.0;
            for (ii, i) in wx.offsets() {
                let (sx0, sx1) = (wx.s0[ii], wx.s1[ii]);
                let off = [i, j, k];
                djx += movement3d(sy0, sy1, sz0, sz1, sx0, sx1);
                out.add_j(0, off, -t.weight * djx / dt);
                djy[ii] += movement3d(sz0, sz1, sx0, sx1, sy0, sy1);
                out.add_j(1, off, -t.weight * djy[ii] / dt);
                djz[jj][ii] += movement3d(sx0, sx1, sy0, sy1, sz0, sz1);
                out.add_j(2, off, -t.weight * djz[jj][ii] / dt);
                out.add_rho(t.species, off, t.weight * sx1 * sy1 * sz1);
            }
        }
    }
}
