//! Emulated accelerator backend.
//!
//! A launch is split into tiles of `tile` consecutive indices, one
//! logical device thread per tile, and the tiles run concurrently on
//! rayon's global pool. Kernels launched under this policy use the
//! device address space of every buffer they touch, so host-only
//! buffers are rejected at the first access.

use std::ops::Range;

use rayon::prelude::*;

use aurora_arena::MemSpace;
use aurora_core::ConfigError;

use crate::context::LaunchContext;
use crate::policy::ExecPolicy;

/// Tile-per-thread accelerator emulation over device memory.
#[derive(Clone, Debug)]
pub struct Device {
    ctx: LaunchContext,
    tile: usize,
}

impl Device {
    /// Default particles per logical thread.
    pub const DEFAULT_TILE: usize = 256;

    /// Device policy with `tile` indices per logical thread.
    pub fn new(ctx: LaunchContext, tile: usize) -> Result<Self, ConfigError> {
        if tile == 0 {
            return Err(ConfigError::InvalidParameter {
                reason: "device tile size must be non-zero".into(),
            });
        }
        Ok(Self { ctx, tile })
    }

    /// Indices per logical thread.
    pub fn tile(&self) -> usize {
        self.tile
    }
}

impl ExecPolicy for Device {
    fn name(&self) -> &'static str {
        "device"
    }

    fn space(&self) -> MemSpace {
        MemSpace::Device
    }

    fn context(&self) -> &LaunchContext {
        &self.ctx
    }

    fn set_context(&mut self, ctx: LaunchContext) {
        self.ctx = ctx;
    }

    fn concurrency(&self) -> usize {
        rayon::current_num_threads()
    }

    fn parallel_for<F>(&self, range: Range<usize>, body: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        let (start, end) = (range.start, range.end.max(range.start));
        let tiles = (end - start).div_ceil(self.tile);
        (0..tiles).into_par_iter().for_each(|t| {
            let lo = start + t * self.tile;
            let hi = (lo + self.tile).min(end);
            (lo..hi).for_each(&body);
        });
    }

    fn parallel_fill<T, F>(&self, out: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        out.par_chunks_mut(self.tile)
            .enumerate()
            .for_each(|(t, chunk)| {
                let base = t * self.tile;
                for (k, o) in chunk.iter_mut().enumerate() {
                    *o = f(base + k);
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tile_rejected() {
        assert!(Device::new(LaunchContext::default(), 0).is_err());
    }

    #[test]
    fn empty_range_is_noop() {
        let d = Device::new(LaunchContext::default(), 4).unwrap();
        d.parallel_for(5..5, |_| panic!("no index expected"));
        let mut out: Vec<u8> = Vec::new();
        d.parallel_fill(&mut out, |_| 1);
    }
}
