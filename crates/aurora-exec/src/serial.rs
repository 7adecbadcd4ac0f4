//! Single-threaded host backend.

use std::ops::Range;

use aurora_arena::MemSpace;

use crate::context::LaunchContext;
use crate::policy::ExecPolicy;

/// Runs every loop in order on the calling thread.
#[derive(Clone, Debug, Default)]
pub struct Serial {
    ctx: LaunchContext,
}

impl Serial {
    /// Serial policy with launch context `ctx`.
    pub fn new(ctx: LaunchContext) -> Self {
        Self { ctx }
    }
}

impl ExecPolicy for Serial {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn space(&self) -> MemSpace {
        MemSpace::Host
    }

    fn context(&self) -> &LaunchContext {
        &self.ctx
    }

    fn set_context(&mut self, ctx: LaunchContext) {
        self.ctx = ctx;
    }

    fn concurrency(&self) -> usize {
        1
    }

    fn parallel_for<F>(&self, range: Range<usize>, body: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        range.for_each(body);
    }

    fn parallel_fill<T, F>(&self, out: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        for (i, o) in out.iter_mut().enumerate() {
            *o = f(i);
        }
    }
}
