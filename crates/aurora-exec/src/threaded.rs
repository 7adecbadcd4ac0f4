//! Multi-threaded host backend on a rayon pool.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use aurora_arena::MemSpace;
use aurora_core::ConfigError;

use crate::context::LaunchContext;
use crate::policy::ExecPolicy;

/// Splits loops over a dedicated rayon pool; host memory only.
#[derive(Clone)]
pub struct Threaded {
    ctx: LaunchContext,
    pool: Arc<ThreadPool>,
}

impl Threaded {
    /// Pool with `threads` workers, or rayon's default count for `None`.
    pub fn new(ctx: LaunchContext, threads: Option<usize>) -> Result<Self, ConfigError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("aurora-worker-{i}"));
        if let Some(n) = threads {
            if n == 0 {
                return Err(ConfigError::InvalidParameter {
                    reason: "threaded backend needs at least one thread".into(),
                });
            }
            builder = builder.num_threads(n);
        }
        let pool = builder.build().map_err(|e| ConfigError::InvalidParameter {
            reason: format!("failed to build thread pool: {e}"),
        })?;
        tracing::debug!(threads = pool.current_num_threads(), "threaded policy ready");
        Ok(Self {
            ctx,
            pool: Arc::new(pool),
        })
    }
}

impl fmt::Debug for Threaded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Threaded")
            .field("ctx", &self.ctx)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl ExecPolicy for Threaded {
    fn name(&self) -> &'static str {
        "threaded"
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
        self.pool.current_num_threads()
    }

    fn parallel_for<F>(&self, range: Range<usize>, body: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        self.pool.install(|| range.into_par_iter().for_each(body));
    }

    fn parallel_fill<T, F>(&self, out: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        self.pool.install(|| {
            out.par_iter_mut()
                .enumerate()
                .for_each(|(i, o)| *o = f(i));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threads_rejected() {
        assert!(Threaded::new(LaunchContext::default(), Some(0)).is_err());
    }

    #[test]
    fn explicit_thread_count() {
        let t = Threaded::new(LaunchContext::default(), Some(2)).unwrap();
        assert_eq!(t.concurrency(), 2);
    }
}
