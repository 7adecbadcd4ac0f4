//! The execution-policy capability interface.

use std::fmt;
use std::ops::Range;

use aurora_arena::{AtomicScalar, MemSpace};
use aurora_core::{ConfigError, Scalar};

use crate::context::LaunchContext;
use crate::device::Device;
use crate::serial::Serial;
use crate::threaded::Threaded;

/// What a backend must provide for the substrate's kernels to run on it.
///
/// `parallel_for` bodies may only write shared state through
/// [`atomic_add`](ExecPolicy::atomic_add) or other atomics;
/// `parallel_fill` gives each index exclusive ownership of one output
/// slot. Neither makes any ordering promise between indices.
pub trait ExecPolicy: Send + Sync {
    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Address space kernels under this policy read and write.
    fn space(&self) -> MemSpace;

    /// Grid and step parameters for the current launch.
    fn context(&self) -> &LaunchContext;

    /// Replace the launch parameters.
    fn set_context(&mut self, ctx: LaunchContext);

    /// Number of independent workers, used to size per-task partitions.
    fn concurrency(&self) -> usize;

    /// Run `body(i)` for every `i` in `range`.
    fn parallel_for<F>(&self, range: Range<usize>, body: F)
    where
        F: Fn(usize) + Sync + Send;

    /// Set `out[i] = f(i)` for every slot.
    fn parallel_fill<T, F>(&self, out: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;

    /// Atomically add `v` to a shared accumulator.
    #[inline]
    fn atomic_add(&self, target: &AtomicScalar, v: Scalar) {
        target.fetch_add(v);
    }
}

/// Backend selection for configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    /// Single host thread.
    #[default]
    Serial,
    /// Host thread pool. `None` uses rayon's default thread count.
    Threaded {
        /// Worker threads.
        threads: Option<usize>,
    },
    /// Emulated accelerator with the given particle tile size.
    Device {
        /// Particles per logical device thread.
        tile: usize,
    },
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => f.write_str("serial"),
            Self::Threaded { threads: Some(n) } => write!(f, "threaded({n})"),
            Self::Threaded { threads: None } => f.write_str("threaded"),
            Self::Device { tile } => write!(f, "device(tile={tile})"),
        }
    }
}

/// Runtime-selected policy, dispatching to one of the three backends.
#[derive(Debug)]
pub enum Policy {
    /// See [`Serial`].
    Serial(Serial),
    /// See [`Threaded`].
    Threaded(Threaded),
    /// See [`Device`].
    Device(Device),
}

impl Policy {
    /// Build the policy named by `backend`.
    pub fn from_backend(backend: Backend, ctx: LaunchContext) -> Result<Self, ConfigError> {
        Ok(match backend {
            Backend::Serial => Self::Serial(Serial::new(ctx)),
            Backend::Threaded { threads } => Self::Threaded(Threaded::new(ctx, threads)?),
            Backend::Device { tile } => Self::Device(Device::new(ctx, tile)?),
        })
    }
}

macro_rules! dispatch {
    ($self:ident, $p:ident => $e:expr) => {
        match $self {
            Policy::Serial($p) => $e,
            Policy::Threaded($p) => $e,
            Policy::Device($p) => $e,
        }
    };
}

impl ExecPolicy for Policy {
    fn name(&self) -> &'static str {
        dispatch!(self, p => p.name())
    }

    fn space(&self) -> MemSpace {
        dispatch!(self, p => p.space())
    }

    fn context(&self) -> &LaunchContext {
        dispatch!(self, p => p.context())
    }

    fn set_context(&mut self, ctx: LaunchContext) {
        dispatch!(self, p => p.set_context(ctx))
    }

    fn concurrency(&self) -> usize {
        dispatch!(self, p => p.concurrency())
    }

    fn parallel_for<F>(&self, range: Range<usize>, body: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        dispatch!(self, p => p.parallel_for(range, body))
    }

    fn parallel_fill<T, F>(&self, out: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        dispatch!(self, p => p.parallel_fill(out, f))
    }
}
