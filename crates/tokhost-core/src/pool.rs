//! Compile-once, instantiate-on-demand pool of module instances.
//!
//! The pool owns the compiled module and every instance it created. Idle
//! instances sit in a mutex-protected stack; a checkout pops one or, when
//! none is idle, instantiates a fresh one outside the lock. The pool grows
//! to match peak concurrency instead of queueing callers, unless
//! [`PoolConfig::max_instances`] caps it.
//!
//! Shutdown: [`InstancePool::close`] rejects new checkouts, drops idle
//! instances and releases the compiled module. Leases still out finish
//! their call; their instances are dropped on check-in.

use std::mem::ManuallyDrop;
use std::num::NonZeroUsize;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::errors::{Result, TokenizerError};
use crate::sandbox::CompiledModule;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolConfig {
    /// Upper bound on live instances. `None` = grow without limit.
    pub max_instances: Option<NonZeroUsize>,
    /// Instances created up front at construction.
    pub prewarm: usize,
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_instances(mut self, max: usize) -> Self {
        self.max_instances = NonZeroUsize::new(max);
        self
    }

    pub fn with_prewarm(mut self, n: usize) -> Self {
        self.prewarm = n;
        self
    }

    fn prewarm_count(&self) -> usize {
        match self.max_instances {
            Some(max) => self.prewarm.min(max.get()),
            None => self.prewarm,
        }
    }
}

/// Point-in-time bookkeeping snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances alive (idle + checked out).
    pub live: usize,
    pub idle: usize,
    pub checked_out: usize,
}

struct PoolState<I> {
    idle: Vec<I>,
    live: usize,
    checked_out: usize,
    closed: bool,
}

pub struct InstancePool<M: CompiledModule> {
    module: M,
    config: PoolConfig,
    state: Mutex<PoolState<M::Instance>>,
}

impl<M: CompiledModule> InstancePool<M> {
    /// Take ownership of a compiled module. Prewarm failures close the module and
    /// fail construction.
    pub fn new(module: M, config: PoolConfig) -> Result<Self> {
        let pool = Self {
            module,
            config,
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                live: 0,
                checked_out: 0,
                closed: false,
            }),
        };

        let n = pool.config.prewarm_count();
        if n > 0 {
            let mut warm = Vec::with_capacity(n);
            for _ in 0..n {
                // on error `pool` drops here, which closes the module
                warm.push(pool.module.instantiate().map_err(TokenizerError::Instantiate)?);
            }
            let mut st = pool.lock();
            st.live = warm.len();
            st.idle = warm;
            debug!(instances = n, "prewarmed instance pool");
        }

        Ok(pool)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Hand out an idle instance, or instantiate a new one if none is idle.
    /// The instance returns to the pool when the [`Lease`] drops.
    pub fn checkout(&self) -> Result<Lease<'_, M>> {
        {
            let mut st = self.lock();
            if st.closed {
                return Err(TokenizerError::PoolClosed);
            }
            if let Some(instance) = st.idle.pop() {
                st.checked_out += 1;
                trace!(idle = st.idle.len(), "reused pooled instance");
                return Ok(Lease::new(self, instance));
            }
            if let Some(max) = self.config.max_instances {
                if st.live >= max.get() {
                    return Err(TokenizerError::PoolExhausted { limit: max.get() });
                }
            }
            // reserve the slot so a bounded pool can't overshoot while we instantiate
            st.live += 1;
            st.checked_out += 1;
        }

        match self.module.instantiate() {
            Ok(instance) => {
                debug!(live = self.stats().live, "instantiated new module instance");
                Ok(Lease::new(self, instance))
            }
            Err(e) => {
                let mut st = self.lock();
                st.live -= 1;
                st.checked_out -= 1;
                Err(TokenizerError::Instantiate(e))
            }
        }
    }

    fn checkin(&self, instance: M::Instance) {
        let mut st = self.lock();
        st.checked_out -= 1;
        if st.closed {
            st.live -= 1;
            drop(st);
            trace!("dropped instance returned after close");
            drop(instance);
        } else {
            st.idle.push(instance);
        }
    }

    /// Reject further checkouts, drop idle instances and release the compiled module.
    /// Idempotent.
    pub fn close(&self) {
        let idle = {
            let mut st = self.lock();
            if st.closed {
                return;
            }
            st.closed = true;
            let idle = std::mem::take(&mut st.idle);
            st.live -= idle.len();
            idle
        };
        let dropped = idle.len();
        drop(idle);
        self.module.close();
        debug!(dropped, outstanding = self.stats().checked_out, "instance pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn stats(&self) -> PoolStats {
        let st = self.lock();
        PoolStats {
            live: st.live,
            idle: st.idle.len(),
            checked_out: st.checked_out,
        }
    }

    // No user code runs under this lock, so a poisoned state is still consistent.
    fn lock(&self) -> MutexGuard<'_, PoolState<M::Instance>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<M: CompiledModule> Drop for InstancePool<M> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Exclusive use of one instance. Checks the instance back in on drop,
/// including during unwinding.
pub struct Lease<'p, M: CompiledModule> {
    pool: &'p InstancePool<M>,
    instance: ManuallyDrop<M::Instance>,
}

impl<'p, M: CompiledModule> Lease<'p, M> {
    fn new(pool: &'p InstancePool<M>, instance: M::Instance) -> Self {
        Self {
            pool,
            instance: ManuallyDrop::new(instance),
        }
    }
}

impl<M: CompiledModule> Deref for Lease<'_, M> {
    type Target = M::Instance;

    fn deref(&self) -> &M::Instance {
        &self.instance
    }
}

impl<M: CompiledModule> DerefMut for Lease<'_, M> {
    fn deref_mut(&mut self) -> &mut M::Instance {
        &mut self.instance
    }
}

impl<M: CompiledModule> Drop for Lease<'_, M> {
    fn drop(&mut self) {
        // SAFETY: `instance` is never touched again after this take.
        let instance = unsafe { ManuallyDrop::take(&mut self.instance) };
        self.pool.checkin(instance);
    }
}
