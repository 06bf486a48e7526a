//! Public tokenizer facade.
//!
//! One [`Tokenizer`] type serves both variants; the [`InstanceSource`] it is
//! built on decides how an instance is acquired for each call:
//! - [`InstancePool`]: checkout per call, check-in when the call returns.
//!   Safe for any number of concurrent callers.
//! - [`Dedicated`]: a single instance behind a mutex. Concurrent callers
//!   serialize on it; meant for one caller at a time.

use std::sync::{Mutex, PoisonError};

use tokhost_abi::{ChatTemplateRequest, DetokenizeRequest, TokenId, TokenizeRequest};

use crate::codec::{self, Exchange};
use crate::errors::{Result, TokenizerError};
use crate::pool::{InstancePool, PoolConfig, PoolStats};
use crate::sandbox::{CompiledModule, ModuleInstance};

/// Acquire/release strategy for module instances.
pub trait InstanceSource: Send + Sync {
    type Instance: ModuleInstance;

    /// Run `f` with exclusive access to one instance. The instance is released
    /// when `f` returns, whatever it returns.
    fn with_instance<R>(&self, f: impl FnOnce(&mut Self::Instance) -> Result<R>) -> Result<R>;

    /// Idempotent.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

impl<M: CompiledModule> InstanceSource for InstancePool<M> {
    type Instance = M::Instance;

    fn with_instance<R>(&self, f: impl FnOnce(&mut M::Instance) -> Result<R>) -> Result<R> {
        let mut lease = self.checkout()?;
        f(&mut lease)
    }

    fn close(&self) {
        InstancePool::close(self)
    }

    fn is_closed(&self) -> bool {
        InstancePool::is_closed(self)
    }
}

/// Exactly one instance, bound at construction. Closing drops it.
pub struct Dedicated<I> {
    slot: Mutex<Option<I>>,
}

impl<I: ModuleInstance> Dedicated<I> {
    pub fn new(instance: I) -> Self {
        Self {
            slot: Mutex::new(Some(instance)),
        }
    }
}

impl<I: ModuleInstance> InstanceSource for Dedicated<I> {
    type Instance = I;

    fn with_instance<R>(&self, f: impl FnOnce(&mut I) -> Result<R>) -> Result<R> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_mut() {
            Some(instance) => f(instance),
            None => Err(TokenizerError::PoolClosed),
        }
    }

    fn close(&self) {
        let instance = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(instance);
    }

    fn is_closed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

pub struct Tokenizer<S> {
    source: S,
}

/// Thread-safe tokenizer over a pool of instances of one compiled module.
pub type PooledTokenizer<M> = Tokenizer<InstancePool<M>>;

/// Tokenizer bound to a single instance.
pub type SingleTokenizer<I> = Tokenizer<Dedicated<I>>;

impl<I: ModuleInstance> Tokenizer<Dedicated<I>> {
    pub fn new(instance: I) -> Self {
        Self {
            source: Dedicated::new(instance),
        }
    }
}

impl<M: CompiledModule> Tokenizer<InstancePool<M>> {
    /// Wrap a compiled module in a pool. The pool owns the module from here on.
    pub fn pooled(module: M, config: PoolConfig) -> Result<Self> {
        Ok(Self {
            source: InstancePool::new(module, config)?,
        })
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.source.stats()
    }
}

impl<S: InstanceSource> Tokenizer<S> {
    pub fn from_source(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Text to token IDs. Empty text yields no tokens without calling the module.
    pub fn tokenize(&self, text: &str, include_special_tokens: bool) -> Result<Vec<TokenId>> {
        if text.is_empty() {
            return self.ensure_open().map(|_| Vec::new());
        }
        self.exchange(&TokenizeRequest::new(text, include_special_tokens))
    }

    /// Token IDs to text. No tokens yields empty text without calling the module.
    pub fn detokenize(&self, tokens: &[TokenId], include_special_tokens: bool) -> Result<String> {
        if tokens.is_empty() {
            return self.ensure_open().map(|_| String::new());
        }
        self.exchange(&DetokenizeRequest::new(tokens, include_special_tokens))
    }

    /// Render a conversation through the module's chat template.
    /// Failures reported by the module surface as [`TokenizerError::Template`].
    pub fn chat_template(&self, request: &ChatTemplateRequest) -> Result<String> {
        self.exchange(request)
    }

    /// Release the instance (or the pool and its compiled module). Idempotent.
    pub fn close(&self) {
        self.source.close();
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_closed()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.source.is_closed() {
            Err(TokenizerError::PoolClosed)
        } else {
            Ok(())
        }
    }

    fn exchange<R: Exchange>(&self, request: &R) -> Result<R::Response> {
        let payload = codec::encode(request)?;
        self.source
            .with_instance(|instance| codec::call::<R, _>(instance, &payload))
    }
}
