//! Capability interface between the pool/facade and whatever runs the module.

use thiserror::Error;
use tokhost_abi::EntryPoint;

/// Opaque failure reported by a sandbox backend (compile, instantiate or call).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SandboxError(String);

impl SandboxError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Once-compiled module. Shared read-only; instantiation may run concurrently.
pub trait CompiledModule: Send + Sync {
    type Instance: ModuleInstance;

    fn instantiate(&self) -> Result<Self::Instance, SandboxError>;

    /// Release the compiled representation. Must be idempotent.
    /// `instantiate` after `close` fails.
    fn close(&self);
}

/// One live execution context. Not thread-safe: `&mut self` keeps calls exclusive.
pub trait ModuleInstance: Send {
    fn call(&mut self, entry: EntryPoint, input: &[u8]) -> Result<Vec<u8>, SandboxError>;
}
