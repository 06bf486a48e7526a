use std::path::PathBuf;

use thiserror::Error;
use tokhost_abi::EntryPoint;

use crate::sandbox::SandboxError;

#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("failed to compile module {}: {reason}", path.display())]
    Compile { path: PathBuf, reason: String },

    #[error("failed to instantiate module: {0}")]
    Instantiate(#[source] SandboxError),

    #[error("instance pool exhausted: {limit} instances already live")]
    PoolExhausted { limit: usize },

    #[error("tokenizer is closed")]
    PoolClosed,

    #[error("failed to encode `{entry}` request: {source}")]
    Encode {
        entry: EntryPoint,
        #[source]
        source: rmp_serde::encode::Error,
    },

    /// `payload` is the raw buffer the module returned.
    #[error("failed to decode `{entry}` response ({} bytes): {reason}", payload.len())]
    Decode {
        entry: EntryPoint,
        payload: Vec<u8>,
        reason: String,
    },

    #[error("chat template rejected: {0}")]
    Template(#[source] SandboxError),

    #[error("`{entry}` call failed: {source}")]
    Call {
        entry: EntryPoint,
        #[source]
        source: SandboxError,
    },
}

impl TokenizerError {
    /// Failure reported by the module itself, as opposed to host-side plumbing.
    pub fn is_module_failure(&self) -> bool {
        matches!(self, TokenizerError::Template(_) | TokenizerError::Call { .. })
    }
}

pub type Result<T> = std::result::Result<T, TokenizerError>;
