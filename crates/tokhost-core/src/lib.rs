//! tokhost-core
//!
//! Shares one compiled tokenizer module between many concurrent callers.
//! - `sandbox`: capability traits any sandbox backend implements.
//! - `pool`: compile-once, instantiate-on-demand instance pool.
//! - `codec`: MessagePack exchange at the sandbox boundary.
//! - `tokenizer`: the public facade, pooled or single-instance.

pub mod codec;
pub mod errors;
pub mod pool;
pub mod sandbox;
pub mod tokenizer;

pub use errors::{Result, TokenizerError};
pub use pool::{InstancePool, Lease, PoolConfig, PoolStats};
pub use sandbox::{CompiledModule, ModuleInstance, SandboxError};
pub use tokenizer::{Dedicated, InstanceSource, PooledTokenizer, SingleTokenizer, Tokenizer};

pub use tokhost_abi as abi;
