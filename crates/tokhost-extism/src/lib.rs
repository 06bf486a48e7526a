//! tokhost-extism
//!
//! Runs tokenizer modules compiled to WebAssembly (extism plugin ABI, WASI)
//! on wasmtime through the extism host runtime.
//!
//! ```no_run
//! use tokhost_core::PoolConfig;
//!
//! let tok = tokhost_extism::open_pooled("tokenizer.wasm", PoolConfig::default())?;
//! let tokens = tok.tokenize("Hello, world!", false)?;
//! assert_eq!(tok.detokenize(&tokens, false)?, "Hello, world!");
//! # Ok::<(), tokhost_core::TokenizerError>(())
//! ```

pub mod locate;
pub mod module;

use std::path::Path;

use tokhost_core::{
    CompiledModule, PoolConfig, PooledTokenizer, Result, SingleTokenizer, Tokenizer,
    TokenizerError,
};

pub use locate::{locate_module, DEFAULT_MODULE_FILE, ENV_MODULE_PATH};
pub use module::{ExtismInstance, ExtismModule, ModuleConfig};

/// Compile the module and bind a tokenizer to one instance of it.
/// Not for concurrent use; see [`open_pooled`].
pub fn open(path: impl AsRef<Path>) -> Result<SingleTokenizer<ExtismInstance>> {
    let module = ExtismModule::compile(&ModuleConfig::new(path.as_ref()))?;
    let instance = module.instantiate().map_err(TokenizerError::Instantiate)?;
    // the instance keeps its own handles to the compiled code
    module.close();
    Ok(Tokenizer::new(instance))
}

/// Compile the module once and serve calls from a growable pool of instances.
pub fn open_pooled(
    path: impl AsRef<Path>,
    config: PoolConfig,
) -> Result<PooledTokenizer<ExtismModule>> {
    let module = ExtismModule::compile(&ModuleConfig::new(path.as_ref()))?;
    Tokenizer::pooled(module, config)
}
