use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use extism::{CompiledPlugin, Manifest, Plugin, PluginBuilder, Wasm};
use tokhost_abi::EntryPoint;
use tokhost_core::{CompiledModule, ModuleInstance, Result, SandboxError, TokenizerError};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct ModuleConfig {
    pub path: PathBuf,
    /// The tokenizer modules are built for wasm32-wasip1 and need WASI imports.
    pub wasi: bool,
    /// Per-call wall clock limit enforced by the runtime.
    pub timeout: Option<Duration>,
}

impl ModuleConfig {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            wasi: true,
            timeout: None,
        }
    }

    pub fn with_wasi(mut self, wasi: bool) -> Self {
        self.wasi = wasi;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

fn sandbox_error(e: extism::Error) -> SandboxError {
    // alternate form keeps the whole cause chain on one line
    SandboxError::new(format!("{e:#}"))
}

/// Compiled WebAssembly module. Instances are created from it without
/// recompiling; `close` releases the compiled code.
pub struct ExtismModule {
    path: PathBuf,
    compiled: RwLock<Option<CompiledPlugin>>,
}

impl ExtismModule {
    pub fn compile(config: &ModuleConfig) -> Result<Self> {
        let path = config.path.clone();
        if !path.is_file() {
            return Err(TokenizerError::Compile {
                path,
                reason: "module binary not found".into(),
            });
        }

        let mut manifest = Manifest::new([Wasm::file(&path)]);
        if let Some(timeout) = config.timeout {
            manifest = manifest.with_timeout(timeout);
        }
        let builder = PluginBuilder::new(manifest).with_wasi(config.wasi);

        let compiled = CompiledPlugin::new(builder).map_err(|e| TokenizerError::Compile {
            path: path.clone(),
            reason: format!("{e:#}"),
        })?;
        debug!(path = %path.display(), wasi = config.wasi, "compiled module");

        Ok(Self {
            path,
            compiled: RwLock::new(Some(compiled)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CompiledModule for ExtismModule {
    type Instance = ExtismInstance;

    fn instantiate(&self) -> std::result::Result<ExtismInstance, SandboxError> {
        let guard = self.compiled.read().unwrap_or_else(PoisonError::into_inner);
        let compiled = guard
            .as_ref()
            .ok_or_else(|| SandboxError::new("compiled module has been released"))?;
        let plugin = Plugin::new_from_compiled(compiled).map_err(sandbox_error)?;
        trace!(path = %self.path.display(), "created plugin instance");
        Ok(ExtismInstance { plugin })
    }

    fn close(&self) {
        let released = self
            .compiled
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_some() {
            debug!(path = %self.path.display(), "released compiled module");
        }
    }
}

/// One plugin instance: its own store and linear memory.
pub struct ExtismInstance {
    plugin: Plugin,
}

impl ModuleInstance for ExtismInstance {
    fn call(
        &mut self,
        entry: EntryPoint,
        input: &[u8],
    ) -> std::result::Result<Vec<u8>, SandboxError> {
        let out: &[u8] = self
            .plugin
            .call(entry.name(), input)
            .map_err(sandbox_error)?;
        Ok(out.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_a_compile_error() {
        let err = ExtismModule::compile(&ModuleConfig::new("/nonexistent/tokenizer.wasm"))
            .err()
            .unwrap();
        match err {
            TokenizerError::Compile { path, reason } => {
                assert_eq!(path, PathBuf::from("/nonexistent/tokenizer.wasm"));
                assert!(reason.contains("not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn config_defaults_enable_wasi() {
        let cfg = ModuleConfig::new("m.wasm");
        assert!(cfg.wasi);
        assert!(cfg.timeout.is_none());
        let cfg = cfg.with_wasi(false).with_timeout(Duration::from_secs(2));
        assert!(!cfg.wasi);
        assert_eq!(cfg.timeout, Some(Duration::from_secs(2)));
    }
}
