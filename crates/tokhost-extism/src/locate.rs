use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};

use tokhost_core::{Result, TokenizerError};
use tracing::debug;

pub const ENV_MODULE_PATH: &str = "TOKHOST_WASM";
pub const DEFAULT_MODULE_FILE: &str = "tokenizer.wasm";

/// ~/.local/share/tokhost/modules/tokenizer.wasm   (or platform-equivalent)
pub fn default_module_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("tokhost").join("modules").join(DEFAULT_MODULE_FILE))
}

/// Explicit path, then `$TOKHOST_WASM`, then the per-user default.
/// Whatever is picked must exist.
pub fn locate_module(explicit: Option<&Path>) -> Result<PathBuf> {
    resolve(explicit, env::var_os(ENV_MODULE_PATH), default_module_path())
}

fn resolve(
    explicit: Option<&Path>,
    from_env: Option<OsString>,
    fallback: Option<PathBuf>,
) -> Result<PathBuf> {
    let (path, origin) = if let Some(p) = explicit {
        (p.to_path_buf(), "argument")
    } else if let Some(p) = from_env.filter(|v| !v.is_empty()) {
        (PathBuf::from(p), ENV_MODULE_PATH)
    } else if let Some(p) = fallback {
        (p, "default location")
    } else {
        return Err(TokenizerError::Compile {
            path: PathBuf::new(),
            reason: format!("no module path given; pass one or set {ENV_MODULE_PATH}"),
        });
    };

    if !path.is_file() {
        return Err(TokenizerError::Compile {
            path,
            reason: format!("module binary not found (from {origin})"),
        });
    }
    debug!(path = %path.display(), origin, "located module");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn this_file() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/locate.rs")
    }

    #[test]
    fn explicit_wins_over_env() {
        let got = resolve(
            Some(&this_file()),
            Some(OsString::from("/nope.wasm")),
            None,
        )
        .unwrap();
        assert_eq!(got, this_file());
    }

    #[test]
    fn env_used_when_no_explicit_path() {
        let got = resolve(None, Some(this_file().into_os_string()), None).unwrap();
        assert_eq!(got, this_file());
    }

    #[test]
    fn empty_env_falls_through_to_default() {
        let got = resolve(None, Some(OsString::new()), Some(this_file())).unwrap();
        assert_eq!(got, this_file());
    }

    #[test]
    fn missing_file_names_its_origin() {
        let err = resolve(None, Some(OsString::from("/nope.wasm")), None).unwrap_err();
        assert!(err.to_string().contains(ENV_MODULE_PATH), "{err}");
    }

    #[test]
    fn nothing_to_try() {
        let err = resolve(None, None, None).unwrap_err();
        assert!(matches!(err, TokenizerError::Compile { .. }));
    }
}
