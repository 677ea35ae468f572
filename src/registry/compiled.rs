//! The on-disk cache of compiled models.
//!
//! A model compiled for a device lives beside its source as
//! `<model-basename>.<device>.onnx`. The cache is keyed on the path alone: an
//! artifact that exists is reused without comparing it to the source, so a
//! changed source model keeps using the old artifact until it is deleted.
//!
//! The compiler writes directly to the cache path. Concurrent callers compiling
//! the same model for the same device race on that file and must be serialized
//! by the caller.

use std::path::{Path, PathBuf};

use crate::debug;
use crate::runtime::{self, ModelCompilationOptions, ModelCompiler, SessionOptions};

pub(crate) const COMPILED_MODEL_EXTENSION: &str = "onnx";

/// The path at which the model compiled for `device` is cached.
pub(crate) fn compiled_model_path(model_path: &Path, device: &str) -> PathBuf {
    let stem = model_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name = format!("{}.{}.{}", stem, device, COMPILED_MODEL_EXTENSION);

    match model_path.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Return the model compiled for `device`, compiling it first when it is not
/// cached.
///
/// `Ok(None)` means the compiler ran but left no artifact behind; callers
/// should fall back to the source model. Errors starting or running the
/// compiler are returned as-is. Compilation blocks the calling thread.
pub(crate) fn get_or_compile_model(
    session: &SessionOptions,
    compiler: &dyn ModelCompiler,
    model_path: &Path,
    device: &str,
) -> Result<Option<PathBuf>, runtime::Error> {
    let compiled = compiled_model_path(model_path, device);

    if compiled.exists() {
        debug!("using cached compiled model {}", compiled.display());
    } else {
        debug!(
            "compiling {} into {}",
            model_path.display(),
            compiled.display()
        );

        let mut options = ModelCompilationOptions::new(session, compiler);

        options.set_input_model_path(model_path);
        options.set_output_model_path(&compiled);
        options.compile_model()?;
    }

    if compiled.exists() {
        Ok(Some(compiled))
    } else {
        Ok(None)
    }
}
