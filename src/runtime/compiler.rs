use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{Error, ErrorKind, SessionOptions};
use crate::{debug, warn};

/// Produces a compiled model from a source model, specialized for the execution
/// providers attached to a session.
///
/// A compiler that finishes without writing `output` is not an error; callers
/// decide what a missing artifact means.
pub(crate) trait ModelCompiler {
    fn compile(&self, session: &SessionOptions, input: &Path, output: &Path)
        -> Result<(), Error>;
}

/// Compiles by running an external program. Each argument may contain the
/// placeholders `{input}`, `{output}`, `{provider}` and `{options}`, which
/// expand to the source model, the destination file, the first attached
/// provider (or `CPU`) and that provider's options as `key=value` pairs.
#[derive(Debug, Clone)]
pub(crate) struct CommandCompiler {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandCompiler {
    pub(crate) fn new(program: PathBuf, args: Vec<String>) -> CommandCompiler {
        CommandCompiler { program, args }
    }

    fn expand(arg: &str, session: &SessionOptions, input: &Path, output: &Path) -> OsString {
        let (provider, options) = match session.providers().first() {
            Some(attachment) => (attachment.ep_name.clone(), attachment.options.to_string()),
            None => ("CPU".to_string(), String::new()),
        };

        // Paths may not be UTF-8, so only substitute into the string when the
        // argument is exactly a path placeholder.
        match arg {
            "{input}" => input.as_os_str().to_owned(),
            "{output}" => output.as_os_str().to_owned(),
            _ => arg
                .replace("{input}", &input.to_string_lossy())
                .replace("{output}", &output.to_string_lossy())
                .replace("{provider}", &provider)
                .replace("{options}", &options)
                .into(),
        }
    }
}

impl ModelCompiler for CommandCompiler {
    fn compile(
        &self,
        session: &SessionOptions,
        input: &Path,
        output: &Path,
    ) -> Result<(), Error> {
        let args: Vec<OsString> = self
            .args
            .iter()
            .map(|arg| Self::expand(arg, session, input, output))
            .collect();

        debug!("running model compiler {:?} {:?}", self.program, args);

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|e| Error::from_source(ErrorKind::Compilation, Box::new(e)))?;

        if !status.success() {
            warn!(
                "the model compiler \"{}\" exited with {}",
                self.program.display(),
                status
            );
        }

        Ok(())
    }
}

/// A single compilation of one model, tied to the session whose providers it
/// targets.
///
/// The compiler writes straight to the output path, along with any companion
/// files it names after it. A compilation that fails removes the output it may
/// have left half written. Nothing guards against two compilations of the
/// same output running at once.
pub(crate) struct ModelCompilationOptions<'s> {
    session: &'s SessionOptions,
    compiler: &'s dyn ModelCompiler,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
}

impl<'s> ModelCompilationOptions<'s> {
    pub(crate) fn new(
        session: &'s SessionOptions,
        compiler: &'s dyn ModelCompiler,
    ) -> ModelCompilationOptions<'s> {
        ModelCompilationOptions {
            session,
            compiler,
            input: None,
            output: None,
        }
    }

    pub(crate) fn set_input_model_path<P: Into<PathBuf>>(&mut self, path: P) {
        self.input = Some(path.into());
    }

    pub(crate) fn set_output_model_path<P: Into<PathBuf>>(&mut self, path: P) {
        self.output = Some(path.into());
    }

    /// Run the compiler to completion. Blocks the calling thread.
    pub(crate) fn compile_model(&mut self) -> Result<(), Error> {
        let input = self.input.as_ref().ok_or_else(|| {
            Error::with_detail(ErrorKind::Compilation, "the input model path is not set")
        })?;

        let output = self.output.as_ref().ok_or_else(|| {
            Error::with_detail(ErrorKind::Compilation, "the output model path is not set")
        })?;

        let result = self.compiler.compile(self.session, input, output);

        if result.is_err() && output.exists() {
            if let Err(err) = fs::remove_file(output) {
                debug!(
                    "failed to remove partial model {}: {}",
                    output.display(),
                    err
                );
            }
        }

        result
    }
}

impl Drop for ModelCompilationOptions<'_> {
    fn drop(&mut self) {
        if let Some(output) = &self.output {
            debug!("released compilation of {}", output.display());
        }
    }
}
