use std::path::PathBuf;

use super::attach::attach_provider;
use crate::{
    accelerator::ProviderRequest,
    color::{MaybePaint, OUTCOME_FAILED, OUTCOME_OK},
    debug, die,
    registry::{compiled::compiled_model_path, get_or_compile_model, Attachment, ProviderResolver},
    runtime::{CommandCompiler, SessionOptions},
    utils::errors::report,
    CompileArgs,
};

/// Artifacts are cached by device name alone, so only a session carrying the
/// requested provider is compiled.
fn compilable(attachment: &Attachment) -> Result<(), String> {
    match attachment {
        Attachment::Unsupported { ep_name } => Err(format!(
            "execution provider \"{}\" is not available",
            ep_name
        )),
        Attachment::NoMatchingDevice {
            ep_name,
            device_type,
        } => Err(format!(
            "\"{}\" has no {} device to compile for",
            ep_name,
            device_type.as_deref().unwrap_or("untyped")
        )),
        Attachment::Implicit | Attachment::Attached { .. } => Ok(()),
    }
}

fn status(label: &str, style: nu_ansi_term::Style, text: &str) {
    eprintln!("{} {}", style.maybe_paint(format!("{}:", label)), text);
}

pub(crate) async fn compile_cmd(
    resolver: &ProviderResolver,
    compiler: Option<CommandCompiler>,
    args: &CompileArgs,
) {
    let compiler = match compiler {
        Some(compiler) => compiler,
        None => die!("no model compiler is configured, set \"command\" in the [compiler] section"),
    };

    if !args.model.exists() {
        die!("model {} does not exist", args.model.display());
    }

    let request = match ProviderRequest::parse(&args.provider, args.device_type.as_deref()) {
        Ok(request) => request,
        Err(err) => die!("{}", err),
    };

    let device = args
        .device
        .clone()
        .unwrap_or_else(|| request.device_suffix.clone());

    let mut session = SessionOptions::new();

    let attachment = attach_provider(resolver, &mut session, &request);

    if let Err(err) = compilable(&attachment) {
        die!("{}", err);
    }

    let cached = compiled_model_path(&args.model, &device).exists();
    let model: PathBuf = args.model.clone();

    debug!("compiling for device \"{}\"", device);

    let result = tokio::task::spawn_blocking(move || {
        get_or_compile_model(&session, &compiler, &model, &device)
    })
    .await;

    let compiled = match result {
        Ok(Ok(compiled)) => compiled,
        Ok(Err(err)) => die!("{}", report(&err)),
        Err(err) => die!("model compilation was interrupted: {}", err),
    };

    match compiled {
        Some(path) => {
            status(
                if cached { "cached" } else { "compiled" },
                *OUTCOME_OK,
                &args.model.display().to_string(),
            );

            println!("{}", path.display());
        }
        None => {
            status(
                "failed",
                *OUTCOME_FAILED,
                "the compiler did not produce a model",
            );

            std::process::exit(crate::utils::errors::DEFAULT_EXIT_CODE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::resolver::OPENVINO_PROVIDER;
    use crate::runtime::{EpDevice, HardwareDeviceType, ManifestEnvironment};
    use std::sync::Arc;

    #[test]
    fn test_missing_device_type_is_not_compiled() {
        let resolver = ProviderResolver::new(Arc::new(ManifestEnvironment::new(vec![
            EpDevice::new(OPENVINO_PROVIDER, HardwareDeviceType::Gpu),
        ])));
        let request = ProviderRequest::parse("npu", None).unwrap();
        let mut session = SessionOptions::new();

        let attachment = attach_provider(&resolver, &mut session, &request);

        assert!(attachment.is_success());
        assert!(compilable(&attachment).is_err());
    }

    #[test]
    fn test_attached_and_cpu_are_compiled() {
        let resolver = ProviderResolver::new(Arc::new(ManifestEnvironment::new(vec![
            EpDevice::new(OPENVINO_PROVIDER, HardwareDeviceType::Npu),
        ])));

        for alias in ["npu", "cpu"] {
            let request = ProviderRequest::parse(alias, None).unwrap();
            let mut session = SessionOptions::new();

            let attachment = attach_provider(&resolver, &mut session, &request);

            assert!(compilable(&attachment).is_ok(), "{} should compile", alias);
        }
    }

    #[test]
    fn test_unsupported_is_not_compiled() {
        let attachment = Attachment::Unsupported {
            ep_name: "QNNExecutionProvider".to_string(),
        };

        assert!(compilable(&attachment).is_err());
    }
}
