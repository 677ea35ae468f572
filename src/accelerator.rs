//! Short names for hardware accelerators, and how they map onto execution
//! providers

use crate::registry::resolver::{CPU_PROVIDER, DML_PROVIDER, OPENVINO_PROVIDER, QNN_PROVIDER};
use crate::runtime::HardwareDeviceType;

pub(crate) const VITISAI_PROVIDER: &str = "VitisAIExecutionProvider";

/// A hardware accelerator a model can be run on.
///
/// The `to_string` and `FromStr` forms are part of the CLI and should remain
/// stable. Parsing is case-insensitive.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub(crate) enum Accelerator {
    #[strum(serialize = "CPU")]
    Cpu,
    #[strum(serialize = "DML")]
    Dml,
    #[strum(serialize = "QNN")]
    Qnn,
    #[strum(serialize = "WCRAPI")]
    WcrApi,
    #[strum(serialize = "OLLAMA")]
    Ollama,
    #[strum(serialize = "OPENAI")]
    OpenAI,
    #[strum(serialize = "NPU")]
    Npu,
    #[strum(serialize = "GPU")]
    Gpu,
    #[strum(serialize = "VitisAI")]
    VitisAI,
    #[strum(serialize = "OpenVINO")]
    OpenVINO,
}

impl serde::Serialize for Accelerator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Accelerator {
    /// The execution provider backing this accelerator. `None` for
    /// accelerators which name a chat service rather than an execution
    /// provider.
    pub(crate) fn ep_name(self) -> Option<&'static str> {
        match self {
            Accelerator::Cpu => Some(CPU_PROVIDER),
            Accelerator::Dml => Some(DML_PROVIDER),
            Accelerator::Qnn => Some(QNN_PROVIDER),
            Accelerator::Npu | Accelerator::Gpu | Accelerator::OpenVINO => Some(OPENVINO_PROVIDER),
            Accelerator::VitisAI => Some(VITISAI_PROVIDER),
            Accelerator::WcrApi | Accelerator::Ollama | Accelerator::OpenAI => None,
        }
    }

    /// The device type implied by the accelerator, for providers which select
    /// devices by type.
    pub(crate) fn device_type(self) -> Option<HardwareDeviceType> {
        match self {
            Accelerator::Npu => Some(HardwareDeviceType::Npu),
            Accelerator::Gpu => Some(HardwareDeviceType::Gpu),
            _ => None,
        }
    }

    /// The default device identifier for models compiled for this accelerator.
    pub(crate) fn device_suffix(self) -> String {
        self.to_string().to_lowercase()
    }
}

/// A provider requested on the command line: either an accelerator alias or
/// the name of an execution provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProviderRequest {
    pub ep_name: String,
    pub device_type: Option<String>,
    pub device_suffix: String,
}

impl ProviderRequest {
    /// Resolve `name`. An explicit `device_type` takes precedence over the one
    /// implied by an alias. Names that are not aliases are passed through as
    /// execution provider names and suffixed with their lowercase name.
    pub(crate) fn parse(name: &str, device_type: Option<&str>) -> Result<ProviderRequest, String> {
        match name.parse::<Accelerator>() {
            Ok(accelerator) => {
                let ep_name = accelerator.ep_name().ok_or_else(|| {
                    format!("\"{}\" is a chat service, not an execution provider", accelerator)
                })?;

                Ok(ProviderRequest {
                    ep_name: ep_name.to_string(),
                    device_type: device_type
                        .map(|t| t.to_string())
                        .or_else(|| accelerator.device_type().map(|t| t.to_string())),
                    device_suffix: accelerator.device_suffix(),
                })
            }
            Err(_) => Ok(ProviderRequest {
                ep_name: name.to_string(),
                device_type: device_type.map(|t| t.to_string()),
                device_suffix: name
                    .trim_end_matches("ExecutionProvider")
                    .to_lowercase(),
            }),
        }
    }
}
