use serde::Serialize;
use std::sync::Arc;

use super::default_options::default_options;
use super::registry::DeviceRegistry;
use crate::debug;
use crate::runtime::{self, EpDevice, Environment, ProviderOptions, SessionOptions};

/// Requests for this provider are satisfied without attaching anything.
pub(crate) const CPU_PROVIDER: &str = "CPU";
pub(crate) const DML_PROVIDER: &str = "DmlExecutionProvider";
pub(crate) const OPENVINO_PROVIDER: &str = "OpenVINOExecutionProvider";
pub(crate) const QNN_PROVIDER: &str = "QNNExecutionProvider";

/// Providers whose device selection or options are treated specially.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProviderKind {
    /// Only the first device is attached; the runtime rejects DirectML
    /// attachments spanning several adapters.
    Dml,
    /// The device is chosen by its type name.
    OpenVino,
    /// All devices are attached with a high-performance HTP mode.
    Qnn,
    /// All devices are attached without options.
    Other,
}

impl ProviderKind {
    /// Matching ignores case, so any spelling that resolves a group gets the
    /// provider's special handling.
    pub(crate) fn of(ep_name: &str) -> ProviderKind {
        if ep_name.eq_ignore_ascii_case(DML_PROVIDER) {
            ProviderKind::Dml
        } else if ep_name.eq_ignore_ascii_case(OPENVINO_PROVIDER) {
            ProviderKind::OpenVino
        } else if ep_name.eq_ignore_ascii_case(QNN_PROVIDER) {
            ProviderKind::Qnn
        } else {
            ProviderKind::Other
        }
    }
}

/// The outcome of attaching a provider to a session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub(crate) enum Attachment {
    /// CPU was requested; the session runs on CPU without an explicit provider.
    Implicit,
    /// The provider was registered with the session.
    Attached {
        ep_name: String,
        devices: Vec<EpDevice>,
        options: ProviderOptions,
    },
    /// The provider exists but none of its devices has the requested type. The
    /// session was left unchanged.
    NoMatchingDevice {
        ep_name: String,
        device_type: Option<String>,
    },
    /// The environment does not report the provider. The session was left
    /// unchanged.
    Unsupported { ep_name: String },
}

impl Attachment {
    /// Whether the session is usable as requested. A missing device of the
    /// requested type is a soft failure and still counts as success; only an
    /// unknown provider does not.
    pub(crate) fn is_success(&self) -> bool {
        !matches!(self, Attachment::Unsupported { .. })
    }
}

/// Resolves execution provider names against the devices of an environment.
#[derive(Clone)]
pub(crate) struct ProviderResolver {
    env: Arc<dyn Environment>,
}

impl ProviderResolver {
    pub(crate) fn new(env: Arc<dyn Environment>) -> ProviderResolver {
        ProviderResolver { env }
    }

    /// A fresh grouping of the environment's devices. Nothing is cached, so
    /// devices that appear or disappear are picked up by the next call.
    pub(crate) fn device_registry(&self) -> Result<DeviceRegistry, runtime::Error> {
        DeviceRegistry::query(self.env.as_ref())
    }

    /// Attach `ep_name` to `session`.
    ///
    /// `device_type` is only consulted for OpenVINO, which exposes one device
    /// per hardware class; it is compared with the device type name exactly.
    /// Errors come from the runtime (enumeration or the append itself) and
    /// leave the session unchanged.
    pub(crate) fn attach(
        &self,
        session: &mut SessionOptions,
        ep_name: &str,
        device_type: Option<&str>,
    ) -> Result<Attachment, runtime::Error> {
        if ep_name == CPU_PROVIDER {
            return Ok(Attachment::Implicit);
        }

        let registry = self.device_registry()?;

        let devices = match registry.get(ep_name) {
            Some(devices) => devices,
            None => {
                debug!("execution provider \"{}\" is not available", ep_name);

                return Ok(Attachment::Unsupported {
                    ep_name: ep_name.to_string(),
                });
            }
        };

        let kind = ProviderKind::of(ep_name);
        let options = default_options(kind);

        let selected: Vec<EpDevice> = match kind {
            ProviderKind::Dml => devices.iter().take(1).cloned().collect(),
            ProviderKind::OpenVino => devices
                .iter()
                .find(|d| Some(d.type_name().as_str()) == device_type)
                .cloned()
                .into_iter()
                .collect(),
            ProviderKind::Qnn | ProviderKind::Other => devices.to_vec(),
        };

        if selected.is_empty() {
            debug!(
                "no {} device matches the requested type {:?}",
                ep_name, device_type
            );

            return Ok(Attachment::NoMatchingDevice {
                ep_name: ep_name.to_string(),
                device_type: device_type.map(|t| t.to_string()),
            });
        }

        session.append_execution_provider(self.env.as_ref(), &selected, &options)?;

        debug!(
            "attached {} with {} device(s) and options [{}]",
            ep_name,
            selected.len(),
            options
        );

        Ok(Attachment::Attached {
            ep_name: ep_name.to_string(),
            devices: selected,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_options::HTP_PERFORMANCE_MODE;
    use crate::runtime::{HardwareDeviceType, ManifestEnvironment};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEnvironment {
        inner: ManifestEnvironment,
        queries: AtomicUsize,
    }

    impl Environment for CountingEnvironment {
        fn ep_devices(&self) -> Result<Vec<EpDevice>, runtime::Error> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.inner.ep_devices()
        }
    }

    struct BrokenEnvironment;

    impl Environment for BrokenEnvironment {
        fn ep_devices(&self) -> Result<Vec<EpDevice>, runtime::Error> {
            Err(runtime::Error::from_kind(runtime::ErrorKind::Enumeration))
        }
    }

    fn resolver(devices: Vec<EpDevice>) -> ProviderResolver {
        ProviderResolver::new(Arc::new(ManifestEnvironment::new(devices)))
    }

    fn gpu(vendor: &str, device_id: u32) -> EpDevice {
        EpDevice::new(DML_PROVIDER, HardwareDeviceType::Gpu).with_vendor(vendor, 0, device_id)
    }

    #[test]
    fn test_unknown_provider_is_unsupported() {
        let resolver = resolver(vec![gpu("Contoso", 1)]);
        let mut session = SessionOptions::new();

        for name in ["VitisAIExecutionProvider", "", "cpu", "DmlExecutionProviderX"] {
            let attachment = resolver.attach(&mut session, name, None).unwrap();

            assert!(!attachment.is_success(), "{} should be unsupported", name);
            assert!(matches!(attachment, Attachment::Unsupported { .. }));
        }

        assert!(session.providers().is_empty());
    }

    #[test]
    fn test_cpu_is_implicit() {
        let env = Arc::new(CountingEnvironment {
            inner: ManifestEnvironment::new(vec![gpu("Contoso", 1)]),
            queries: AtomicUsize::new(0),
        });
        let resolver = ProviderResolver::new(env.clone());
        let mut session = SessionOptions::new();

        let attachment = resolver.attach(&mut session, "CPU", None).unwrap();

        assert!(matches!(attachment, Attachment::Implicit));
        assert!(attachment.is_success());
        assert_eq!(env.queries.load(Ordering::SeqCst), 0);
        assert!(session.providers().is_empty());
    }

    #[test]
    fn test_dml_single_device() {
        let resolver = resolver(vec![gpu("Contoso", 1)]);
        let mut session = SessionOptions::new();

        let attachment = resolver.attach(&mut session, DML_PROVIDER, None).unwrap();

        match attachment {
            Attachment::Attached {
                devices, options, ..
            } => {
                assert_eq!(devices, vec![gpu("Contoso", 1)]);
                assert!(options.is_empty());
            }
            other => panic!("unexpected attachment {:?}", other),
        }

        assert_eq!(session.providers()[0].devices, vec![gpu("Contoso", 1)]);
    }

    #[test]
    fn test_dml_picks_first_of_many() {
        let resolver = resolver(vec![gpu("First", 1), gpu("Second", 2), gpu("Third", 3)]);

        for _ in 0..3 {
            let mut session = SessionOptions::new();

            resolver.attach(&mut session, DML_PROVIDER, None).unwrap();

            let attached = &session.providers()[0];
            assert_eq!(attached.devices.len(), 1);
            assert_eq!(attached.devices[0].hardware.vendor, "First");
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let resolver = resolver(vec![gpu("Contoso", 1), gpu("Fabrikam", 2)]);
        let mut session = SessionOptions::new();

        let attachment = resolver
            .attach(&mut session, "dmlexecutionprovider", None)
            .unwrap();

        assert!(attachment.is_success());
        assert_eq!(session.providers()[0].devices.len(), 1);
    }

    #[test]
    fn test_openvino_selects_by_type() {
        let resolver = resolver(vec![
            EpDevice::new(OPENVINO_PROVIDER, HardwareDeviceType::Cpu),
            EpDevice::new(OPENVINO_PROVIDER, HardwareDeviceType::Gpu),
            EpDevice::new(OPENVINO_PROVIDER, HardwareDeviceType::Npu),
        ]);
        let mut session = SessionOptions::new();

        resolver
            .attach(&mut session, OPENVINO_PROVIDER, Some("NPU"))
            .unwrap();

        let attached = &session.providers()[0];
        assert_eq!(attached.devices.len(), 1);
        assert_eq!(attached.devices[0].hardware.device_type, HardwareDeviceType::Npu);
    }

    #[test]
    fn test_openvino_hint_mismatch_is_soft() {
        let resolver = resolver(vec![EpDevice::new(
            OPENVINO_PROVIDER,
            HardwareDeviceType::Gpu,
        )]);

        for hint in [Some("NPU"), Some("gpu"), None] {
            let mut session = SessionOptions::new();

            let attachment = resolver
                .attach(&mut session, OPENVINO_PROVIDER, hint)
                .unwrap();

            assert!(attachment.is_success());
            assert!(matches!(attachment, Attachment::NoMatchingDevice { .. }));
            assert!(session.providers().is_empty());
        }
    }

    #[test]
    fn test_qnn_end_to_end() {
        let device_a = EpDevice::new(QNN_PROVIDER, HardwareDeviceType::Npu);
        let resolver = resolver(vec![device_a.clone()]);
        let mut session = SessionOptions::new();

        let attachment = resolver.attach(&mut session, QNN_PROVIDER, None).unwrap();

        assert!(attachment.is_success());

        let attached = &session.providers()[0];
        assert_eq!(attached.devices, vec![device_a]);
        assert_eq!(
            attached.options.get(HTP_PERFORMANCE_MODE),
            Some("high_performance")
        );
    }

    #[test]
    fn test_other_providers_attach_all_devices() {
        let resolver = resolver(vec![
            EpDevice::new("VitisAIExecutionProvider", HardwareDeviceType::Npu),
            EpDevice::new("VitisAIExecutionProvider", HardwareDeviceType::Cpu),
        ]);
        let mut session = SessionOptions::new();

        resolver
            .attach(&mut session, "VitisAIExecutionProvider", None)
            .unwrap();

        let attached = &session.providers()[0];
        assert_eq!(attached.devices.len(), 2);
        assert!(attached.options.is_empty());
    }

    #[test]
    fn test_enumeration_errors_propagate() {
        let resolver = ProviderResolver::new(Arc::new(BrokenEnvironment));
        let mut session = SessionOptions::new();

        let err = resolver
            .attach(&mut session, QNN_PROVIDER, None)
            .unwrap_err();

        assert_eq!(err.kind(), runtime::ErrorKind::Enumeration);
        assert!(resolver.attach(&mut session, "CPU", None).is_ok());
    }

    #[test]
    fn test_provider_kind() {
        assert_eq!(ProviderKind::of("QNNExecutionProvider"), ProviderKind::Qnn);
        assert_eq!(ProviderKind::of("openvinoexecutionprovider"), ProviderKind::OpenVino);
        assert_eq!(ProviderKind::of("CUDAExecutionProvider"), ProviderKind::Other);
    }
}
