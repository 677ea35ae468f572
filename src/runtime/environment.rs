use lazy_static::lazy_static;
use std::sync::{Arc, RwLock};

use super::{EpDevice, Error, ErrorKind};

/// A runtime environment which reports the execution-provider devices it can
/// drive. Enumeration order is significant: it is preserved by the device
/// registry and decides which device wins when only one may be attached.
pub(crate) trait Environment: Send + Sync {
    fn ep_devices(&self) -> Result<Vec<EpDevice>, Error>;
}

/// An environment serving a fixed list of devices, typically the `[[devices]]`
/// tables of the configuration file.
#[derive(Debug, Clone, Default)]
pub(crate) struct ManifestEnvironment {
    devices: Vec<EpDevice>,
}

impl ManifestEnvironment {
    pub(crate) fn new(devices: Vec<EpDevice>) -> ManifestEnvironment {
        ManifestEnvironment { devices }
    }
}

impl Environment for ManifestEnvironment {
    fn ep_devices(&self) -> Result<Vec<EpDevice>, Error> {
        if self.devices.iter().any(|d| d.ep_name.trim().is_empty()) {
            return Err(Error::with_detail(
                ErrorKind::Enumeration,
                "a configured device has no execution provider name",
            ));
        }

        Ok(self.devices.clone())
    }
}

lazy_static! {
    static ref GLOBAL: RwLock<Arc<dyn Environment>> =
        RwLock::new(Arc::new(ManifestEnvironment::default()));
}

/// Replace the process-wide environment. Only `main` should call this, once
/// the configuration has been read.
pub(crate) fn install_global(env: Arc<dyn Environment>) {
    let mut global = GLOBAL.write().unwrap_or_else(|e| e.into_inner());

    *global = env;
}

/// The process-wide environment. Until [`install_global`] is called this
/// reports no devices, which leaves CPU as the only usable provider.
pub(crate) fn global() -> Arc<dyn Environment> {
    GLOBAL.read().unwrap_or_else(|e| e.into_inner()).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::HardwareDeviceType;

    #[test]
    fn test_manifest_preserves_order() {
        let env = ManifestEnvironment::new(vec![
            EpDevice::new("B", HardwareDeviceType::Gpu),
            EpDevice::new("A", HardwareDeviceType::Npu),
        ]);

        let names: Vec<String> = env
            .ep_devices()
            .unwrap()
            .into_iter()
            .map(|d| d.ep_name)
            .collect();

        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_unnamed_device_fails_enumeration() {
        let env = ManifestEnvironment::new(vec![
            EpDevice::new("QNNExecutionProvider", HardwareDeviceType::Npu),
            EpDevice::new("  ", HardwareDeviceType::Gpu),
        ]);

        let err = env.ep_devices().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Enumeration);
        assert_eq!(
            err.to_string(),
            "failed to enumerate execution provider devices: a configured device has no execution provider name"
        );
    }

    #[test]
    fn test_install_global() {
        install_global(Arc::new(ManifestEnvironment::new(vec![EpDevice::new(
            "QNNExecutionProvider",
            HardwareDeviceType::Npu,
        )])));

        let devices = global().ep_devices().unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].ep_name, "QNNExecutionProvider");
    }
}
