//! Descriptors for the devices an environment exposes to execution providers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The class of a hardware device.
///
/// The `Display` form is the name the runtime reports ("CPU", "GPU", "NPU") and
/// is what device-type hints are compared against.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub(crate) enum HardwareDeviceType {
    Cpu,
    Gpu,
    Npu,
}

/// A physical device, independent of the providers that can drive it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct HardwareDevice {
    #[serde(rename = "type")]
    pub device_type: HardwareDeviceType,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub vendor_id: u32,
    #[serde(default)]
    pub device_id: u32,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// A pairing of an execution provider with a device it can run on. The same
/// hardware device may appear several times, once per provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct EpDevice {
    pub ep_name: String,
    #[serde(default)]
    pub ep_vendor: String,
    #[serde(flatten)]
    pub hardware: HardwareDevice,
}

impl EpDevice {
    #[cfg(test)]
    pub(crate) fn new(ep_name: &str, device_type: HardwareDeviceType) -> EpDevice {
        EpDevice {
            ep_name: ep_name.to_string(),
            ep_vendor: String::new(),
            hardware: HardwareDevice {
                device_type,
                vendor: String::new(),
                vendor_id: 0,
                device_id: 0,
                metadata: BTreeMap::new(),
            },
        }
    }

    #[cfg(test)]
    pub(crate) fn with_vendor(mut self, vendor: &str, vendor_id: u32, device_id: u32) -> EpDevice {
        self.hardware.vendor = vendor.to_string();
        self.hardware.vendor_id = vendor_id;
        self.hardware.device_id = device_id;
        self
    }

    /// The device type name, as matched against device-type hints.
    pub(crate) fn type_name(&self) -> String {
        self.hardware.device_type.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_type_names_are_uppercase() {
        assert_eq!(HardwareDeviceType::Npu.to_string(), "NPU");
        assert_eq!(
            HardwareDeviceType::from_str("GPU").unwrap(),
            HardwareDeviceType::Gpu
        );
        assert!(HardwareDeviceType::from_str("gpu").is_err());
    }

    #[test]
    fn test_deserialize_flattened_device() {
        let device: EpDevice = serde_json::from_str(
            r#"{"ep_name":"DmlExecutionProvider","type":"GPU","vendor":"Contoso","device_id":7}"#,
        )
        .unwrap();

        assert_eq!(device.ep_name, "DmlExecutionProvider");
        assert_eq!(device.hardware.device_type, HardwareDeviceType::Gpu);
        assert_eq!(device.hardware.vendor, "Contoso");
        assert_eq!(device.hardware.device_id, 7);
        assert_eq!(device.type_name(), "GPU");
    }
}
