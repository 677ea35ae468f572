use serde::Serialize;
use std::collections::HashMap;

use crate::runtime::{self, EpDevice, Environment};

/// The devices reported by one execution provider, in enumeration order.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct DeviceGroup {
    pub ep_name: String,
    pub devices: Vec<EpDevice>,
}

/// A snapshot of an environment's devices grouped by provider name.
///
/// Provider names compare case-insensitively; a group is named after the
/// first spelling seen. Groups are ordered by the first appearance of their
/// provider, and devices keep the order the environment reported them in.
#[derive(Debug, Clone, Default)]
pub(crate) struct DeviceRegistry {
    groups: Vec<DeviceGroup>,
    index: HashMap<String, usize>,
}

fn fold(ep_name: &str) -> String {
    ep_name.to_lowercase()
}

impl DeviceRegistry {
    /// Enumerate `env` and group its devices. Enumeration errors are returned
    /// unchanged.
    pub(crate) fn query(env: &dyn Environment) -> Result<DeviceRegistry, runtime::Error> {
        Ok(Self::from_devices(env.ep_devices()?))
    }

    pub(crate) fn from_devices<I: IntoIterator<Item = EpDevice>>(devices: I) -> DeviceRegistry {
        let mut registry = DeviceRegistry::default();

        for device in devices {
            let key = fold(&device.ep_name);

            match registry.index.get(&key) {
                Some(&i) => registry.groups[i].devices.push(device),
                None => {
                    registry.index.insert(key, registry.groups.len());
                    registry.groups.push(DeviceGroup {
                        ep_name: device.ep_name.clone(),
                        devices: vec![device],
                    });
                }
            }
        }

        registry
    }

    pub(crate) fn get(&self, ep_name: &str) -> Option<&[EpDevice]> {
        self.index
            .get(&fold(ep_name))
            .map(|&i| self.groups[i].devices.as_slice())
    }

    pub(crate) fn groups(&self) -> &[DeviceGroup] {
        &self.groups
    }
}
