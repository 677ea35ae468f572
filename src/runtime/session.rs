//! Session configuration: the execution providers, and their options, that a
//! model session or a model compilation will use.

use serde::{Serialize, Serializer};
use std::fmt;

use super::{EpDevice, Environment, Error, ErrorKind};

/// Provider option key-value pairs. Keys compare case-insensitively; the
/// spelling of the first insertion is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ProviderOptions {
    entries: Vec<(String, String)>,
}

impl ProviderOptions {
    pub(crate) fn new() -> ProviderOptions {
        ProviderOptions::default()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.to_lowercase() == key.to_lowercase())
    }

    pub(crate) fn insert(&mut self, key: &str, value: &str) {
        match self.position(key) {
            Some(i) => self.entries[i].1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    #[cfg(test)]
    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|i| self.entries[i].1.as_str())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Renders as `key=value` pairs separated by commas.
impl fmt::Display for ProviderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.iter().enumerate() {
            if i != 0 {
                f.write_str(",")?;
            }

            write!(f, "{}={}", key, value)?;
        }

        Ok(())
    }
}

impl Serialize for ProviderOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// An execution provider registered with a session.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ProviderAttachment {
    pub ep_name: String,
    pub devices: Vec<EpDevice>,
    pub options: ProviderOptions,
}

/// The mutable configuration collected before a session is created. Providers
/// are kept in registration order, which is their order of preference.
#[derive(Debug, Clone, Default, Serialize)]
pub(crate) struct SessionOptions {
    providers: Vec<ProviderAttachment>,
}

impl SessionOptions {
    pub(crate) fn new() -> SessionOptions {
        SessionOptions::default()
    }

    pub(crate) fn providers(&self) -> &[ProviderAttachment] {
        &self.providers
    }

    /// Register an execution provider for `devices`.
    ///
    /// All devices must belong to the same provider and must be reported by
    /// `env`; anything else is rejected as an invalid device and leaves the
    /// session unchanged.
    pub(crate) fn append_execution_provider(
        &mut self,
        env: &dyn Environment,
        devices: &[EpDevice],
        options: &ProviderOptions,
    ) -> Result<(), Error> {
        let first = match devices.first() {
            Some(first) => first,
            None => {
                return Err(Error::with_detail(
                    ErrorKind::InvalidDevice,
                    "no devices were given",
                ))
            }
        };

        if let Some(other) = devices
            .iter()
            .find(|d| d.ep_name.to_lowercase() != first.ep_name.to_lowercase())
        {
            return Err(Error::with_detail(
                ErrorKind::InvalidDevice,
                format!(
                    "devices of \"{}\" and \"{}\" cannot be attached together",
                    first.ep_name, other.ep_name
                ),
            ));
        }

        let known = env.ep_devices()?;

        for device in devices {
            if !known.contains(device) {
                return Err(Error::with_detail(
                    ErrorKind::InvalidDevice,
                    format!(
                        "the environment does not report a {} device for \"{}\"",
                        device.type_name(),
                        device.ep_name
                    ),
                ));
            }
        }

        self.providers.push(ProviderAttachment {
            ep_name: first.ep_name.clone(),
            devices: devices.to_vec(),
            options: options.clone(),
        });

        Ok(())
    }
}
