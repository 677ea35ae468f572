use strum::IntoEnumIterator;
use table::{IntoTable, Table};
pub(crate) mod table;

use crate::{
    accelerator::Accelerator,
    die,
    registry::{resolver::CPU_PROVIDER, DeviceRegistry, ProviderResolver},
    runtime::EpDevice,
    translator::LANGUAGES,
    utils::errors::report,
    ListArgs, ListObject, ListingFormat,
};

#[derive(serde::Serialize)]
struct Device {
    ep_name: String,
    #[serde(rename = "type")]
    device_type: String,
    vendor: String,
    vendor_id: u32,
    device_id: u32,
}

impl From<&EpDevice> for Device {
    fn from(value: &EpDevice) -> Self {
        Device {
            ep_name: value.ep_name.clone(),
            device_type: value.type_name(),
            vendor: value.hardware.vendor.clone(),
            vendor_id: value.hardware.vendor_id,
            device_id: value.hardware.device_id,
        }
    }
}

fn or_unknown(s: &str) -> String {
    if s.is_empty() {
        "unknown".to_string()
    } else {
        s.to_string()
    }
}

impl From<Vec<Device>> for Table {
    fn from(value: Vec<Device>) -> Self {
        let mut tab = Table::with_header(vec!["PROVIDER", "TYPE", "VENDOR", "VENDOR_ID", "DEVICE_ID"]);

        for device in value {
            tab.add_row(vec![
                device.ep_name,
                device.device_type,
                or_unknown(&device.vendor),
                format!("{:#06x}", device.vendor_id),
                format!("{:#06x}", device.device_id),
            ]);
        }

        tab
    }
}

#[derive(serde::Serialize)]
struct Provider {
    ep_name: String,
    devices: usize,
}

impl From<Vec<Provider>> for Table {
    fn from(value: Vec<Provider>) -> Self {
        let mut tab = Table::with_header(vec!["PROVIDER", "DEVICES"]);

        for provider in value {
            tab.add_row(vec![provider.ep_name, provider.devices.to_string()]);
        }

        tab
    }
}

#[derive(serde::Serialize)]
struct AcceleratorListing {
    accelerator: Accelerator,
    ep_name: Option<&'static str>,
    device_type: Option<String>,
    available: bool,
}

impl From<Vec<AcceleratorListing>> for Table {
    fn from(value: Vec<AcceleratorListing>) -> Self {
        let mut tab = Table::with_header(vec!["ACCELERATOR", "PROVIDER", "DEVICE_TYPE", "AVAILABLE"]);

        for listing in value {
            tab.add_row(vec![
                listing.accelerator.to_string(),
                listing.ep_name.unwrap_or("-").to_string(),
                listing.device_type.unwrap_or_else(|| "-".to_string()),
                if listing.available {
                    "yes".to_string()
                } else {
                    "no".to_string()
                },
            ]);
        }

        tab
    }
}

#[derive(serde::Serialize)]
struct Language {
    language: &'static str,
}

impl From<Vec<Language>> for Table {
    fn from(value: Vec<Language>) -> Self {
        let mut tab = Table::with_header(vec!["LANGUAGE"]);

        for language in value {
            tab.add_row(vec![language.language]);
        }

        tab
    }
}

fn get_devices(registry: &DeviceRegistry, provider: Option<&str>) -> Vec<Device> {
    match provider {
        Some(ep_name) => match registry.get(ep_name) {
            Some(devices) => devices.iter().map(Device::from).collect(),
            None => die!("execution provider \"{}\" is not available", ep_name),
        },
        None => registry
            .groups()
            .iter()
            .flat_map(|group| group.devices.iter())
            .map(Device::from)
            .collect(),
    }
}

fn get_providers(registry: &DeviceRegistry) -> Vec<Provider> {
    registry
        .groups()
        .iter()
        .map(|group| Provider {
            ep_name: group.ep_name.clone(),
            devices: group.devices.len(),
        })
        .collect()
}

/// An accelerator is available when its provider is present and, for aliases
/// implying a device type, a device of that type is present too.
fn get_accelerators(registry: &DeviceRegistry) -> Vec<AcceleratorListing> {
    Accelerator::iter()
        .map(|accelerator| {
            let ep_name = accelerator.ep_name();
            let device_type = accelerator.device_type().map(|t| t.to_string());

            let available = match ep_name {
                Some(CPU_PROVIDER) => true,
                Some(ep_name) => match (registry.get(ep_name), &device_type) {
                    (Some(devices), Some(device_type)) => {
                        devices.iter().any(|d| &d.type_name() == device_type)
                    }
                    (Some(_), None) => true,
                    (None, _) => false,
                },
                None => false,
            };

            AcceleratorListing {
                accelerator,
                ep_name,
                device_type,
                available,
            }
        })
        .collect()
}

fn format_output<O: IntoTable + serde::Serialize>(object: O, format: ListingFormat) {
    match format {
        ListingFormat::Json => match serde_json::to_string_pretty(&object) {
            Ok(output) => println!("{}", output),
            Err(err) => die!("failed to serialize listing: {}", err),
        },
        ListingFormat::Table => {
            let tab = object.into_table();

            print!("{}", tab);
        }
        ListingFormat::HeaderlessTable => {
            let mut tab = object.into_table();

            tab.print_header(false);

            print!("{}", tab);
        }
    }
}

pub(crate) fn list_cmd(resolver: &ProviderResolver, args: &ListArgs) {
    let format = args.format;

    let registry = || match resolver.device_registry() {
        Ok(registry) => registry,
        Err(err) => die!("failed to list devices: {}", report(&err)),
    };

    match &args.object {
        ListObject::Devices(args) => {
            let devices = get_devices(&registry(), args.provider.as_deref());
            format_output(devices, format);
        }
        ListObject::Providers => {
            let providers = get_providers(&registry());
            format_output(providers, format);
        }
        ListObject::Accelerators => {
            let accelerators = get_accelerators(&registry());
            format_output(accelerators, format);
        }
        ListObject::Languages => {
            let languages: Vec<Language> = LANGUAGES
                .iter()
                .map(|&language| Language { language })
                .collect();
            format_output(languages, format);
        }
    }
}
