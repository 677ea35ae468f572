//! The registry resolves execution providers to the devices that will run a
//! model and caches models compiled for those devices.
//!
//! Devices are reported by a runtime [`Environment`](crate::runtime::Environment),
//! each tagged with the name of the execution provider which drives it. The
//! [`DeviceRegistry`] groups them by provider. Names are case-insensitive, so
//! "QNNExecutionProvider" and "qnnexecutionprovider" refer to the same group.
//!
//! Attaching a provider to a session goes through the [`ProviderResolver`]:
//!
//! ```text
//! "CPU"                      -> nothing to attach
//! unknown provider           -> unsupported, session untouched
//! DmlExecutionProvider       -> first device only
//! OpenVINOExecutionProvider  -> the device whose type matches the hint
//! QNNExecutionProvider       -> all devices, htp_performance_mode=high_performance
//! anything else              -> all devices
//! ```
//!
//! Once a session has its providers, [`get_or_compile_model`] produces a
//! device-specialized model next to the source model, or reuses the one
//! already there.

pub(crate) mod compiled;
pub(crate) mod populate;
pub(crate) mod registry;
pub(crate) mod resolver;

mod default_options;

pub(crate) use compiled::get_or_compile_model;
pub(crate) use registry::DeviceRegistry;
pub(crate) use resolver::{Attachment, ProviderResolver};
