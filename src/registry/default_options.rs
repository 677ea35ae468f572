use crate::runtime::ProviderOptions;

use super::resolver::ProviderKind;

pub(crate) const HTP_PERFORMANCE_MODE: &str = "htp_performance_mode";

/// Tuning options applied whenever a provider of the given kind is attached.
pub(crate) fn default_options(kind: ProviderKind) -> ProviderOptions {
    let mut options = ProviderOptions::new();

    match kind {
        ProviderKind::Qnn => options.insert(HTP_PERFORMANCE_MODE, "high_performance"),
        ProviderKind::Dml | ProviderKind::OpenVino | ProviderKind::Other => {}
    }

    options
}
