use super::list::table::Table;
use crate::{
    accelerator::ProviderRequest,
    die,
    registry::{Attachment, ProviderResolver},
    runtime::SessionOptions,
    utils::errors::report,
    warn, AttachArgs, ListingFormat,
};

fn outcome(attachment: &Attachment) -> &'static str {
    match attachment {
        Attachment::Implicit => "implicit",
        Attachment::Attached { .. } => "attached",
        Attachment::NoMatchingDevice { .. } => "no_matching_device",
        Attachment::Unsupported { .. } => "unsupported",
    }
}

impl From<&Attachment> for Table {
    fn from(value: &Attachment) -> Self {
        let mut tab = Table::with_header(vec!["OUTCOME", "PROVIDER", "DEVICES", "OPTIONS"]);

        let (ep_name, devices, options) = match value {
            Attachment::Implicit => ("CPU".to_string(), "-".to_string(), "-".to_string()),
            Attachment::Attached {
                ep_name,
                devices,
                options,
            } => (
                ep_name.clone(),
                devices
                    .iter()
                    .map(|d| d.type_name())
                    .collect::<Vec<_>>()
                    .join(","),
                if options.is_empty() {
                    "-".to_string()
                } else {
                    options.to_string()
                },
            ),
            Attachment::NoMatchingDevice { ep_name, .. } | Attachment::Unsupported { ep_name } => {
                (ep_name.clone(), "-".to_string(), "-".to_string())
            }
        };

        tab.add_row(vec![outcome(value).to_string(), ep_name, devices, options]);

        tab
    }
}

/// Resolve a provider request against a fresh session.
pub(crate) fn attach_provider(
    resolver: &ProviderResolver,
    session: &mut SessionOptions,
    request: &ProviderRequest,
) -> Attachment {
    match resolver.attach(session, &request.ep_name, request.device_type.as_deref()) {
        Ok(attachment) => attachment,
        Err(err) => die!(
            "failed to attach \"{}\": {}",
            request.ep_name,
            report(&err)
        ),
    }
}

pub(crate) fn attach_cmd(resolver: &ProviderResolver, args: &AttachArgs) {
    let request = match ProviderRequest::parse(&args.provider, args.device_type.as_deref()) {
        Ok(request) => request,
        Err(err) => die!("{}", err),
    };

    let mut session = SessionOptions::new();
    let attachment = attach_provider(resolver, &mut session, &request);

    match args.format {
        ListingFormat::Json => match serde_json::to_string_pretty(&attachment) {
            Ok(output) => println!("{}", output),
            Err(err) => die!("failed to serialize attachment: {}", err),
        },
        ListingFormat::Table => print!("{}", Table::from(&attachment)),
        ListingFormat::HeaderlessTable => {
            let mut tab = Table::from(&attachment);

            tab.print_header(false);

            print!("{}", tab);
        }
    }

    if !attachment.is_success() {
        die!("execution provider \"{}\" is not available", request.ep_name);
    }

    if let Attachment::NoMatchingDevice {
        ep_name,
        device_type,
    } = &attachment
    {
        warn!(
            "\"{}\" has no {} device, the session will use its defaults",
            ep_name,
            device_type.as_deref().unwrap_or("untyped")
        );
    }
}
