mod accelerator;
mod chat;
mod cli;
mod color;
mod config;
mod registry;
mod runtime;
mod translator;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use cli::{
    attach::attach_cmd, compile::compile_cmd, list::list_cmd, translate::translate_cmd, ColorMode,
};
use registry::{populate, ProviderResolver};
use runtime::environment::{global, install_global};

#[derive(
    Parser, Default, Clone, Copy, ValueEnum, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum RequestedColorMode {
    #[default]
    Auto,
    On,
    Off,
}

#[derive(Parser)]
#[command(name = "epkit")]
#[command(
    about = "Resolve execution providers, compile models for them, and translate text",
    version = "0.1.0"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    #[arg(long, default_value_t = RequestedColorMode::default())]
    color: RequestedColorMode,
    /// Print debug messages and the full cause of errors
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Read the configuration from this file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List devices, providers, accelerators, or languages
    List(ListArgs),
    /// Attach an execution provider to a session and report the outcome
    Attach(AttachArgs),
    /// Compile a model for an execution provider, reusing a cached result
    Compile(CompileArgs),
    /// Translate text with a chat model
    Translate(TranslateArgs),
}

/// Possible listings
#[derive(Subcommand)]
pub(crate) enum ListObject {
    /// Devices reported by the environment
    Devices(ListDeviceArgs),
    /// Execution providers and their device counts
    Providers,
    /// Accelerator aliases and whether they are available
    Accelerators,
    /// Languages available for translation
    Languages,
}

/// Output formats
#[derive(
    Parser, ValueEnum, Default, Clone, Copy, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum ListingFormat {
    /// Format the output as a table
    #[default]
    Table,
    /// Format the output as JSON
    Json,
    /// Format the output as a table without a header
    HeaderlessTable,
}

#[derive(Parser)]
pub(crate) struct ListArgs {
    /// Output the listing with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
    /// List the specified object
    #[command(subcommand)]
    object: ListObject,
}

#[derive(Parser, Default)]
pub(crate) struct ListDeviceArgs {
    /// Limit listing to the specified execution provider
    #[arg(short, long)]
    provider: Option<String>,
}

#[derive(Parser)]
pub(crate) struct AttachArgs {
    /// An accelerator alias (e.g. "QNN", "NPU") or an execution provider name
    provider: String,
    /// The device type to select, for providers which select by type
    #[arg(short, long)]
    device_type: Option<String>,
    /// Output the outcome with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
}

#[derive(Parser)]
pub(crate) struct CompileArgs {
    /// The source model
    model: PathBuf,
    /// An accelerator alias or an execution provider name
    #[arg(short, long)]
    provider: String,
    /// The device type to select, for providers which select by type
    #[arg(short = 't', long)]
    device_type: Option<String>,
    /// The device identifier in the compiled model's name; defaults to the
    /// lowercase accelerator
    #[arg(short, long)]
    device: Option<String>,
}

#[derive(Parser, Default)]
pub(crate) struct TranslateArgs {
    /// The language to translate into
    #[arg(short, long)]
    language: Option<String>,
    /// The chat model used for translation
    #[arg(short, long)]
    model: Option<String>,
    /// The text to translate; read from standard input when absent
    text: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let color = ColorMode::resolve_auto(cli.color);

    color::configure_color(color);
    utils::errors::configure_verbose(cli.verbose);

    let config = config::read_config(cli.config.clone());

    install_global(Arc::new(populate::environment(&config)));

    let resolver = ProviderResolver::new(global());

    match &cli.command {
        Some(Commands::List(args)) => list_cmd(&resolver, args),
        Some(Commands::Attach(args)) => attach_cmd(&resolver, args),
        Some(Commands::Compile(args)) => {
            compile_cmd(&resolver, populate::compiler(&config), args).await
        }
        Some(Commands::Translate(args)) => translate_cmd(&config, args).await,
        None => translate_cmd(&config, &TranslateArgs::default()).await,
    }
}
