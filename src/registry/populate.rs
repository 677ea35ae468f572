use std::env::VarError;

use crate::config::Config;
use crate::die;
use crate::runtime::{CommandCompiler, ManifestEnvironment};
use crate::translator::{OpenAIClient, DEFAULT_API_BASE};

const OPENAI_ENV_KEY_VAR: &str = "OPENAI_API_KEY";

/// The default model requested from the chat service.
pub(crate) const DEFAULT_MODEL: &str = "phi3";

pub(crate) const DEFAULT_LANGUAGE: &str = "English";

fn openai_api_key() -> Option<String> {
    match std::env::var(OPENAI_ENV_KEY_VAR) {
        Ok(api_key) => Some(api_key),
        Err(err) => match err {
            VarError::NotUnicode(_) => die!("failed to parse {}", OPENAI_ENV_KEY_VAR),
            VarError::NotPresent => None,
        },
    }
}

/// The environment described by the `[[devices]]` tables of the config.
pub(crate) fn environment(config: &Config) -> ManifestEnvironment {
    ManifestEnvironment::new(config.devices.clone())
}

/// The configured model compiler, if a command was given.
pub(crate) fn compiler(config: &Config) -> Option<CommandCompiler> {
    config
        .compiler
        .command
        .as_ref()
        .map(|command| CommandCompiler::new(command.clone(), config.compiler.args.clone()))
}

/// A chat client for the configured service. The key from the config takes
/// precedence over the environment.
pub(crate) fn chat_client(config: &Config) -> OpenAIClient {
    let translator = &config.translator;

    let api_key = translator.api_key.clone().or_else(openai_api_key);
    let api_base = translator.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);

    match OpenAIClient::new(api_base, api_key) {
        Ok(client) => client,
        Err(err) => die!("translator API base \"{}\" failed to parse: {}", api_base, err),
    }
}

pub(crate) fn model(config: &Config) -> &str {
    config.translator.model.as_deref().unwrap_or(DEFAULT_MODEL)
}

pub(crate) fn language(config: &Config) -> &str {
    config
        .translator
        .language
        .as_deref()
        .unwrap_or(DEFAULT_LANGUAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{EpDevice, Environment, HardwareDeviceType};
    use std::path::PathBuf;

    #[test]
    fn test_environment_from_config() {
        let mut config = Config::default();
        config
            .devices
            .push(EpDevice::new("QNNExecutionProvider", HardwareDeviceType::Npu));

        let env = environment(&config);

        assert_eq!(env.ep_devices().unwrap(), config.devices);
    }

    #[test]
    fn test_compiler_requires_command() {
        let mut config = Config::default();

        assert!(compiler(&config).is_none());

        config.compiler.command = Some(PathBuf::from("/usr/bin/true"));

        assert!(compiler(&config).is_some());
    }

    #[test]
    fn test_translator_defaults() {
        let mut config = Config::default();

        assert_eq!(model(&config), DEFAULT_MODEL);
        assert_eq!(language(&config), DEFAULT_LANGUAGE);

        config.translator.model = Some("llama3".to_string());
        config.translator.language = Some("French".to_string());

        assert_eq!(model(&config), "llama3");
        assert_eq!(language(&config), "French");
    }
}
