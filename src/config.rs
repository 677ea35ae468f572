use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use toml;

use crate::runtime::EpDevice;
use crate::{die, warn};

/// The external program used to compile models. See
/// [`CommandCompiler`](crate::runtime::CommandCompiler) for the placeholders
/// available in `args`.
#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Compiler {
    pub command: Option<PathBuf>,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Translator {
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub language: Option<String>,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Config {
    #[serde(default)]
    pub devices: Vec<EpDevice>,
    #[serde(default)]
    pub compiler: Compiler,
    #[serde(default)]
    pub translator: Translator,
}

fn get_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME");

    if let Some(home) = home {
        let home = PathBuf::from(home);

        const USER_PATHS: [&str; 2] = [".config/epkit/config.toml", ".epkit.toml"];

        for &path in USER_PATHS.iter() {
            let fullpath = home.join(path);

            if fullpath.exists() {
                return Some(fullpath);
            }
        }
    }

    let system_config = PathBuf::from("/etc/epkit.toml");

    if system_config.exists() {
        Some(system_config)
    } else {
        None
    }
}

fn parse_config<S: serde::de::DeserializeOwned>(config: &str) -> Result<S, toml::de::Error> {
    toml::de::from_str(config)
}

fn parse_config_or_die<S: serde::de::DeserializeOwned>(config: &str) -> S {
    match parse_config(config) {
        Ok(s) => s,
        Err(err) => die!("failed to parse config: {}", err),
    }
}

fn extra_fields_helper<'a>(
    path: &mut Vec<&'a String>,
    user_config: &'a toml::Table,
    config: &'a toml::Table,
    extra: &mut Vec<String>,
) {
    for (user_key, user_value) in user_config {
        path.push(user_key);

        match config.get(user_key) {
            Some(toml::Value::Table(config_value)) => {
                if let toml::Value::Table(user_value) = user_value {
                    extra_fields_helper(path, user_value, config_value, extra);
                }
            }
            Some(_) => {}
            None => {
                let path: Vec<&str> = path.iter().map(|&s| s.as_str()).collect();

                extra.push(path.join("."));
            }
        }

        path.pop();
    }
}

/// Dotted paths of the keys in `raw_config` that `config` did not consume.
/// Keys inside arrays of tables are not inspected.
fn extra_fields(config: &Config, raw_config: &str) -> Vec<String> {
    let user_config: toml::Table = parse_config_or_die(raw_config);

    let config: toml::Table = match toml::ser::to_string(config) {
        Ok(serialized) => parse_config_or_die(&serialized),
        Err(err) => die!("failed to reserialize config: {}", err),
    };

    let mut path = Vec::new();
    let mut extra = Vec::new();

    extra_fields_helper(&mut path, &user_config, &config, &mut extra);

    extra
}

pub(crate) fn read_config(config: Option<PathBuf>) -> Config {
    let config_path = config.or_else(get_config_path);

    if let Some(path) = config_path {
        let raw_config = match std::fs::read_to_string(&path) {
            Ok(raw_config) => raw_config,
            Err(err) => die!("failed to read config {}: {}", path.display(), err),
        };

        let config: Config = parse_config_or_die(&raw_config);

        for key in extra_fields(&config, &raw_config) {
            warn!("config contains extraneous key \"{}\", ignoring", key);
        }

        config
    } else {
        Config::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::HardwareDeviceType;

    const CONFIG: &str = r#"
[[devices]]
ep_name = "QNNExecutionProvider"
type = "NPU"
vendor = "Qualcomm"

[[devices]]
ep_name = "DmlExecutionProvider"
type = "GPU"
device_id = 4

[compiler]
command = "/usr/bin/ort-compile"
args = ["--input", "{input}", "--output", "{output}"]

[translator]
api_base = "http://localhost:11434/v1/"
model = "phi3"
colour = "blue"
"#;

    #[test]
    fn test_parse_config() {
        let config: Config = parse_config(CONFIG).unwrap();

        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[0].hardware.device_type, HardwareDeviceType::Npu);
        assert_eq!(config.devices[1].hardware.device_id, 4);
        assert_eq!(
            config.compiler.command,
            Some(PathBuf::from("/usr/bin/ort-compile"))
        );
        assert_eq!(config.compiler.args.len(), 4);
        assert_eq!(config.translator.model.as_deref(), Some("phi3"));
        assert!(config.translator.api_key.is_none());
    }

    #[test]
    fn test_extra_fields() {
        let config: Config = parse_config(CONFIG).unwrap();

        assert_eq!(extra_fields(&config, CONFIG), vec!["translator.colour"]);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = parse_config("").unwrap();

        assert!(config.devices.is_empty());
        assert!(config.compiler.command.is_none());
        assert!(extra_fields(&config, "").is_empty());
    }

    #[test]
    fn test_bad_device_type() {
        let raw = "[[devices]]\nep_name = \"X\"\ntype = \"TPU\"\n";

        assert!(parse_config::<Config>(raw).is_err());
    }
}
