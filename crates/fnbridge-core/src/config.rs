use std::env;

use crate::error::BridgeError;

/// Name of the deployed function, set by the function platform.
pub const ENV_FUNCTION_TARGET: &str = "FUNCTION_TARGET";
/// Standalone listener port.
pub const ENV_PORT: &str = "PORT";
/// Set to `development` by the front-end build tooling to select dev-mode
/// asset serving.
pub const ENV_NODE_ENV: &str = "NODE_ENV";

pub const DEFAULT_PORT: u16 = 3000;

/// Process configuration, resolved from the environment once at startup.
/// There is deliberately no manifest file and no CLI surface; the hosting
/// platform speaks environment variables only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub function_target: Option<String>,
    pub port: u16,
    pub dev: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            function_target: None,
            port: DEFAULT_PORT,
            dev: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, BridgeError> {
        let function_target = env::var(ENV_FUNCTION_TARGET)
            .ok()
            .filter(|value| !value.is_empty());

        let port = match env::var(ENV_PORT) {
            Ok(raw) => raw.parse().map_err(|_| {
                BridgeError::config(format!("{ENV_PORT} must be a TCP port number, got `{raw}`"))
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let dev = env::var(ENV_NODE_ENV)
            .map(|value| value == "development")
            .unwrap_or(false);

        Ok(Self {
            function_target,
            port,
            dev,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        env::remove_var(ENV_FUNCTION_TARGET);
        env::remove_var(ENV_PORT);
        env::remove_var(ENV_NODE_ENV);
    }

    #[test]
    #[serial]
    fn defaults_apply_when_environment_is_empty() {
        clear_env();
        let config = Config::from_env().expect("config");
        assert_eq!(config, Config::default());
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    #[serial]
    fn reads_all_variables() {
        clear_env();
        env::set_var(ENV_FUNCTION_TARGET, "ssr");
        env::set_var(ENV_PORT, "8080");
        env::set_var(ENV_NODE_ENV, "development");

        let config = Config::from_env().expect("config");
        assert_eq!(config.function_target.as_deref(), Some("ssr"));
        assert_eq!(config.port, 8080);
        assert!(config.dev);

        clear_env();
    }

    #[test]
    #[serial]
    fn empty_function_target_counts_as_unset() {
        clear_env();
        env::set_var(ENV_FUNCTION_TARGET, "");
        let config = Config::from_env().expect("config");
        assert!(config.function_target.is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn invalid_port_is_a_config_error() {
        clear_env();
        env::set_var(ENV_PORT, "not-a-port");
        let err = Config::from_env().expect_err("error");
        assert!(err.message().contains("PORT"));
        clear_env();
    }

    #[test]
    #[serial]
    fn production_node_env_is_not_dev() {
        clear_env();
        env::set_var(ENV_NODE_ENV, "production");
        let config = Config::from_env().expect("config");
        assert!(!config.dev);
        clear_env();
    }
}
