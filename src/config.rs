use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::optimizer::SolverConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub solver: SolverSettings,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            solver: SolverSettings::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "CUBEMASTER_API_HOST";
    const PORT_VAR: &'static str = "CUBEMASTER_API_PORT";

    fn from_env() -> Self {
        let host_value =
            env_string(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                log::warn!(
                    "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string(Self::PORT_VAR) {
            Some(raw) => parse_port(&raw).unwrap_or(Self::DEFAULT_PORT),
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Solver parameters that can be tuned per deployment.
#[derive(Clone, Debug)]
pub struct SolverSettings {
    solver: SolverConfig,
}

impl SolverSettings {
    const COMPACTION_STEP_VAR: &'static str = "CUBEMASTER_COMPACTION_STEP";
    const COMPACTION_WINDOW_VAR: &'static str = "CUBEMASTER_COMPACTION_WINDOW";
    const COMPACTION_VAR: &'static str = "CUBEMASTER_COMPACTION";

    fn from_env() -> Self {
        let compaction_step = load_f64_with_warning(
            Self::COMPACTION_STEP_VAR,
            SolverConfig::DEFAULT_COMPACTION_STEP,
            |value| value > 0.0,
            "must be greater than 0",
            "Warning: Adjusted compaction step changes how far items slide",
        );

        let compaction_window = load_f64_with_warning(
            Self::COMPACTION_WINDOW_VAR,
            SolverConfig::DEFAULT_COMPACTION_WINDOW,
            |value| value >= 0.0,
            "must not be negative",
            "Warning: Adjusted compaction window changes how far items slide",
        );

        let compaction_enabled = env_string(Self::COMPACTION_VAR)
            .and_then(|raw| parse_bool(&raw, Self::COMPACTION_VAR))
            .unwrap_or(SolverConfig::DEFAULT_COMPACTION_ENABLED);

        let solver = SolverConfig::builder()
            .compaction_step(compaction_step)
            .compaction_window(compaction_window)
            .compaction_enabled(compaction_enabled)
            .build();

        Self { solver }
    }

    /// Returns the configured SolverConfig.
    pub fn solver_config(&self) -> SolverConfig {
        self.solver
    }
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            log::warn!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name,
                err
            );
            None
        }
    }
}

fn parse_port(raw: &str) -> Option<u16> {
    match raw.trim().parse::<u16>() {
        Ok(0) => {
            log::warn!("⚠️ {} must not be 0. Using default port.", ApiConfig::PORT_VAR);
            None
        }
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!(
                "⚠️ Could not parse {} ('{}'): {}. Using default port.",
                ApiConfig::PORT_VAR,
                raw,
                err
            );
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            log::warn!(
                "⚠️ Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name,
                other
            );
            None
        }
    }
}

fn parse_f64_with_warning(
    var_name: &str,
    raw: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match raw.parse::<f64>() {
        Ok(value) if !value.is_finite() || !validator(value) => {
            log::warn!(
                "⚠️ {} contains invalid value '{}': {}. Using {}.",
                var_name,
                raw,
                invalid_hint,
                default
            );
            default
        }
        Ok(value) => {
            let tolerance = (default.abs().max(1.0)) * 1e-9;
            if (value - default).abs() > tolerance {
                log::info!("⚠️ {} ({} = {}).", warning, var_name, value);
            }
            value
        }
        Err(err) => {
            log::warn!(
                "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                var_name,
                raw,
                err,
                default
            );
            default
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => {
            parse_f64_with_warning(var_name, &raw, default, validator, invalid_hint, warning)
        }
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_true_values() {
        assert_eq!(parse_bool("1", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("true", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("yes", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("y", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("on", "TEST_VAR"), Some(true));

        // Test case insensitivity
        assert_eq!(parse_bool("TRUE", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("ON", "TEST_VAR"), Some(true));

        // Test with whitespace
        assert_eq!(parse_bool(" true ", "TEST_VAR"), Some(true));
    }

    #[test]
    fn test_parse_bool_false_values() {
        assert_eq!(parse_bool("0", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("false", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("no", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("n", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("OFF", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("  0  ", "TEST_VAR"), Some(false));
    }

    #[test]
    fn test_parse_bool_invalid_values() {
        assert_eq!(parse_bool("invalid", "TEST_VAR"), None);
        assert_eq!(parse_bool("2", "TEST_VAR"), None);
        assert_eq!(parse_bool("", "TEST_VAR"), None);
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("9000"), Some(9000));
        assert_eq!(parse_port(" 8081 "), Some(8081));
        assert_eq!(parse_port("0"), None);
        assert_eq!(parse_port("70000"), None);
        assert_eq!(parse_port("http"), None);
    }

    #[test]
    fn test_parse_f64_falls_back_on_invalid_values() {
        let positive = |v: f64| v > 0.0;
        assert_eq!(
            parse_f64_with_warning("TEST_VAR", "2.5", 5.0, positive, "hint", "warn"),
            2.5
        );
        assert_eq!(
            parse_f64_with_warning("TEST_VAR", "-1", 5.0, positive, "hint", "warn"),
            5.0
        );
        assert_eq!(
            parse_f64_with_warning("TEST_VAR", "NaN", 5.0, positive, "hint", "warn"),
            5.0
        );
        assert_eq!(
            parse_f64_with_warning("TEST_VAR", "five", 5.0, positive, "hint", "warn"),
            5.0
        );
    }

    #[test]
    fn test_default_solver_settings() {
        let settings = SolverSettings::default();
        assert_eq!(settings.solver_config(), SolverConfig::default());
    }
}
