//! Configuration validation.

use url::Url;

use crate::error::ConfigError;
use crate::schema::Config;

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Convert the first error into a [`ConfigError`], if any.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_server(config, &mut result);
        Self::validate_connection(config, &mut result);
        Self::validate_backoff(config, &mut result);
        Self::validate_dispatch(config, &mut result);

        result
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        Self::check_url(
            "server.ws_url",
            &config.server.ws_url,
            &["ws", "wss"],
            result,
        );
        Self::check_url(
            "server.api_base",
            &config.server.api_base,
            &["http", "https"],
            result,
        );
    }

    fn check_url(path: &str, value: &str, schemes: &[&str], result: &mut ValidationResult) {
        match Url::parse(value) {
            Ok(url) if schemes.contains(&url.scheme()) => {}
            Ok(url) => result.add_error(ValidationError::new(
                path,
                format!(
                    "Unsupported scheme '{}', expected one of {:?}",
                    url.scheme(),
                    schemes
                ),
            )),
            Err(e) => result.add_error(ValidationError::new(path, format!("Invalid URL: {}", e))),
        }
    }

    fn validate_connection(config: &Config, result: &mut ValidationResult) {
        let connection = &config.connection;

        for (path, value) in [
            ("connection.handshake_timeout_ms", connection.handshake_timeout_ms),
            ("connection.ping_interval_ms", connection.ping_interval_ms),
            ("connection.pong_timeout_ms", connection.pong_timeout_ms),
        ] {
            if value == 0 {
                result.add_error(ValidationError::new(path, "must be greater than 0"));
            }
        }

        if connection.outbound_buffer == 0 {
            result.add_error(ValidationError::new(
                "connection.outbound_buffer",
                "must be greater than 0",
            ));
        }

        if connection.inbound_buffer == 0 {
            result.add_error(ValidationError::new(
                "connection.inbound_buffer",
                "must be greater than 0",
            ));
        }

        if connection.pong_timeout_ms >= connection.ping_interval_ms {
            result.add_warning(ValidationWarning::new(
                "connection.pong_timeout_ms",
                "pong timeout is not shorter than the ping interval, dead links are detected late",
            ));
        }
    }

    fn validate_backoff(config: &Config, result: &mut ValidationResult) {
        let backoff = &config.backoff;

        if backoff.base_delay_ms == 0 {
            result.add_error(ValidationError::new(
                "backoff.base_delay_ms",
                "must be greater than 0",
            ));
        }

        if backoff.max_delay_ms < backoff.base_delay_ms {
            result.add_error(ValidationError::new(
                "backoff.max_delay_ms",
                "must not be smaller than base_delay_ms",
            ));
        }

        if !backoff.multiplier.is_finite() || backoff.multiplier < 1.0 {
            result.add_error(ValidationError::new(
                "backoff.multiplier",
                "must be a finite number >= 1.0",
            ));
        }
    }

    fn validate_dispatch(config: &Config, result: &mut ValidationResult) {
        if config.dispatch.timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "dispatch.timeout_ms",
                "a dispatch timeout is mandatory",
            ));
        }

        if config.dispatch.timeout_ms > 30_000 {
            result.add_warning(ValidationWarning::new(
                "dispatch.timeout_ms",
                "timeout is very high (>30s), click feedback will feel unresponsive",
            ));
        }
    }
}
