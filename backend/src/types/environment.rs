//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};

/// Default bound on a single store call
const DEFAULT_STORE_CALL_TIMEOUT: Duration = Duration::from_millis(3000);

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Returns the `DynamoDB` table holding users, products and carts
    ///
    /// # Panics
    ///
    /// Panics if the `DYNAMODB_TABLE_NAME` environment variable is not set outside development
    #[must_use]
    pub fn dynamodb_table_name(&self) -> String {
        match self {
            Self::Production | Self::Staging => env::var("DYNAMODB_TABLE_NAME")
                .expect("DYNAMODB_TABLE_NAME environment variable is not set"),
            Self::Development => {
                env::var("DYNAMODB_TABLE_NAME").unwrap_or_else(|_| "shop-table".to_string())
            }
        }
    }

    /// Upper bound on a single store call, from `STORE_CALL_TIMEOUT_MS`
    #[must_use]
    pub fn store_call_timeout(&self) -> Duration {
        env::var("STORE_CALL_TIMEOUT_MS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .filter(|millis| *millis > 0)
            .map_or(DEFAULT_STORE_CALL_TIMEOUT, Duration::from_millis)
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development | Self::Staging)
    }

    /// Returns the endpoint URL to use for AWS services
    ///
    /// `AWS_ENDPOINT_URL` wins when set; development otherwise talks to `LocalStack`.
    #[must_use]
    pub fn override_aws_endpoint_url(&self) -> Option<String> {
        env::var("AWS_ENDPOINT_URL").ok().or_else(|| match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development => Some("http://localhost:4566".to_string()),
        })
    }

    /// AWS configuration with retries disabled and an operation timeout
    ///
    /// Store calls are already bounded by [`Self::store_call_timeout`]; the SDK never
    /// retries on its own.
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(self.store_call_timeout())
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(RetryConfig::disabled())
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_environment_from_env() {
        // Test development (default)
        env::remove_var("APP_ENV");
        assert_eq!(Environment::from_env(), Environment::Development);

        env::set_var("APP_ENV", " Development ");
        assert_eq!(Environment::from_env(), Environment::Development);

        env::set_var("APP_ENV", "staging");
        assert_eq!(Environment::from_env(), Environment::Staging);

        env::set_var("APP_ENV", "production");
        assert_eq!(Environment::from_env(), Environment::Production);

        env::remove_var("APP_ENV");
    }

    #[test]
    #[serial]
    #[should_panic(expected = "Invalid environment: invalid")]
    fn test_invalid_environment() {
        env::set_var("APP_ENV", "invalid");
        let _ = Environment::from_env();
    }

    #[test]
    #[serial]
    fn test_store_call_timeout() {
        let env = Environment::Development;

        env::remove_var("STORE_CALL_TIMEOUT_MS");
        assert_eq!(env.store_call_timeout(), Duration::from_millis(3000));

        env::set_var("STORE_CALL_TIMEOUT_MS", "250");
        assert_eq!(env.store_call_timeout(), Duration::from_millis(250));

        // Invalid and zero values fall back to the default
        env::set_var("STORE_CALL_TIMEOUT_MS", "soon");
        assert_eq!(env.store_call_timeout(), Duration::from_millis(3000));
        env::set_var("STORE_CALL_TIMEOUT_MS", "0");
        assert_eq!(env.store_call_timeout(), Duration::from_millis(3000));

        env::remove_var("STORE_CALL_TIMEOUT_MS");
    }

    #[test]
    #[serial]
    fn test_dynamodb_table_name() {
        env::remove_var("DYNAMODB_TABLE_NAME");
        assert_eq!(Environment::Development.dynamodb_table_name(), "shop-table");

        env::set_var("DYNAMODB_TABLE_NAME", "shop-staging");
        assert_eq!(Environment::Staging.dynamodb_table_name(), "shop-staging");

        env::remove_var("DYNAMODB_TABLE_NAME");
    }

    #[test]
    #[serial]
    fn test_aws_endpoint_override() {
        env::remove_var("AWS_ENDPOINT_URL");
        assert_eq!(
            Environment::Development.override_aws_endpoint_url().as_deref(),
            Some("http://localhost:4566")
        );
        assert_eq!(Environment::Production.override_aws_endpoint_url(), None);

        env::set_var("AWS_ENDPOINT_URL", "http://dynamodb:8000");
        assert_eq!(
            Environment::Production.override_aws_endpoint_url().as_deref(),
            Some("http://dynamodb:8000")
        );

        env::remove_var("AWS_ENDPOINT_URL");
    }

    #[test]
    fn test_api_docs_hidden_in_production() {
        assert!(Environment::Development.show_api_docs());
        assert!(Environment::Staging.show_api_docs());
        assert!(!Environment::Production.show_api_docs());
    }
}
