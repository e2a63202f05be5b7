//! Shared AWS SDK configuration.
//!
//! One [`SdkConfig`] is loaded per process and every service client
//! (DynamoDB, S3, SES) is derived from it, so region, endpoint, retry and
//! timeout settings apply uniformly.

use std::time::Duration;

use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig as SdkRetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};

use crate::config::ClientConfig;

impl ClientConfig {
    /// Load the shared SDK configuration, falling back to the default
    /// credential and region chains for anything not set explicitly.
    pub async fn load_sdk_config(&self) -> SdkConfig {
        let mut config_loader = aws_config::defaults(BehaviorVersion::latest())
            .region(self.build_region_provider())
            .retry_config(self.build_retry_config())
            .timeout_config(self.build_timeout_config());

        if let Some(endpoint_url) = self.endpoint_url.as_ref() {
            config_loader = config_loader.endpoint_url(endpoint_url);
        }

        config_loader.load().await
    }

    pub fn create_dynamodb_client(&self, sdk_config: &SdkConfig) -> aws_sdk_dynamodb::Client {
        aws_sdk_dynamodb::Client::new(sdk_config)
    }

    pub fn create_s3_client(&self, sdk_config: &SdkConfig) -> aws_sdk_s3::Client {
        let s3_config = aws_sdk_s3::config::Builder::from(sdk_config)
            .force_path_style(self.force_path_style)
            .build();
        aws_sdk_s3::Client::from_conf(s3_config)
    }

    pub fn create_ses_client(&self, sdk_config: &SdkConfig) -> aws_sdk_sesv2::Client {
        aws_sdk_sesv2::Client::new(sdk_config)
    }

    fn build_region_provider(&self) -> RegionProviderChain {
        RegionProviderChain::first_try(self.region.clone().map(Region::new)).or_default_provider()
    }

    fn build_retry_config(&self) -> SdkRetryConfig {
        SdkRetryConfig::standard()
            .with_max_attempts(self.retry_config.aws_max_attempts)
            .with_initial_backoff(Duration::from_millis(
                self.retry_config.initial_backoff_milliseconds,
            ))
    }

    fn build_timeout_config(&self) -> TimeoutConfig {
        let timeout = &self.cli_timeout_config;
        let mut builder = TimeoutConfig::builder();

        if let Some(millis) = timeout.operation_timeout_milliseconds {
            builder = builder.operation_timeout(Duration::from_millis(millis));
        }
        if let Some(millis) = timeout.operation_attempt_timeout_milliseconds {
            builder = builder.operation_attempt_timeout(Duration::from_millis(millis));
        }
        if let Some(millis) = timeout.connect_timeout_milliseconds {
            builder = builder.connect_timeout(Duration::from_millis(millis));
        }
        if let Some(millis) = timeout.read_timeout_milliseconds {
            builder = builder.read_timeout(Duration::from_millis(millis));
        }

        builder.build()
    }
}
