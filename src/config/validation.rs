use crate::config::types::{
    Config, CrawlerConfig, FilterConfig, OutputConfig, PacerConfig, SourceConfig,
};
use crate::source::ListingId;
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_pacer_config(&config.pacer)?;
    validate_source_config(&config.source)?;
    validate_filter_config(&config.filter)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_visits == Some(0) {
        return Err(ConfigError::Validation(
            "max_visits must be >= 1 when set".to_string(),
        ));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.retry_base_delay_ms > config.retry_max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "retry_base_delay_ms ({}) cannot exceed retry_max_delay_ms ({})",
            config.retry_base_delay_ms, config.retry_max_delay_ms
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_pacer_config(config: &PacerConfig) -> Result<(), ConfigError> {
    if config.min_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "pacer min_delay_ms ({}) cannot exceed max_delay_ms ({})",
            config.min_delay_ms, config.max_delay_ms
        )));
    }

    // 0/0 disables pacing; any other window needs jitter
    if config.max_delay_ms > 0 && config.min_delay_ms == config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "pacer needs a jitter window, got a fixed {}ms",
            config.min_delay_ms
        )));
    }

    Ok(())
}

fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.api_base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid api_base_url '{}': {}", config.api_base_url, e))
    })?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "api_base_url '{}' must use http or https",
            config.api_base_url
        )));
    }

    for seed in &config.seeds {
        if ListingId::new(seed).is_none() {
            return Err(ConfigError::Validation(format!(
                "Seed '{}' is not a valid listing id",
                seed
            )));
        }
    }

    for (name, value) in &config.headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(ConfigError::Validation(format!(
                "'{}' is not a valid header name",
                name
            )));
        }
        if HeaderValue::from_str(value).is_err() {
            return Err(ConfigError::Validation(format!(
                "header '{}' has an invalid value",
                name
            )));
        }
    }

    Ok(())
}

fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    if config.allowed_categories.is_empty() {
        return Err(ConfigError::Validation(
            "allowed_categories must list at least one category code".to_string(),
        ));
    }

    if config.allowed_categories.iter().any(|c| c.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "allowed_categories cannot contain empty codes".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.raw_root.is_empty() {
        return Err(ConfigError::Validation(
            "raw_root cannot be empty".to_string(),
        ));
    }

    if config.processed_root.is_empty() {
        return Err(ConfigError::Validation(
            "processed_root cannot be empty".to_string(),
        ));
    }

    if config.formats.is_empty() {
        return Err(ConfigError::Validation(
            "at least one output format is required".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;
    use std::collections::BTreeMap;

    fn source_config() -> SourceConfig {
        SourceConfig {
            kind: Source::Olx,
            api_base_url: "https://apigw.olx.com.br/api/v2/rec".to_string(),
            region_id: "81".to_string(),
            subcategory_id: "1020".to_string(),
            seeds: vec!["1387432094".to_string()],
            headers: BTreeMap::new(),
        }
    }

    #[test]
    fn test_validate_pacer_window() {
        assert!(validate_pacer_config(&PacerConfig::default()).is_ok());
        assert!(validate_pacer_config(&PacerConfig {
            min_delay_ms: 0,
            max_delay_ms: 0
        })
        .is_ok());

        assert!(validate_pacer_config(&PacerConfig {
            min_delay_ms: 5000,
            max_delay_ms: 2000
        })
        .is_err());
        assert!(validate_pacer_config(&PacerConfig {
            min_delay_ms: 3000,
            max_delay_ms: 3000
        })
        .is_err());
    }

    #[test]
    fn test_validate_crawler_bounds() {
        assert!(validate_crawler_config(&CrawlerConfig::default()).is_ok());

        let mut config = CrawlerConfig::default();
        config.max_visits = Some(0);
        assert!(validate_crawler_config(&config).is_err());

        let mut config = CrawlerConfig::default();
        config.retry_base_delay_ms = 60_000;
        assert!(validate_crawler_config(&config).is_err());
    }

    #[test]
    fn test_validate_source_seeds_and_url() {
        assert!(validate_source_config(&source_config()).is_ok());

        let mut config = source_config();
        config.seeds.push("../../etc/passwd".to_string());
        assert!(matches!(
            validate_source_config(&config),
            Err(ConfigError::Validation(_))
        ));

        let mut config = source_config();
        config.api_base_url = "ftp://apigw.olx.com.br".to_string();
        assert!(matches!(
            validate_source_config(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_validate_source_headers() {
        let mut config = source_config();
        config
            .headers
            .insert("Origin".to_string(), "https://www.olx.com.br".to_string());
        assert!(validate_source_config(&config).is_ok());

        let mut config = source_config();
        config.headers.insert("User Agent".to_string(), "ripple".to_string());
        assert!(matches!(
            validate_source_config(&config),
            Err(ConfigError::Validation(_))
        ));

        let mut config = source_config();
        config.headers.insert(String::new(), "ripple".to_string());
        assert!(validate_source_config(&config).is_err());

        let mut config = source_config();
        config
            .headers
            .insert("Referer".to_string(), "line\nbreak".to_string());
        assert!(matches!(
            validate_source_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_filter_requires_categories() {
        assert!(validate_filter_config(&FilterConfig::default()).is_ok());

        let config = FilterConfig {
            allowed_categories: vec![],
            denied_gallery_titles: vec![],
        };
        assert!(validate_filter_config(&config).is_err());
    }
}
