//! An HTTP client that fetches trigger configuration from the server.
use reqwest::{StatusCode, Url};

use crate::{configuration::ConfigResponse, Configuration, Error, Result};

pub(crate) struct ConfigurationFetcherConfig {
    pub base_url: String,
    pub api_key: String,
}

const CONFIG_ENDPOINT: &str = "/v1/static_config";

/// A client that fetches configuration from the server.
pub(crate) struct ConfigurationFetcher {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::blocking::Client,
    config: ConfigurationFetcherConfig,
    /// If we receive a 401 Unauthorized error during a request, it means the API key is not
    /// valid. We cache this error so we don't issue additional requests to the server.
    unauthorized: bool,
}

impl ConfigurationFetcher {
    pub fn new(config: ConfigurationFetcherConfig) -> ConfigurationFetcher {
        ConfigurationFetcher {
            client: reqwest::blocking::Client::new(),
            config,
            unauthorized: false,
        }
    }

    pub fn fetch_configuration(&mut self) -> Result<Configuration> {
        if self.unauthorized {
            return Err(Error::Unauthorized);
        }

        let url = config_url(&self.config)?;

        log::debug!(target: "paywall", "fetching trigger configuration");
        let response = self.client.get(url).send()?;

        let response = response.error_for_status().map_err(|err| {
            if err.status() == Some(StatusCode::UNAUTHORIZED) {
                log::warn!(target: "paywall", "client is not authorized. Check your API key");
                self.unauthorized = true;
                Error::Unauthorized
            } else {
                log::warn!(target: "paywall", "received non-200 response while fetching configuration: {:?}", err);
                Error::from(err)
            }
        })?;

        let response: ConfigResponse = response.json()?;

        log::debug!(target: "paywall",
                    triggers = response.triggers.len();
                    "successfully fetched trigger configuration");

        Ok(Configuration::from_server_response(response))
    }
}

fn config_url(config: &ConfigurationFetcherConfig) -> Result<Url> {
    Url::parse_with_params(
        &format!("{}{}", config.base_url, CONFIG_ENDPOINT),
        &[
            ("apiKey", &*config.api_key),
            ("sdkName", "rust"),
            ("sdkVersion", env!("CARGO_PKG_VERSION")),
        ],
    )
    .map_err(Error::InvalidBaseUrl)
}

#[cfg(test)]
mod tests {
    use super::{config_url, ConfigurationFetcher, ConfigurationFetcherConfig};
    use crate::Error;

    #[test]
    fn builds_config_url() {
        let url = config_url(&ConfigurationFetcherConfig {
            base_url: "https://api.example.com/api".to_owned(),
            api_key: "pk_123".to_owned(),
        })
        .unwrap();

        assert_eq!(url.path(), "/api/v1/static_config");
        assert!(url
            .query_pairs()
            .any(|(key, value)| key == "apiKey" && value == "pk_123"));
        assert!(url
            .query_pairs()
            .any(|(key, value)| key == "sdkName" && value == "rust"));
    }

    #[test]
    fn rejects_invalid_base_url() {
        let mut fetcher = ConfigurationFetcher::new(ConfigurationFetcherConfig {
            base_url: "not a url".to_owned(),
            api_key: "pk_123".to_owned(),
        });

        assert!(matches!(
            fetcher.fetch_configuration(),
            Err(Error::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn unauthorized_is_cached() {
        let mut fetcher = ConfigurationFetcher::new(ConfigurationFetcherConfig {
            base_url: "not a url".to_owned(),
            api_key: "pk_123".to_owned(),
        });
        fetcher.unauthorized = true;

        assert!(matches!(
            fetcher.fetch_configuration(),
            Err(Error::Unauthorized)
        ));
    }
}
