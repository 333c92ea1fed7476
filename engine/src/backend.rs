use crate::build::SearchRequest;
use crate::error::TransportError;
use crate::types::{SearchResponse, UserResponse};

/// Transport for search requests
pub trait SearchBackend {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, TransportError>;
}

/// Transport for the session endpoints
pub trait AuthBackend {
    /// Fetch the user bound to the current session
    fn current_user(&self) -> Result<UserResponse, TransportError>;

    /// Extend the current session
    fn renew_session(&self) -> Result<(), TransportError>;

    /// End the current session
    fn logout(&self) -> Result<(), TransportError>;
}

#[cfg(feature = "native")]
pub use http::HttpBackend;

#[cfg(feature = "native")]
mod http {
    use super::{AuthBackend, SearchBackend};
    use crate::build::SearchRequest;
    use crate::error::TransportError;
    use crate::types::{EngineConfig, SearchResponse, UserResponse};
    use reqwest::blocking::{Client, RequestBuilder};
    use serde::de::DeserializeOwned;

    /// Blocking HTTP client for the search and session endpoints
    pub struct HttpBackend {
        client: Client,
        config: EngineConfig,
    }

    impl HttpBackend {
        pub fn new(config: EngineConfig) -> Self {
            HttpBackend {
                client: Client::new(),
                config,
            }
        }

        fn url(&self, path: &str) -> String {
            format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
        }

        fn send(&self, url: &str, request: RequestBuilder) -> Result<String, TransportError> {
            let response = request.send().map_err(|e| TransportError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            response.text().map_err(|e| TransportError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })
        }

        fn send_json<T: DeserializeOwned>(
            &self,
            url: &str,
            request: RequestBuilder,
        ) -> Result<T, TransportError> {
            let body = self.send(url, request)?;
            Ok(serde_json::from_str(&body)?)
        }
    }

    impl SearchBackend for HttpBackend {
        fn search(&self, request: &SearchRequest) -> Result<SearchResponse, TransportError> {
            let url = self.url(&self.config.search_path);
            tracing::debug!(url = %url, from = request.from, "sending search request");
            self.send_json(&url, self.client.post(&url).json(request))
        }
    }

    impl AuthBackend for HttpBackend {
        fn current_user(&self) -> Result<UserResponse, TransportError> {
            let url = self.url(&self.config.user_path);
            self.send_json(&url, self.client.get(&url))
        }

        fn renew_session(&self) -> Result<(), TransportError> {
            let url = self.url(&self.config.session_path);
            self.send(&url, self.client.get(&url)).map(|_| ())
        }

        fn logout(&self) -> Result<(), TransportError> {
            let url = self.url(&self.config.session_path);
            self.send(&url, self.client.delete(&url)).map(|_| ())
        }
    }
}
