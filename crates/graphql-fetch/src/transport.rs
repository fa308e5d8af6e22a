//! GraphQL HTTP transport.

use std::collections::BTreeMap;
use std::time::Duration;

use hyper::ext::ReasonPhrase;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::{Endpoint, TransportConfig};
use crate::document::{OperationDocument, TypedDocument};
use crate::error::{ConfigError, ErrorKind, GraphqlError, GraphqlResult, UNKNOWN_ERROR};
use crate::key::normalize_variables;

/// GraphQL request payload as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    /// Declared operation name, empty for anonymous operations.
    pub operation_name: String,
    /// Printed query text.
    pub query: String,
    /// Variables object.
    pub variables: Value,
}

/// Transport builder.
#[derive(Debug, Clone)]
pub struct TransportBuilder {
    endpoint: Endpoint,
    config: TransportConfig,
}

impl TransportBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new(endpoint: impl Into<Endpoint>) -> Self {
        Self {
            endpoint: endpoint.into(),
            config: TransportConfig::default(),
        }
    }

    /// Create a builder from loaded configuration.
    #[must_use]
    pub fn from_config(config: TransportConfig) -> Self {
        Self {
            endpoint: Endpoint::new(config.endpoint.clone()),
            config,
        }
    }

    /// Use a shared endpoint handle.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    /// Add a bearer token header.
    #[must_use]
    pub fn with_bearer_token(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.with_header(AUTHORIZATION.as_str(), value)
    }

    /// Set timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<Transport, ConfigError> {
        let headers = header_map(&self.config.headers)?;
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent)
            .build()?;
        Ok(Transport {
            endpoint: self.endpoint,
            http,
        })
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ConfigError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::HeaderName(name.clone()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| ConfigError::HeaderValue(name.clone()))?;
        map.insert(header_name, header_value);
    }
    map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(map)
}

/// Executes one GraphQL exchange per call and classifies its outcome.
///
/// Holds no per-call state; clones share the HTTP connection pool and the
/// endpoint handle.
#[derive(Debug, Clone)]
pub struct Transport {
    endpoint: Endpoint,
    http: reqwest::Client,
}

impl Transport {
    /// Create a transport with default configuration.
    #[must_use]
    pub fn new(endpoint: impl Into<Endpoint>) -> Self {
        let endpoint = endpoint.into();
        TransportBuilder::new(endpoint.clone())
            .build()
            .unwrap_or_else(|_| Self {
                endpoint,
                http: reqwest::Client::new(),
            })
    }

    /// Create a transport from loaded configuration.
    pub fn with_config(config: TransportConfig) -> Result<Self, ConfigError> {
        TransportBuilder::from_config(config).build()
    }

    /// Start building a transport.
    #[must_use]
    pub fn builder(endpoint: impl Into<Endpoint>) -> TransportBuilder {
        TransportBuilder::new(endpoint)
    }

    /// The endpoint handle read before every request.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Replace the endpoint for this transport and every clone of it.
    pub fn set_endpoint(&self, url: impl Into<String>) {
        self.endpoint.set(url);
    }

    /// Execute a typed operation and return its `data` payload.
    pub async fn execute<TData, TVariables>(
        &self,
        document: &TypedDocument<TData, TVariables>,
        variables: Option<&TVariables>,
    ) -> GraphqlResult<TData>
    where
        TData: DeserializeOwned,
        TVariables: Serialize,
    {
        self.execute_document(document.document(), variables).await
    }

    /// Execute an untyped document.
    ///
    /// Failures are checked in order: unreadable body, non-2xx status, then a
    /// non-empty `errors` list. Only the first GraphQL error is reported.
    #[instrument(
        name = "graphql.execute",
        skip_all,
        fields(
            operation_name = document.operation_name().unwrap_or_default(),
            endpoint = %self.endpoint.current(),
        )
    )]
    pub async fn execute_document<TData, V>(
        &self,
        document: &OperationDocument,
        variables: Option<&V>,
    ) -> GraphqlResult<TData>
    where
        TData: DeserializeOwned,
        V: Serialize + ?Sized,
    {
        let operation_name = document.operation_name().unwrap_or_default();
        let query = document.query();
        let fail = |err: GraphqlError| err.with_operation(operation_name, query);

        let request = GraphqlRequest {
            operation_name: operation_name.to_string(),
            query: query.to_string(),
            variables: normalize_variables(variables).map_err(fail)?,
        };

        let endpoint = self.endpoint.current();
        debug!("sending GraphQL request");
        let response = self
            .http
            .post(&endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| fail(GraphqlError::new(ErrorKind::Network, err.to_string())))?;

        let status = response.status();
        let reason = reason_phrase(&response);
        debug!(status = status.as_u16(), ?reason, "received GraphQL response");

        // A body that cannot be read or decoded is reported with the status
        // text, never the decoder's message.
        let payload = response
            .bytes()
            .await
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok());
        let Some(payload) = payload else {
            return Err(fail(GraphqlError::from_status(
                ErrorKind::InvalidBody,
                status,
                reason.as_deref(),
            )));
        };

        if !status.is_success() {
            return Err(fail(GraphqlError::from_status(
                ErrorKind::HttpStatus,
                status,
                reason.as_deref(),
            )));
        }

        if let Some(message) = first_error_message(&payload) {
            return Err(fail(
                GraphqlError::new(ErrorKind::Graphql, message).with_status(status),
            ));
        }

        serde_json::from_value(take_data(payload)).map_err(|err| {
            fail(GraphqlError::new(ErrorKind::Decode, err.to_string()).with_status(status))
        })
    }
}

/// Reason phrase from the status line, when the server sent one other than
/// the registered phrase for its status code.
fn reason_phrase(response: &reqwest::Response) -> Option<String> {
    let reason = response.extensions().get::<ReasonPhrase>()?;
    std::str::from_utf8(reason.as_bytes()).ok().map(str::to_string)
}

/// Message of the first entry of a non-empty `errors` array.
fn first_error_message(payload: &Value) -> Option<String> {
    let first = payload.get("errors")?.as_array()?.first()?;
    let message = first
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_ERROR);
    Some(message.to_string())
}

fn take_data(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) => map.remove("data").unwrap_or(Value::Null),
        _ => Value::Null,
    }
}
