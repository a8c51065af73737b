//! Request descriptor and captured request context

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{
    CORRELATION_ID_HEADER, MAX_CAPTURED_HEADERS, MAX_CAPTURED_HEADER_LEN, USER_AGENT_HEADER,
};

/// Inbound request as handed over by the transport layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub client_ip: Option<String>,
    pub headers: Vec<(String, String)>,
    pub user_id: Option<String>,
}

impl RequestDescriptor {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self { method: method.into(), path: path.into(), ..Self::default() }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_client_ip(mut self, client_ip: impl Into<String>) -> Self {
        self.client_ip = Some(client_ip.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Immutable snapshot of the request, taken once before dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub correlation_id: String,
    pub http_method: String,
    pub path: String,
    pub query_string: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub user_id: Option<String>,
    pub request_time: DateTime<Utc>,
    /// Allow-listed headers, keyed by lowercase name
    #[serde(skip)]
    pub headers: BTreeMap<String, String>,
}

impl RequestContext {
    /// Capture the context at the current time
    pub fn capture(descriptor: &RequestDescriptor, allowed_headers: &[String]) -> Self {
        Self::capture_at(descriptor, allowed_headers, Utc::now())
    }

    /// Capture the context with an explicit request time
    ///
    /// The correlation id comes from a non-blank `X-Correlation-ID` header,
    /// otherwise a fresh UUID is generated.
    pub fn capture_at(
        descriptor: &RequestDescriptor,
        allowed_headers: &[String],
        request_time: DateTime<Utc>,
    ) -> Self {
        let correlation_id = descriptor
            .header(CORRELATION_ID_HEADER)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map_or_else(|| Uuid::new_v4().to_string(), ToString::to_string);

        let headers = allowed_headers
            .iter()
            .take(MAX_CAPTURED_HEADERS)
            .filter_map(|name| {
                descriptor.header(name).map(|value| {
                    let value: String = value.chars().take(MAX_CAPTURED_HEADER_LEN).collect();
                    (name.to_ascii_lowercase(), value)
                })
            })
            .collect();

        Self {
            correlation_id,
            http_method: descriptor.method.clone(),
            path: descriptor.path.clone(),
            query_string: descriptor.query.clone().unwrap_or_default(),
            client_ip: descriptor.client_ip.clone(),
            user_agent: descriptor.header(USER_AGENT_HEADER).map(ToString::to_string),
            user_id: descriptor.user_id.clone(),
            request_time,
            headers,
        }
    }

    /// Captured allow-listed header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_correlation_id_from_header() {
        let descriptor =
            RequestDescriptor::new("GET", "/orders").with_header("x-correlation-id", " abc-123 ");
        let context = RequestContext::capture(&descriptor, &[]);
        assert_eq!(context.correlation_id, "abc-123");
    }

    #[test]
    fn test_blank_correlation_header_generates_uuid() {
        let descriptor =
            RequestDescriptor::new("GET", "/orders").with_header(CORRELATION_ID_HEADER, "   ");
        let context = RequestContext::capture(&descriptor, &[]);
        assert!(Uuid::parse_str(&context.correlation_id).is_ok());

        let other = RequestContext::capture(&descriptor, &[]);
        assert_ne!(context.correlation_id, other.correlation_id);
    }

    #[test]
    fn test_capture_copies_descriptor_fields() {
        let descriptor = RequestDescriptor::new("POST", "/orders")
            .with_query("page=2")
            .with_client_ip("10.0.0.7")
            .with_header("User-Agent", "curl/8.0")
            .with_user("user-42");
        let context = RequestContext::capture(&descriptor, &[]);

        assert_eq!(context.http_method, "POST");
        assert_eq!(context.query_string, "page=2");
        assert_eq!(context.client_ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(context.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(context.user_id.as_deref(), Some("user-42"));
    }

    /// Only allow-listed headers are kept, and they never reach the wire.
    #[test]
    fn test_allow_listed_headers_only() {
        let descriptor = RequestDescriptor::new("GET", "/")
            .with_header("Accept-Language", "en-GB")
            .with_header("Authorization", "Bearer secret");
        let context = RequestContext::capture(&descriptor, &allowed(&["Accept-Language"]));

        assert_eq!(context.header("accept-language"), Some("en-GB"));
        assert_eq!(context.header("Authorization"), None);

        let json = serde_json::to_string(&context).expect("serialize");
        assert!(!json.contains("secret"));
        assert!(!json.contains("en-GB"));
    }

    #[test]
    fn test_wire_field_names() {
        let context = RequestContext::capture(&RequestDescriptor::new("GET", "/"), &[]);
        let value = serde_json::to_value(&context).expect("serialize");
        for field in [
            "correlationId",
            "httpMethod",
            "path",
            "queryString",
            "clientIp",
            "userAgent",
            "userId",
            "requestTime",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
    }
}
