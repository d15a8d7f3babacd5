//! Blocking JSON transport to the CRM inbound webhook.
//!
//! Every call is `POST <base_url>/<method>` with a JSON body. The CRM wraps
//! answers in an envelope: `{"result": ..., "time": {...}}` on success,
//! `{"error": ..., "error_description": ...}` on failure. Failures usually
//! arrive with a 4xx status, so a non-2xx response with a JSON body is still
//! handed back as an envelope; only unreadable responses are transport
//! failures.

use std::time::Duration;

use serde_json::Value;

use dealsync_core::CrmSettings;

use crate::error::GatewayError;

/// One request/response exchange with the CRM.
pub trait Transport: Send + Sync {
    fn call(&self, method: &'static str, params: &Value) -> Result<Value, GatewayError>;
}

/// [`Transport`] over a `ureq` agent.
pub struct UreqTransport {
    agent: ureq::Agent,
    base_url: String,
}

impl UreqTransport {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    pub fn from_settings(settings: &CrmSettings) -> Self {
        Self::new(
            settings.base_url(),
            settings.timeout_secs.map(Duration::from_secs),
        )
    }
}

impl std::fmt::Debug for UreqTransport {
    // The base URL embeds the webhook secret.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl Transport for UreqTransport {
    fn call(&self, method: &'static str, params: &Value) -> Result<Value, GatewayError> {
        let url = format!("{}/{method}", self.base_url);
        tracing::debug!("calling {method}");

        match self.agent.post(&url).send_json(params) {
            Ok(response) => {
                let status = response.status();
                response
                    .into_json::<Value>()
                    .map_err(|err| GatewayError::Transport {
                        method,
                        detail: format!("HTTP {status} with an unreadable body: {err}"),
                    })
            }
            Err(ureq::Error::Status(code, response)) => {
                response
                    .into_json::<Value>()
                    .map_err(|_| GatewayError::Transport {
                        method,
                        detail: format!("HTTP {code} with a non-JSON body"),
                    })
            }
            Err(ureq::Error::Transport(err)) => Err(GatewayError::Transport {
                method,
                detail: err.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope helpers
// ---------------------------------------------------------------------------

/// Python-style truthiness of an envelope `result`.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// The `result` array of a list call. A missing or non-array `result` is a
/// rejection carrying the whole envelope.
pub(crate) fn list_result(method: &'static str, envelope: Value) -> Result<Vec<Value>, GatewayError> {
    match envelope.get("result") {
        Some(Value::Array(items)) => Ok(items.clone()),
        _ => Err(GatewayError::Rejected {
            method,
            payload: envelope,
        }),
    }
}

/// The `result` of a write call, which must be truthy.
pub(crate) fn write_result(method: &'static str, envelope: Value) -> Result<Value, GatewayError> {
    match envelope.get("result") {
        Some(result) if is_truthy(result) => Ok(result.clone()),
        _ => Err(GatewayError::Rejected {
            method,
            payload: envelope,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case(json!(null), false)]
    #[case(json!(false), false)]
    #[case(json!(0), false)]
    #[case(json!(""), false)]
    #[case(json!([]), false)]
    #[case(json!(true), true)]
    #[case(json!(17), true)]
    #[case(json!("17"), true)]
    fn truthiness_matches_upstream_semantics(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(is_truthy(&value), expected, "value: {value}");
    }

    #[test]
    fn empty_list_result_is_not_a_rejection() {
        let items = list_result("crm.deal.list", json!({ "result": [], "total": 0 })).expect("ok");
        assert!(items.is_empty());
    }

    #[test]
    fn error_envelope_is_carried_verbatim() {
        let envelope = json!({ "error": "INVALID_CREDENTIALS", "error_description": "bad key" });
        let err = write_result("crm.deal.add", envelope.clone()).unwrap_err();
        match err {
            GatewayError::Rejected { method, payload } => {
                assert_eq!(method, "crm.deal.add");
                assert_eq!(payload, envelope);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn false_write_result_is_rejected() {
        let err = write_result("crm.deal.update", json!({ "result": false })).unwrap_err();
        assert!(!err.is_transport());
        assert!(err.to_string().contains("crm.deal.update"));
    }

    /// Answer exactly one request on a local socket with a fixed response.
    fn respond_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = stream.read(&mut chunk).expect("read");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                    continue;
                };
                let headers = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
                let body_len = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= end + 4 + body_len {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("write");
        });
        format!("http://{addr}")
    }

    #[rstest]
    #[case("200 OK")]
    #[case("503 Service Unavailable")]
    fn non_json_body_is_a_transport_failure(#[case] status_line: &'static str) {
        let base_url = respond_once(status_line, "<html>maintenance</html>");
        let transport = UreqTransport::new(base_url, Some(Duration::from_secs(5)));

        let err = transport
            .call("crm.contact.list", &json!({}))
            .unwrap_err();

        assert!(err.is_transport(), "got: {err}");
        assert_eq!(err.method(), "crm.contact.list");
    }

    #[test]
    fn json_error_status_is_returned_as_envelope() {
        let base_url = respond_once(
            "401 Unauthorized",
            r#"{"error":"INVALID_CREDENTIALS","error_description":"bad key"}"#,
        );
        let transport = UreqTransport::new(base_url, Some(Duration::from_secs(5)));

        let envelope = transport.call("crm.deal.list", &json!({})).expect("envelope");

        assert_eq!(envelope["error"], "INVALID_CREDENTIALS");
    }

    #[test]
    fn transport_debug_hides_base_url() {
        let transport = UreqTransport::new("https://shop.bitrix24.ru/rest/1/s3cr3t/", None);
        assert_eq!(transport.base_url, "https://shop.bitrix24.ru/rest/1/s3cr3t");
        assert!(!format!("{transport:?}").contains("s3cr3t"));
    }
}
