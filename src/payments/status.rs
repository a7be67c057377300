//! Order status query against the bank's XML API
//!
//! Used as a secondary confirmation after a successful callback. The raw
//! response body is what ends up on the order; parsing is only for logs.

use crate::error::{GatewayError, GatewayResult};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"ISO-8859-9\"?>";

#[derive(Debug, Serialize)]
#[serde(rename = "CC5Request")]
struct Cc5Request<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Password")]
    password: &'a str,
    #[serde(rename = "ClientId")]
    client_id: &'a str,
    #[serde(rename = "OrderId")]
    order_id: &'a str,
    #[serde(rename = "Mode")]
    mode: &'a str,
    #[serde(rename = "Extra")]
    extra: Cc5Extra<'a>,
}

#[derive(Debug, Serialize)]
struct Cc5Extra<'a> {
    #[serde(rename = "ORDERSTATUS")]
    order_status: &'a str,
}

/// Build the `CC5Request` document for an order status query
pub fn build_request_xml(
    name: &str,
    password: &str,
    client_id: &str,
    order_id: &str,
) -> GatewayResult<String> {
    let request = Cc5Request {
        name,
        password,
        client_id,
        order_id,
        mode: "P",
        extra: Cc5Extra {
            order_status: "QUERY",
        },
    };
    let body = quick_xml::se::to_string(&request)?;
    Ok(format!("{}{}", XML_DECLARATION, body))
}

/// The few `CC5Response` fields worth logging
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
pub struct StatusReply {
    #[serde(rename = "OrderId", default)]
    pub order_id: Option<String>,
    #[serde(rename = "Response", default)]
    pub response: Option<String>,
    #[serde(rename = "ProcReturnCode", default)]
    pub proc_return_code: Option<String>,
    #[serde(rename = "ErrMsg", default)]
    pub err_msg: Option<String>,
}

impl StatusReply {
    /// Best-effort parse; `None` when the body is not a `CC5Response`
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let document = if trimmed.starts_with("<?xml") {
            match trimmed.find("?>") {
                Some(pos) => trimmed[pos + 2..].trim(),
                None => return None,
            }
        } else {
            trimmed
        };

        quick_xml::de::from_str(document).ok()
    }
}

/// Client for the bank's status API
#[derive(Debug, Clone)]
pub struct StatusClient {
    http_client: Client,
    api_url: String,
    name: String,
    password: String,
    client_id: String,
    timeout: Duration,
}

impl StatusClient {
    pub fn new(
        api_url: impl Into<String>,
        name: impl Into<String>,
        password: impl Into<String>,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent("halk-gateway/0.1")
            .build()
            .map_err(|e| {
                GatewayError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            api_url: api_url.into(),
            name: name.into(),
            password: password.into(),
            client_id: client_id.into(),
            timeout,
        })
    }

    /// Query the bank for the status of `order_id` and return the raw body
    pub async fn query(&self, order_id: &str) -> GatewayResult<String> {
        let xml = build_request_xml(&self.name, &self.password, &self.client_id, order_id)?;
        let body = serde_urlencoded::to_string([("DATA", xml.as_str())])?;

        debug!("Sending status query for order {} to {}", order_id, self.api_url);

        let response = self
            .http_client
            .post(&self.api_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!("Status query transport error for order {}: {}", order_id, e);
                if e.is_timeout() {
                    GatewayError::Timeout {
                        seconds: self.timeout.as_secs(),
                    }
                } else {
                    GatewayError::from(e)
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            error!("Failed to read status query response for order {}: {}", order_id, e);
            GatewayError::from(e)
        })?;

        if !status.is_success() {
            warn!("Status query for order {} returned HTTP {}", order_id, status);
        }

        match StatusReply::parse(&text) {
            Some(reply) => info!(
                "Status query for order {}: response={:?}, proc_return_code={:?}, err_msg={:?}",
                order_id, reply.response, reply.proc_return_code, reply.err_msg
            ),
            None => debug!("Status query for order {} returned a non-XML body", order_id),
        }

        Ok(text)
    }
}
