//! Auto-submitting redirect form for the bank's hosted 3-D Secure page

use crate::error::{GatewayError, GatewayResult};
use crate::payments::hash::HashScheme;
use crate::payments::providers::halk::{HalkConfig, GATEWAY_ID};
use crate::payments::types::Order;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;

pub const NONCE_LENGTH: usize = 20;

/// Format a minor-unit total as the bank expects: two decimals, `.` separator
pub fn format_amount(total_minor: i64) -> GatewayResult<String> {
    if total_minor < 0 {
        return Err(GatewayError::InvalidAmount {
            amount: total_minor,
        });
    }
    Ok(format!("{}.{:02}", total_minor / 100, total_minor % 100))
}

/// Random `rnd` value for a single redirect
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

/// URL the bank posts back to, for both `okUrl` and `failUrl`
pub fn callback_url(site_url: &str, order_id: &str) -> GatewayResult<String> {
    let query = serde_urlencoded::to_string([("order", order_id)])?;
    Ok(format!(
        "{}/payment/callback?{}",
        site_url.trim_end_matches('/'),
        query
    ))
}

/// Signed set of hidden fields posted to the bank
#[derive(Debug, Clone, Serialize)]
pub struct RedirectForm {
    pub action: String,
    pub fields: Vec<(String, String)>,
}

impl RedirectForm {
    /// Build the signed form for `order`
    pub fn build(order: &Order, config: &HalkConfig, nonce: impl Into<String>) -> GatewayResult<Self> {
        let amount = format_amount(order.total_minor)?;
        let return_url = callback_url(&config.site_url, &order.id)?;
        let scheme = config.hash_scheme;

        let mut fields: Vec<(String, String)> = Vec::with_capacity(14);
        let mut push = |name: &str, value: String| fields.push((name.to_string(), value));

        if let Some(algorithm) = scheme.algorithm_name() {
            push("hashAlgorithm", algorithm.to_string());
        }
        push("clientid", config.client_id.clone());
        push("amount", amount);
        push("islemtipi", config.transaction_type.as_str().to_string());
        if scheme == HashScheme::Sha1 {
            push("taksit", String::new());
        }
        push("oid", order.id.clone());
        push("okUrl", return_url.clone());
        push("failUrl", return_url);
        push("rnd", nonce.into());
        if let Some(lang) = &config.lang {
            push("lang", lang.clone());
        }
        push("storetype", config.store_type.clone());
        push("currency", config.currency_code.clone());
        if scheme == HashScheme::Ver3 {
            push("refreshtime", config.refresh_time.to_string());
        }

        let hash = scheme.request_hash(&fields, &config.store_key);
        fields.push(("hash".to_string(), hash));

        Ok(Self {
            action: config.payment_endpoint().to_string(),
            fields,
        })
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Render the form inside its container, submitted on load
    pub fn to_html(&self) -> String {
        let form_id = format!("{}-3d-secure-form", GATEWAY_ID);
        let mut html = String::new();

        html.push_str(&format!(
            "<div class=\"{}-3d-secure-form-container\">\n",
            GATEWAY_ID
        ));
        html.push_str(&format!(
            "<form name=\"form\" id=\"{}\" action=\"{}\" method=\"POST\">\n",
            form_id,
            html_escape::encode_double_quoted_attribute(&self.action)
        ));
        html.push_str("<div>\n");
        for (name, value) in &self.fields {
            html.push_str(&format!(
                "<input type=\"hidden\" name=\"{}\" value=\"{}\" />\n",
                html_escape::encode_double_quoted_attribute(name),
                html_escape::encode_double_quoted_attribute(value)
            ));
        }
        html.push_str("</div>\n");
        html.push_str(&format!(
            "<script>document.getElementById('{}').submit();</script>\n",
            form_id
        ));
        html.push_str("</form>\n</div>\n");
        html
    }
}

/// Container rendered when the visitor has nothing to pay
pub fn empty_container() -> String {
    format!("<div class=\"{}-3d-secure-form-container\"></div>\n", GATEWAY_ID)
}
