//! Checkout, redirect-form and bank callback handlers

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use http::header::SET_COOKIE;
use http::HeaderMap;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::api::{visitor, AppState};
use crate::error::GatewayError;
use crate::payments::callback::CallbackFields;
use crate::payments::form::empty_container;
use crate::payments::providers::halk::GENERIC_ERROR_MESSAGE;
use crate::payments::types::Notice;

/// Query parameter carried on `okUrl`/`failUrl`
pub const NOTICE_PARAM: &str = "payment_notice";

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub order: Option<String>,
}

/// `POST /checkout/:order_id`
pub async fn start_checkout(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let (visitor_id, set_cookie) = visitor::resolve(&headers);
    let body = state.gateway.process_payment(&visitor_id, &order_id).await?;

    let mut response = Json(body).into_response();
    if let Some(cookie) = set_cookie {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    Ok(response)
}

/// `GET /payment/form`
///
/// Renders the auto-submitting form once; later loads get an empty container.
pub async fn payment_form(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, GatewayError> {
    let Some(visitor_id) = visitor::from_headers(&headers) else {
        return Ok(Html(empty_container()));
    };

    match state.gateway.redirect_form(&visitor_id).await? {
        Some(form) => Ok(Html(form.to_html())),
        None => Ok(Html(empty_container())),
    }
}

/// `POST /payment/callback?order=ID`
///
/// Always answers with a redirect, the shopper is mid-navigation from the bank.
/// Unreadable requests go back to checkout instead of getting an error page.
pub async fn payment_callback(
    State(state): State<AppState>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            warn!("Rejected callback query string: {}", rejection);
            return checkout_redirect(&state);
        }
    };

    let fields = match body
        .map_err(|e| e.to_string())
        .and_then(|body| {
            serde_urlencoded::from_bytes::<Vec<(String, String)>>(&body).map_err(|e| e.to_string())
        }) {
        Ok(fields) => fields,
        Err(message) => {
            warn!("Rejected callback body: {}", message);
            return checkout_redirect(&state);
        }
    };

    let visitor_id = visitor::from_headers(&headers);
    let result = state
        .gateway
        .handle_callback(
            visitor_id.as_deref(),
            query.order.as_deref(),
            CallbackFields::new(fields),
        )
        .await;

    match result {
        Ok(resolution) => {
            info!(
                "Callback for {:?} handled as {}, redirecting to {}",
                resolution.outcome.order_id(),
                resolution.outcome.state_name(),
                resolution.redirect_to
            );
            let target = match &resolution.notice {
                Some(notice) => with_notice(&resolution.redirect_to, notice),
                None => resolution.redirect_to.clone(),
            };
            Redirect::to(&target).into_response()
        }
        Err(e) => {
            error!("Failed to process bank callback: {}", e);
            checkout_redirect(&state)
        }
    }
}

fn checkout_redirect(state: &AppState) -> Response {
    let notice = Notice::error(GENERIC_ERROR_MESSAGE);
    Redirect::to(&with_notice(&state.checkout_url, &notice)).into_response()
}

/// Append the notice message to a redirect target
pub fn with_notice(url: &str, notice: &Notice) -> String {
    let encoded = serde_urlencoded::to_string([(NOTICE_PARAM, notice.message.as_str())])
        .unwrap_or_default();
    if encoded.is_empty() {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, separator, encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_notice_encodes_message() {
        let notice = Notice::error("Order-ID mismatch. Try again");
        assert_eq!(
            with_notice("https://shop.example/checkout", &notice),
            "https://shop.example/checkout?payment_notice=Order-ID+mismatch.+Try+again"
        );
    }

    #[test]
    fn test_with_notice_keeps_existing_query() {
        let notice = Notice::error("x");
        assert_eq!(
            with_notice("https://shop.example/checkout?step=2", &notice),
            "https://shop.example/checkout?step=2&payment_notice=x"
        );
    }
}
