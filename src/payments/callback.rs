//! Bank callback verification
//!
//! A redirect leaves the order awaiting its callback. Each callback resolves
//! to exactly one terminal [`CallbackOutcome`]. Checks run in a fixed order:
//! order ID first, then the hash, then `mdStatus`, then `Response`. Only a
//! callback that passes all four is ever reported as a success.

use crate::payments::hash::HashScheme;
use serde::Serialize;

/// `mdStatus` values meaning 3-D authentication took place
pub const ACCEPTED_MD_STATUS: [&str; 4] = ["1", "2", "3", "4"];
pub const APPROVED_RESPONSE: &str = "Approved";
pub const ERROR_RESPONSE: &str = "Error";
/// ISO 8583 "invalid transaction" and "not permitted to cardholder"
pub const TRANSACTION_NOT_PERMITTED_CODES: [&str; 2] = ["12", "57"];

/// Fields posted by the bank, in the order received
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackFields(Vec<(String, String)>);

impl CallbackFields {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self(fields)
    }

    /// Exact, case-sensitive lookup
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn as_slice(&self) -> &[(String, String)] {
        &self.0
    }
}

impl From<Vec<(String, String)>> for CallbackFields {
    fn from(fields: Vec<(String, String)>) -> Self {
        Self(fields)
    }
}

/// Why a correctly signed callback did not pay the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    ThreeDSecureFailed {
        md_status: Option<String>,
    },
    ProcessorError {
        message: Option<String>,
    },
    TransactionNotPermitted {
        code: String,
        message: Option<String>,
    },
    Declined {
        response: Option<String>,
        code: Option<String>,
        message: Option<String>,
    },
}

impl FailureReason {
    fn classify(fields: &CallbackFields) -> Self {
        let response = fields.get("Response");
        let code = fields.get("ProcReturnCode");
        let message = fields.get("ErrMsg").map(str::to_string);

        if response == Some(ERROR_RESPONSE) {
            return FailureReason::ProcessorError { message };
        }

        match code {
            Some(code) if TRANSACTION_NOT_PERMITTED_CODES.contains(&code) => {
                FailureReason::TransactionNotPermitted {
                    code: code.to_string(),
                    message,
                }
            }
            _ => FailureReason::Declined {
                response: response.map(str::to_string),
                code: code.map(str::to_string),
                message,
            },
        }
    }

    /// Order note recorded for the merchant
    pub fn note(&self) -> String {
        match self {
            FailureReason::ThreeDSecureFailed { md_status } => format!(
                "3D authentication unsuccessful (mdStatus: {}).",
                md_status.as_deref().unwrap_or("missing")
            ),
            FailureReason::ProcessorError { message } => format!(
                "Payment processor error: {}",
                message.as_deref().unwrap_or("no details provided")
            ),
            FailureReason::TransactionNotPermitted { code, message } => format!(
                "Transaction type not permitted for this card (code {}): {}",
                code,
                message.as_deref().unwrap_or("no details provided")
            ),
            FailureReason::Declined {
                response,
                code,
                message,
            } => format!(
                "Your payment is not approved. Response: {}, code: {}, message: {}",
                response.as_deref().unwrap_or("missing"),
                code.as_deref().unwrap_or("missing"),
                message.as_deref().unwrap_or("none")
            ),
        }
    }
}

/// Terminal state of a callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CallbackOutcome {
    VerifiedSuccess {
        order_id: String,
    },
    VerifiedFailure {
        order_id: String,
        reason: FailureReason,
    },
    HashMismatch {
        order_id: String,
    },
    OrderIdMismatch {
        expected: Option<String>,
        received: Option<String>,
    },
}

impl CallbackOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CallbackOutcome::VerifiedSuccess { .. })
    }

    /// Order the callback can be attributed to, once the ID check passed
    pub fn order_id(&self) -> Option<&str> {
        match self {
            CallbackOutcome::VerifiedSuccess { order_id }
            | CallbackOutcome::VerifiedFailure { order_id, .. }
            | CallbackOutcome::HashMismatch { order_id } => Some(order_id),
            CallbackOutcome::OrderIdMismatch { .. } => None,
        }
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            CallbackOutcome::VerifiedSuccess { .. } => "verified_success",
            CallbackOutcome::VerifiedFailure { .. } => "verified_failure",
            CallbackOutcome::HashMismatch { .. } => "hash_mismatch",
            CallbackOutcome::OrderIdMismatch { .. } => "order_id_mismatch",
        }
    }
}

pub struct CallbackVerifier<'a> {
    scheme: HashScheme,
    store_key: &'a str,
}

impl<'a> CallbackVerifier<'a> {
    pub fn new(scheme: HashScheme, store_key: &'a str) -> Self {
        Self { scheme, store_key }
    }

    pub fn verify(&self, expected_order_id: Option<&str>, fields: &CallbackFields) -> CallbackOutcome {
        let expected = expected_order_id.map(str::trim).filter(|id| !id.is_empty());
        let received = fields.get("oid").map(str::trim);

        let order_id = match (expected, received) {
            (Some(expected), Some(received)) if expected == received => expected.to_string(),
            _ => {
                return CallbackOutcome::OrderIdMismatch {
                    expected: expected.map(str::to_string),
                    received: received.map(str::to_string),
                }
            }
        };

        if !self.scheme.verify_callback(fields.as_slice(), self.store_key) {
            return CallbackOutcome::HashMismatch { order_id };
        }

        let md_status = fields.get("mdStatus");
        if !md_status.is_some_and(|status| ACCEPTED_MD_STATUS.contains(&status)) {
            return CallbackOutcome::VerifiedFailure {
                order_id,
                reason: FailureReason::ThreeDSecureFailed {
                    md_status: md_status.map(str::to_string),
                },
            };
        }

        if fields.get("Response") == Some(APPROVED_RESPONSE) {
            CallbackOutcome::VerifiedSuccess { order_id }
        } else {
            CallbackOutcome::VerifiedFailure {
                order_id,
                reason: FailureReason::classify(fields),
            }
        }
    }
}
