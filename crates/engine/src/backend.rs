use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use storefront_core::CartItem;
use thiserror::Error;
use tracing::{info, warn};

pub const PII_SEARCH_PATH: &str = "/api/admin/pii/search";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out")]
    Timeout,

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

impl HttpResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

/// Backend used by overlay content. Calls never touch navigation state.
pub trait ApiClient {
    fn post_json(&mut self, path: &str, body: &Value) -> Result<HttpResponse, TransportError>;
}

// ---------------------------------------------------------------------------
// PII deletion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// The backend matched records for the address.
    RecordsFound,
    /// The request was logged but nothing matched.
    NoRecords,
    /// The endpoint refused an anonymous caller; the request is still
    /// considered submitted.
    AcceptedAnonymously,
}

#[derive(Debug, Error)]
pub enum DeletionError {
    #[error("please enter a valid email address")]
    InvalidEmail,

    #[error("deletion request failed (HTTP {status})")]
    Http { status: u16 },

    #[error("could not reach the server: {0}")]
    Transport(#[from] TransportError),
}

/// Client-side shape check: one `@`, a non-empty local part, a dotted domain,
/// no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

pub fn request_deletion(api: &mut dyn ApiClient, email: &str) -> Result<DeletionOutcome, DeletionError> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(DeletionError::InvalidEmail);
    }

    let response = api.post_json(PII_SEARCH_PATH, &json!({ "email": email }))?;
    match response.status {
        401 | 403 => {
            info!(status = response.status, "deletion request accepted without credentials");
            Ok(DeletionOutcome::AcceptedAnonymously)
        }
        200 if response.body.get("status").and_then(Value::as_str) == Some("found") => {
            Ok(DeletionOutcome::RecordsFound)
        }
        200 => Ok(DeletionOutcome::NoRecords),
        status => {
            warn!(status, "deletion request rejected");
            Err(DeletionError::Http { status })
        }
    }
}

// ---------------------------------------------------------------------------
// Checkout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub currency: String,
    pub lines: Vec<CheckoutLine>,
}

impl CheckoutRequest {
    pub fn from_items(items: &[CartItem], currency: &str) -> Self {
        Self {
            currency: currency.to_string(),
            lines: items
                .iter()
                .map(|item| CheckoutLine {
                    name: item.name.clone(),
                    unit_amount: item.price.cents(),
                    quantity: item.quantity,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Payment provider boundary (hosted checkout).
pub trait CheckoutGateway {
    fn create_session(&mut self, request: &CheckoutRequest) -> Result<CheckoutSession, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted {
        response: Option<HttpResponse>,
        requests: Vec<(String, Value)>,
    }

    impl ApiClient for Scripted {
        fn post_json(&mut self, path: &str, body: &Value) -> Result<HttpResponse, TransportError> {
            self.requests.push((path.to_string(), body.clone()));
            self.response
                .clone()
                .ok_or_else(|| TransportError::Unreachable("offline".into()))
        }
    }

    fn api(status: Option<u16>, body: Value) -> Scripted {
        Scripted {
            response: status.map(|s| HttpResponse::new(s, body)),
            requests: Vec::new(),
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("someone@example.com"));
        assert!(is_valid_email("a.b+tag@mail.example.ca"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("someone@localhost"));
        assert!(!is_valid_email("someone@example..com"));
        assert!(!is_valid_email("some one@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
    }

    #[test]
    fn invalid_email_makes_no_request() {
        let mut api = api(Some(200), json!({}));
        let result = request_deletion(&mut api, "not-an-email");
        assert!(matches!(result, Err(DeletionError::InvalidEmail)));
        assert!(api.requests.is_empty());
    }

    #[test]
    fn posts_trimmed_email() {
        let mut api = api(Some(200), json!({ "status": "found" }));
        let outcome = request_deletion(&mut api, "  someone@example.com ").unwrap();
        assert_eq!(outcome, DeletionOutcome::RecordsFound);
        assert_eq!(
            api.requests,
            vec![(PII_SEARCH_PATH.to_string(), json!({ "email": "someone@example.com" }))]
        );
    }

    #[test]
    fn status_mapping() {
        for (status, body, expected) in [
            (401, json!(null), DeletionOutcome::AcceptedAnonymously),
            (403, json!(null), DeletionOutcome::AcceptedAnonymously),
            (200, json!({ "status": "not_found" }), DeletionOutcome::NoRecords),
            (200, json!({}), DeletionOutcome::NoRecords),
        ] {
            let mut api = api(Some(status), body);
            assert_eq!(request_deletion(&mut api, "a@b.co").unwrap(), expected, "status {status}");
        }

        let mut api = api(Some(500), json!({}));
        assert!(matches!(
            request_deletion(&mut api, "a@b.co"),
            Err(DeletionError::Http { status: 500 })
        ));
    }

    #[test]
    fn transport_failure_surfaces() {
        let mut api = api(None, json!(null));
        assert!(matches!(
            request_deletion(&mut api, "a@b.co"),
            Err(DeletionError::Transport(TransportError::Unreachable(_)))
        ));
    }
}
