//! Credential validation against a fixed allow-list

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, LoginError, Result};
use crate::types::{Credential, Locale, LoginRequest, LoginResponse, Messages};

/// Lookup seam for the allow-list
pub trait AllowList: Send + Sync {
    /// True when some record matches both fields exactly
    fn contains(&self, username: &str, password: &str) -> bool;
}

/// Immutable, non-empty list of credentials fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAllowList {
    records: Vec<Credential>,
}

impl StaticAllowList {
    pub fn new(records: Vec<Credential>) -> Result<Self> {
        if records.is_empty() {
            return Err(Error::InvalidConfig("allow-list must not be empty".to_string()));
        }
        Ok(Self { records })
    }

    /// The two demo accounts, `admin/admin` and `jvh/jvh`
    pub fn builtin() -> Self {
        Self {
            records: vec![Credential::new("admin", "admin"), Credential::new("jvh", "jvh")],
        }
    }

    pub fn records(&self) -> &[Credential] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for StaticAllowList {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AllowList for StaticAllowList {
    fn contains(&self, username: &str, password: &str) -> bool {
        self.records
            .iter()
            .any(|c| c.username == username && c.password == password)
    }
}

/// Result of a single login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Accepted { message: &'static str },
    Rejected { reason: LoginError, message: &'static str },
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoginOutcome::Accepted { .. })
    }

    pub fn status_code(&self) -> u16 {
        match self {
            LoginOutcome::Accepted { .. } => 200,
            LoginOutcome::Rejected { reason, .. } => reason.status_code(),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            LoginOutcome::Accepted { message } | LoginOutcome::Rejected { message, .. } => *message,
        }
    }

    pub fn reason(&self) -> Option<LoginError> {
        match self {
            LoginOutcome::Accepted { .. } => None,
            LoginOutcome::Rejected { reason, .. } => Some(*reason),
        }
    }

    /// Wire body for this outcome
    pub fn response(&self) -> LoginResponse {
        LoginResponse {
            success: self.is_success(),
            message: self.message().to_string(),
        }
    }
}

/// Stateless credential check.
///
/// Holds no per-request state; the same request always yields the same
/// outcome.
pub struct CredentialValidator<A = StaticAllowList> {
    allow_list: A,
    messages: &'static Messages,
}

impl<A: AllowList> CredentialValidator<A> {
    pub fn new(allow_list: A, locale: Locale) -> Self {
        Self {
            allow_list,
            messages: locale.messages(),
        }
    }

    pub fn messages(&self) -> &'static Messages {
        self.messages
    }

    /// Check a parsed request
    pub fn validate(&self, request: &LoginRequest) -> LoginOutcome {
        if !request.is_complete() {
            return self.reject(LoginError::Validation);
        }
        let username = request.username.as_deref().unwrap_or_default();
        let password = request.password.as_deref().unwrap_or_default();

        if self.allow_list.contains(username, password) {
            LoginOutcome::Accepted {
                message: self.messages.success,
            }
        } else {
            self.reject(LoginError::Authentication)
        }
    }

    /// Parse a raw JSON body and check it.
    ///
    /// The body must be a JSON object, anything else is an internal error.
    /// Fields follow JavaScript truthiness: absent, `null`, `""`, `0` and
    /// `false` are missing; other non-string values never match a record.
    /// A repeated key keeps its last value.
    pub fn validate_body(&self, body: &[u8]) -> LoginOutcome {
        let object = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(object)) => object,
            Ok(other) => {
                debug!(kind = json_kind(&other), "login body is not a JSON object");
                return self.reject(LoginError::Internal);
            }
            Err(e) => {
                debug!(
                    category = ?e.classify(),
                    line = e.line(),
                    column = e.column(),
                    "unparseable login body"
                );
                return self.reject(LoginError::Internal);
            }
        };

        match (
            BodyField::from_json(object.get("username")),
            BodyField::from_json(object.get("password")),
        ) {
            (BodyField::Text(username), BodyField::Text(password)) => self.validate(&LoginRequest {
                username: Some(username.to_string()),
                password: Some(password.to_string()),
            }),
            (BodyField::Missing, _) | (_, BodyField::Missing) => self.reject(LoginError::Validation),
            _ => self.reject(LoginError::Authentication),
        }
    }

    fn reject(&self, reason: LoginError) -> LoginOutcome {
        let message = match reason {
            LoginError::Validation => self.messages.required,
            LoginError::Authentication => self.messages.user_not_found,
            LoginError::Internal => self.messages.internal,
        };
        LoginOutcome::Rejected { reason, message }
    }
}

/// One login field as found in the request object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyField<'a> {
    Missing,
    Text(&'a str),
    /// Present but not a string, e.g. `1` or `true`
    Other,
}

impl<'a> BodyField<'a> {
    fn from_json(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) | Some(Value::Bool(false)) => BodyField::Missing,
            Some(Value::String(s)) if s.is_empty() => BodyField::Missing,
            Some(Value::String(s)) => BodyField::Text(s),
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => BodyField::Missing,
            Some(_) => BodyField::Other,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use test_case::test_case;

    fn validator() -> CredentialValidator {
        CredentialValidator::new(StaticAllowList::builtin(), Locale::En)
    }

    /// Allow-list that records how often it was consulted
    struct CountingAllowList {
        inner: StaticAllowList,
        lookups: AtomicUsize,
    }

    impl AllowList for CountingAllowList {
        fn contains(&self, username: &str, password: &str) -> bool {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.contains(username, password)
        }
    }

    #[test_case("admin", "admin" ; "admin account")]
    #[test_case("jvh", "jvh" ; "jvh account")]
    fn test_accepts_allow_listed_pairs(username: &str, password: &str) {
        let outcome = validator().validate(&LoginRequest::new(username, password));
        assert!(outcome.is_success());
        assert_eq!(outcome.status_code(), 200);
        assert_eq!(outcome.message(), "login successful");
    }

    #[test_case("admin", "wrongpass" ; "wrong password")]
    #[test_case("usuario_invalido", "admin" ; "unknown user with valid password")]
    #[test_case("usuario_invalido", "password_invalido" ; "unknown user")]
    #[test_case("ADMIN", "admin" ; "username is case sensitive")]
    #[test_case("admin", "ADMIN" ; "password is case sensitive")]
    #[test_case(" admin", "admin" ; "no trimming")]
    #[test_case("   ", "   " ; "whitespace only")]
    #[test_case("admin", "jvh" ; "fields from different records")]
    fn test_rejects_everything_else(username: &str, password: &str) {
        let outcome = validator().validate(&LoginRequest::new(username, password));
        assert_eq!(outcome.reason(), Some(LoginError::Authentication));
        assert_eq!(outcome.status_code(), 401);
        assert_eq!(outcome.message(), "user does not exist");
    }

    #[test_case(None, None ; "both missing")]
    #[test_case(Some("admin"), None ; "password missing")]
    #[test_case(None, Some("admin") ; "username missing")]
    #[test_case(Some(""), Some("admin") ; "username empty")]
    #[test_case(Some("admin"), Some("") ; "password empty")]
    fn test_missing_fields_skip_lookup(username: Option<&str>, password: Option<&str>) {
        let validator = CredentialValidator::new(
            CountingAllowList {
                inner: StaticAllowList::builtin(),
                lookups: AtomicUsize::new(0),
            },
            Locale::En,
        );
        let request = LoginRequest {
            username: username.map(String::from),
            password: password.map(String::from),
        };

        let outcome = validator.validate(&request);
        assert_eq!(outcome.reason(), Some(LoginError::Validation));
        assert_eq!(outcome.status_code(), 400);
        assert_eq!(outcome.message(), "username and password are required");
        assert_eq!(validator.allow_list.lookups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_repeated_requests_are_idempotent() {
        let validator = validator();
        let ok = LoginRequest::new("jvh", "jvh");
        let bad = LoginRequest::new("jvh", "nope");

        assert_eq!(validator.validate(&ok), validator.validate(&ok));
        assert_eq!(validator.validate(&bad), validator.validate(&bad));
        assert!(validator.validate(&ok).is_success());
    }

    #[test_case(b"not json" ; "garbage")]
    #[test_case(b"" ; "empty body")]
    #[test_case(b"[1,2]" ; "array")]
    #[test_case(br#"["admin","admin"]"# ; "positional array")]
    #[test_case(b"[]" ; "empty array")]
    #[test_case(br#""hunter2""# ; "bare string")]
    #[test_case(b"null" ; "null body")]
    fn test_malformed_body_is_internal(body: &[u8]) {
        let outcome = validator().validate_body(body);
        assert_eq!(outcome.reason(), Some(LoginError::Internal));
        assert_eq!(outcome.status_code(), 500);
        assert_eq!(outcome.message(), "server error");
    }

    #[test_case(br#"{"username":1,"password":"admin"}"#, 401 ; "number username")]
    #[test_case(br#"{"username":"admin","password":true}"#, 401 ; "true password")]
    #[test_case(br#"{"username":["admin"],"password":"admin"}"#, 401 ; "array username")]
    #[test_case(br#"{"username":0,"password":"admin"}"#, 400 ; "zero username")]
    #[test_case(br#"{"username":"admin","password":false}"#, 400 ; "false password")]
    #[test_case(br#"{"username":null,"password":"admin"}"#, 400 ; "null username")]
    #[test_case(br#"{"username":"admin","password":"admin","username":"x"}"#, 401 ; "last duplicate key wins")]
    #[test_case(br#"{"username":"x","username":"admin","password":"admin"}"#, 200 ; "duplicate key resolves to valid")]
    fn test_body_field_values(body: &[u8], status: u16) {
        assert_eq!(validator().validate_body(body).status_code(), status);
    }

    #[test]
    fn test_validate_body_accepts_json() {
        let outcome = validator().validate_body(br#"{"username":"admin","password":"admin"}"#);
        assert!(outcome.is_success());

        let outcome = validator().validate_body(br#"{"password":"admin"}"#);
        assert_eq!(outcome.status_code(), 400);
    }

    #[test]
    fn test_spanish_messages() {
        let validator = CredentialValidator::new(StaticAllowList::builtin(), Locale::Es);
        let outcome = validator.validate(&LoginRequest::new("admin", "password_incorrecto"));
        assert_eq!(outcome.message(), "usuario no existe");
        assert_eq!(
            outcome.response(),
            LoginResponse {
                success: false,
                message: "usuario no existe".to_string()
            }
        );
    }

    #[test]
    fn test_empty_allow_list_is_rejected() {
        assert!(matches!(
            StaticAllowList::new(vec![]),
            Err(Error::InvalidConfig(_))
        ));
        let list = StaticAllowList::new(vec![Credential::new("a", "b")]).unwrap();
        assert_eq!(list.len(), 1);
        assert!(list.contains("a", "b"));
    }
}
