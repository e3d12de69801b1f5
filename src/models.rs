use std::time::Instant;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A stored passcode. Never mutated once written; a new send replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpRecord {
    pub code: u32,
    pub expires_at: Instant,
}

impl OtpRecord {
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SendOtpRequest {
    #[schema(example = "user@example.com")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct VerifyOtpRequest {
    #[schema(example = "user@example.com")]
    pub email: Option<String>,
    /// Accepted as a JSON number or a numeric string.
    #[schema(value_type = Option<String>, example = "123456")]
    pub otp: Option<SubmittedCode>,
}

/// Whatever the client put in `otp`. Any JSON value is accepted so that a
/// non-numeric submission is a wrong code, not a malformed body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmittedCode(pub serde_json::Value);

impl SubmittedCode {
    /// Numeric value under JavaScript `Number()` coercion, `None` when it
    /// isn't a non-negative integer that fits a passcode.
    pub fn as_code(&self) -> Option<u32> {
        coerce(&self.0).and_then(integral)
    }
}

fn coerce(value: &serde_json::Value) -> Option<f64> {
    use serde_json::Value;
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_numeric(s),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::Array(items) => coerce_element(items),
        Value::Object(_) => None,
    }
}

// Arrays coerce through their string form: [] is 0, [x] is x, anything longer is NaN.
fn coerce_element(items: &[serde_json::Value]) -> Option<f64> {
    use serde_json::Value;
    match items {
        [] => Some(0.0),
        [Value::Null] => Some(0.0),
        [Value::Number(n)] => n.as_f64(),
        [Value::String(s)] => parse_numeric(s),
        [Value::Array(inner)] => coerce_element(inner),
        _ => None,
    }
}

fn parse_numeric(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return Some(0.0);
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).ok().map(|v| v as f64);
        }
    }
    // Rust accepts "inf"/"nan" spellings that Number() does not
    if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    s.parse().ok()
}

fn integral(v: f64) -> Option<u32> {
    if v.is_finite() && v.fract() == 0.0 && v >= 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}

impl From<u32> for SubmittedCode {
    fn from(code: u32) -> Self {
        SubmittedCode(code.into())
    }
}

impl From<&str> for SubmittedCode {
    fn from(code: &str) -> Self {
        SubmittedCode(code.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OtpResponse {
    pub success: bool,
    #[schema(example = "OTP sent successfully")]
    pub message: String,
}

impl OtpResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn code(raw: &str) -> Option<u32> {
        serde_json::from_str::<SubmittedCode>(raw).unwrap().as_code()
    }

    #[test]
    fn submitted_code_accepts_number_and_string() {
        assert_eq!(code("123456"), Some(123456));
        assert_eq!(code("\" 654321 \""), Some(654321));
    }

    #[test]
    fn submitted_code_follows_number_coercion() {
        assert_eq!(code("123456.0"), Some(123456));
        assert_eq!(code("\"123456.0\""), Some(123456));
        assert_eq!(code("\"1.23456e5\""), Some(123456));
        assert_eq!(code("\"0x1E240\""), Some(123456));
        assert_eq!(code("[123456]"), Some(123456));
        assert_eq!(code("[\"123456\"]"), Some(123456));
        assert_eq!(code("[[123456]]"), Some(123456));
        assert_eq!(code("true"), Some(1));
        assert_eq!(code("\"\""), Some(0));
        assert_eq!(code("null"), Some(0));
        assert_eq!(code("[]"), Some(0));
    }

    #[test]
    fn submitted_code_rejects_non_integers() {
        for raw in ["12.5", "-4", "\"abc\"", "\"Infinity\"", "\"NaN\"", "{}", "[1, 2]", "[true]", "[{}]", "1e300"] {
            assert_eq!(code(raw), None, "{raw}");
        }
    }

    #[test]
    fn record_expiry_is_strictly_after_deadline() {
        let now = Instant::now();
        let rec = OtpRecord { code: 111111, expires_at: now };
        assert!(!rec.is_expired_at(now));
        assert!(rec.is_expired_at(now + Duration::from_millis(1)));
    }
}
