use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use metrics::counter;
use rand::Rng;

use crate::mailer::{Mailer, MailerError};
use crate::models::{OutgoingEmail, SubmittedCode};
use crate::store::{Consumed, OtpStore};

pub const CODE_RANGE: std::ops::RangeInclusive<u32> = 100_000..=999_999;
pub const OTP_SUBJECT: &str = "Your OTP Code";

#[derive(thiserror::Error, Debug)]
pub enum OtpError {
    #[error("Email required")]
    EmailRequired,
    #[error("OTP expired or not found")]
    NotFound,
    #[error("OTP expired")]
    Expired,
    #[error("Invalid OTP")]
    Invalid,
    #[error("Email failed")]
    Delivery(#[from] MailerError),
}

/// Uniform six digit code.
pub fn generate_code() -> u32 {
    rand::thread_rng().gen_range(CODE_RANGE)
}

pub fn render_body(code: u32, ttl: Duration) -> String {
    let minutes = (ttl.as_secs() / 60).max(1);
    let unit = if minutes == 1 { "minute" } else { "minutes" };
    format!("<h2>Your OTP is: {code}</h2>\n<p>This OTP is valid for {minutes} {unit}.</p>")
}

#[derive(Clone)]
pub struct OtpService {
    store: Arc<dyn OtpStore>,
    mailer: Arc<dyn Mailer>,
    sender: String,
    ttl: Duration,
}

impl OtpService {
    pub fn new(store: Arc<dyn OtpStore>, mailer: Arc<dyn Mailer>, sender: impl Into<String>, ttl: Duration) -> Self {
        Self { store, mailer, sender: sender.into(), ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store a fresh code for `email` and mail it. The record stays stored even if delivery fails.
    pub async fn send(&self, email: Option<&str>) -> Result<(), OtpError> {
        let email = email.filter(|e| !e.is_empty()).ok_or(OtpError::EmailRequired)?;

        let code = generate_code();
        self.store.put(email, code, self.ttl).await;

        let message = OutgoingEmail {
            from: self.sender.clone(),
            to: email.to_string(),
            subject: OTP_SUBJECT.to_string(),
            html: render_body(code, self.ttl),
        };
        if let Err(e) = self.mailer.send(&message).await {
            warn!("otp delivery to {email} failed: {e}");
            counter!("otp_send_failed_total").increment(1);
            return Err(e.into());
        }
        debug!("otp issued for {email}");
        counter!("otp_sent_total").increment(1);
        Ok(())
    }

    /// Single check: a wrong code leaves the record in place, a match or an expiry removes it.
    pub async fn verify(&self, email: Option<&str>, submitted: Option<&SubmittedCode>) -> Result<(), OtpError> {
        let result = self.check(email, submitted).await;
        let outcome = match &result {
            Ok(()) => "verified",
            Err(OtpError::NotFound) => "not_found",
            Err(OtpError::Expired) => "expired",
            Err(_) => "invalid",
        };
        counter!("otp_verify_total", "outcome" => outcome).increment(1);
        result
    }

    async fn check(&self, email: Option<&str>, submitted: Option<&SubmittedCode>) -> Result<(), OtpError> {
        let email = email.ok_or(OtpError::NotFound)?;
        let code = submitted.and_then(SubmittedCode::as_code);

        match self.store.consume(email, code).await {
            Consumed::NotFound => Err(OtpError::NotFound),
            Consumed::Expired => Err(OtpError::Expired),
            Consumed::Mismatch => Err(OtpError::Invalid),
            Consumed::Accepted => {
                debug!("otp verified for {email}");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryOtpStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &OutgoingEmail) -> Result<(), MailerError> {
            if self.fail {
                return Err(MailerError::Transport("connection refused".into()));
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    fn service(store: InMemoryOtpStore, mailer: Arc<RecordingMailer>, ttl: Duration) -> OtpService {
        OtpService::new(Arc::new(store), mailer, "App <no-reply@example.com>", ttl)
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..1000 {
            let c = generate_code();
            assert!(CODE_RANGE.contains(&c), "{c}");
        }
    }

    #[test]
    fn body_mentions_code_and_window() {
        let body = render_body(424242, Duration::from_secs(300));
        assert!(body.contains("Your OTP is: 424242"));
        assert!(body.contains("valid for 5 minutes"));
        assert!(render_body(1, Duration::from_secs(10)).contains("1 minute."));
    }

    #[actix_rt::test]
    async fn send_stores_code_and_mails_it() {
        let store = InMemoryOtpStore::new();
        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(store.clone(), mailer.clone(), Duration::from_secs(300));

        svc.send(Some("a@x.io")).await.unwrap();

        let code = store.get("a@x.io").await.unwrap().code;
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@x.io");
        assert_eq!(sent[0].subject, OTP_SUBJECT);
        assert!(sent[0].html.contains(&code.to_string()));
    }

    #[actix_rt::test]
    async fn send_requires_non_empty_email() {
        let svc = service(InMemoryOtpStore::new(), Arc::new(RecordingMailer::default()), Duration::from_secs(1));
        assert!(matches!(svc.send(None).await, Err(OtpError::EmailRequired)));
        assert!(matches!(svc.send(Some("")).await, Err(OtpError::EmailRequired)));
    }

    #[actix_rt::test]
    async fn delivery_failure_keeps_record() {
        let store = InMemoryOtpStore::new();
        let mailer = Arc::new(RecordingMailer { fail: true, ..Default::default() });
        let svc = service(store.clone(), mailer, Duration::from_secs(300));
        let err = svc.send(Some("a@x.io")).await.unwrap_err();
        assert!(matches!(err, OtpError::Delivery(_)));
        assert_eq!(store.len(), 1);
    }

    #[actix_rt::test]
    async fn verify_flow() {
        let store = InMemoryOtpStore::new();
        let svc = service(store.clone(), Arc::new(RecordingMailer::default()), Duration::from_secs(300));
        store.put("a@x.io", 123456, Duration::from_secs(300)).await;

        let wrong = SubmittedCode::from(654321);
        assert!(matches!(svc.verify(Some("a@x.io"), Some(&wrong)).await, Err(OtpError::Invalid)));
        assert!(matches!(svc.verify(Some("a@x.io"), None).await, Err(OtpError::Invalid)));
        assert_eq!(store.len(), 1);

        let right = SubmittedCode::from("123456");
        svc.verify(Some("a@x.io"), Some(&right)).await.unwrap();
        assert!(store.is_empty());
        assert!(matches!(svc.verify(Some("a@x.io"), Some(&right)).await, Err(OtpError::NotFound)));
    }

    #[actix_rt::test]
    async fn expired_record_is_removed() {
        let store = InMemoryOtpStore::new();
        let svc = service(store.clone(), Arc::new(RecordingMailer::default()), Duration::from_millis(0));
        store.put("a@x.io", 123456, Duration::from_millis(0)).await;
        std::thread::sleep(Duration::from_millis(5));

        let code = SubmittedCode::from(123456);
        assert!(matches!(svc.verify(Some("a@x.io"), Some(&code)).await, Err(OtpError::Expired)));
        assert!(store.is_empty());
    }
}
