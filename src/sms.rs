//! Throttling for outbound SMS delivery.
//!
//! [`RateLimitedSmsService`] wraps any [`SmsService`] and checks one shared
//! sliding window before every send, so a fragile SMS provider sees at most
//! `rate` sends per window across the whole fleet.

use async_trait::async_trait;

use crate::rate_limit::{RateLimitError, SlidingWindowLimiter, WindowPolicy};

/// Window key shared by every send, regardless of recipient.
pub const SMS_LIMIT_KEY: &str = "sms:send";

#[derive(Debug)]
pub enum SmsError {
    /// Over the send rate; nothing was delivered
    Limited,
    /// The rate check itself failed; the caller decides whether to retry
    Limiter(RateLimitError),
    /// The provider rejected or failed the send
    Delivery(String),
}

impl std::fmt::Display for SmsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmsError::Limited => write!(f, "SMS send rate limited"),
            SmsError::Limiter(e) => write!(f, "SMS rate check failed: {}", e),
            SmsError::Delivery(e) => write!(f, "SMS delivery failed: {}", e),
        }
    }
}

impl std::error::Error for SmsError {}

#[async_trait]
pub trait SmsService: Send + Sync {
    async fn send(
        &self,
        template_id: &str,
        args: &[String],
        numbers: &[String],
    ) -> Result<(), SmsError>;
}

pub struct RateLimitedSmsService<S> {
    inner: S,
    limiter: SlidingWindowLimiter,
    policy: WindowPolicy,
}

impl<S: SmsService> RateLimitedSmsService<S> {
    pub fn new(inner: S, limiter: SlidingWindowLimiter, policy: WindowPolicy) -> Self {
        Self {
            inner,
            limiter,
            policy,
        }
    }
}

#[async_trait]
impl<S: SmsService> SmsService for RateLimitedSmsService<S> {
    async fn send(
        &self,
        template_id: &str,
        args: &[String],
        numbers: &[String],
    ) -> Result<(), SmsError> {
        let limited = self
            .limiter
            .limit(SMS_LIMIT_KEY, self.policy.rate, self.policy.interval)
            .await
            .map_err(SmsError::Limiter)?;

        if limited {
            tracing::warn!(template_id, "SMS send rate limited");
            return Err(SmsError::Limited);
        }
        self.inner.send(template_id, args, numbers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::store::tests::DownStore;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default, Clone)]
    struct CountingSms {
        sent: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SmsService for CountingSms {
        async fn send(
            &self,
            _template_id: &str,
            _args: &[String],
            numbers: &[String],
        ) -> Result<(), SmsError> {
            self.sent.fetch_add(numbers.len(), Ordering::SeqCst);
            Ok(())
        }
    }

    fn numbers() -> Vec<String> {
        vec!["+15550100".to_string()]
    }

    #[tokio::test]
    async fn test_sends_until_limited() {
        let inner = CountingSms::default();
        let store = Arc::new(MemoryStore::new());
        let service = RateLimitedSmsService::new(
            inner.clone(),
            SlidingWindowLimiter::new(store.clone()),
            WindowPolicy::new(2, Duration::from_secs(60)).unwrap(),
        );

        service.send("otp", &[], &numbers()).await.unwrap();
        service.send("otp", &[], &numbers()).await.unwrap();
        assert!(matches!(
            service.send("otp", &[], &numbers()).await,
            Err(SmsError::Limited)
        ));

        assert_eq!(inner.sent.load(Ordering::SeqCst), 2);
        assert_eq!(store.window_len(SMS_LIMIT_KEY).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_limiter_failure_is_reported_not_guessed() {
        let inner = CountingSms::default();
        let service = RateLimitedSmsService::new(
            inner.clone(),
            SlidingWindowLimiter::new(Arc::new(DownStore)),
            WindowPolicy::new(10, Duration::from_secs(1)).unwrap(),
        );

        assert!(matches!(
            service.send("otp", &[], &numbers()).await,
            Err(SmsError::Limiter(RateLimitError::StoreUnavailable(_)))
        ));
        assert_eq!(inner.sent.load(Ordering::SeqCst), 0);
    }
}
