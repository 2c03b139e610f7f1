//! Contract with the crypto payment provider: merchant trade numbers and
//! signed webhook notifications.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha512;

use crate::domain::ids::{CourseId, UserId};

pub const TRADE_NO_PREFIX: &str = "COURSE";
pub const PAY_SUCCESS: &str = "PAY_SUCCESS";

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentSettings {
    /// Currency prices are quoted in on the manual checkout page
    pub currency: String,
    /// Shared secret used to sign provider notifications
    pub webhook_secret: Option<String>,
}

/// Order identifier encoding course and buyer: `COURSE_{courseId}_{userId}_{millis}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerchantTradeNo {
    pub course_id: CourseId,
    pub user_id: UserId,
    pub issued_at_millis: Option<i64>,
}

impl MerchantTradeNo {
    pub fn new(course_id: CourseId, user_id: UserId, issued_at: DateTime<Utc>) -> Self {
        Self {
            course_id,
            user_id,
            issued_at_millis: Some(issued_at.timestamp_millis()),
        }
    }
}

impl Display for MerchantTradeNo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", TRADE_NO_PREFIX, self.course_id, self.user_id)?;
        if let Some(millis) = self.issued_at_millis {
            write!(f, "_{}", millis)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed merchant trade number: {0}")]
pub struct MalformedTradeNo(String);

impl FromStr for MerchantTradeNo {
    type Err = MalformedTradeNo;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || MalformedTradeNo(s.to_string());
        let parts = s.split('_').collect::<Vec<_>>();

        if parts.len() < 3 || parts[0] != TRADE_NO_PREFIX {
            return Err(malformed());
        }

        let course_id = parts[1].parse::<CourseId>().map_err(|_| malformed())?;
        let user_id = parts[2].parse::<UserId>().map_err(|_| malformed())?;
        let issued_at_millis = parts.get(3).and_then(|millis| millis.parse::<i64>().ok());

        Ok(Self {
            course_id,
            user_id,
            issued_at_millis,
        })
    }
}

/// Uppercase hex HMAC-SHA512 of `"{timestamp}\n{nonce}\n{body}\n"`.
#[cfg(test)]
pub fn sign(secret: &str, timestamp: &str, nonce: &str, body: &str) -> String {
    let digest = signer(secret, timestamp, nonce, body).finalize().into_bytes();
    hex::encode_upper(digest)
}

/// Checks a notification signature in constant time.
pub fn verify(secret: &str, timestamp: &str, nonce: &str, body: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    signer(secret, timestamp, nonce, body)
        .verify_slice(&expected)
        .is_ok()
}

fn signer(secret: &str, timestamp: &str, nonce: &str, body: &str) -> Hmac<Sha512> {
    let mut mac = <Hmac<Sha512> as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(format!("{}\n{}\n{}\n", timestamp, nonce, body).as_bytes());
    mac
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Headers the provider signs every notification with
#[derive(Debug, Clone, Default)]
pub struct SignatureHeaders {
    pub timestamp: String,
    pub nonce: String,
    pub signature: String,
}

/// Verifies a raw notification body and decodes it. Without a configured
/// secret every notification is refused.
pub fn authenticate(
    secret: Option<&str>,
    headers: &SignatureHeaders,
    body: &str,
) -> Result<ProviderNotification, WebhookError> {
    let secret = secret.ok_or(WebhookError::InvalidSignature)?;
    if !verify(secret, &headers.timestamp, &headers.nonce, body, &headers.signature) {
        return Err(WebhookError::InvalidSignature);
    }
    serde_json::from_str(body).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
}

/// Notification posted by the provider on order status changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderNotification {
    pub biz_status: Option<String>,
    /// Order details, delivered either as an object or as a json encoded string
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderData {
    merchant_trade_no: Option<String>,
}

impl ProviderNotification {
    pub fn is_paid(&self) -> bool {
        self.biz_status.as_deref() == Some(PAY_SUCCESS)
    }

    pub fn merchant_trade_no(&self) -> Option<String> {
        let data = match self.data.as_ref()? {
            Value::String(encoded) => serde_json::from_str::<OrderData>(encoded).ok()?,
            value => serde_json::from_value::<OrderData>(value.clone()).ok()?,
        };
        data.merchant_trade_no
    }
}
