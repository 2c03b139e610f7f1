use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::LazyLock;

use nutype::nutype;
use regex::Regex;
use serde::{Deserialize, Serialize};

// A regex for order identifiers: ASCII letters, digits, underscore and dash.
// Example: "COURSE_abc_123" is valid; "order 1" or "order/1" are not.
pub const ORDER_ID_REGEX: &str = r"^[A-Za-z0-9_-]+$";

static ORDER_ID_REGEX_COMPILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(ORDER_ID_REGEX).expect("ORDER_ID_REGEX must be a valid regex")
});

pub fn is_eligible_order_id(id: &str) -> bool {
    ORDER_ID_REGEX_COMPILED.is_match(id)
}

#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 100),
    derive(Clone, Debug, Display, AsRef, PartialEq, Eq, Serialize)
)]
pub struct CourseTitle(String);

#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 200),
    derive(Clone, Debug, Display, AsRef, PartialEq, Eq, Serialize)
)]
pub struct ChapterTitle(String);

#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 128, predicate = is_eligible_order_id),
    derive(Clone, Debug, Display, AsRef, PartialEq, Eq, Serialize)
)]
pub struct OrderId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Platform role of a user, stored as upper case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Instructor => "INSTRUCTOR",
            Role::Admin => "ADMIN",
        }
    }

    pub fn can_author(&self) -> bool {
        matches!(self, Role::Instructor | Role::Admin)
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STUDENT" => Ok(Role::Student),
            "INSTRUCTOR" => Ok(Role::Instructor),
            "ADMIN" => Ok(Role::Admin),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review state of a manually verified payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Approved => "APPROVED",
            PaymentStatus::Rejected => "REJECTED",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "APPROVED" => Ok(PaymentStatus::Approved),
            "REJECTED" => Ok(PaymentStatus::Rejected),
            other => Err(UnknownVariant {
                kind: "payment status",
                value: other.to_string(),
            }),
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_title_is_trimmed_and_bounded() {
        let title = CourseTitle::try_new("  Rust for beginners ").unwrap();
        assert_eq!(title.as_ref(), "Rust for beginners");

        assert!(CourseTitle::try_new("   ").is_err());
        assert!(CourseTitle::try_new("x".repeat(101)).is_err());
        assert!(CourseTitle::try_new("x".repeat(100)).is_ok());
    }

    #[test]
    fn order_id_accepts_merchant_trade_numbers_only() {
        assert!(OrderId::try_new("COURSE_4f1c_9a2b_1718000000000").is_ok());
        assert!(OrderId::try_new("tx-123").is_ok());
        assert!(OrderId::try_new("order 1").is_err());
        assert!(OrderId::try_new("").is_err());
    }

    #[test]
    fn payment_status_text_round_trip() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Approved,
            PaymentStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("DONE".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn only_instructors_and_admins_author_courses() {
        assert!(!Role::Student.can_author());
        assert!(Role::Instructor.can_author());
        assert!(Role::Admin.can_author());
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
    }
}
