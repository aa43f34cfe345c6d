//! Status enums for orders, payments and return requests.
//!
//! All three enums decode fail-soft: a wire value that is not recognised
//! becomes `Unknown` instead of failing deserialisation, so an order with a
//! status written by a newer service can still be rendered. Matching on these
//! enums is exhaustive everywhere in the crate, so adding a status forces
//! every consumer to handle it.

use serde::{Deserialize, Serialize};

/// Primary fulfilment lifecycle of an order.
///
/// The first five variants form the linear progress sequence.
/// `Cancelled` and `Returned` are out-of-band and handled by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
    /// A status this build does not know about.
    Unknown,
}

impl OrderStatus {
    /// Wire representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Returned => "returned",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a wire value, degrading to `Unknown`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "confirmed" => Self::Confirmed,
            "processing" => Self::Processing,
            "shipped" => Self::Shipped,
            "delivered" => Self::Delivered,
            "cancelled" => Self::Cancelled,
            "returned" => Self::Returned,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
    Unknown,
}

impl PaymentStatus {
    /// Wire representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a wire value, degrading to `Unknown`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "paid" => Self::Paid,
            "failed" => Self::Failed,
            "refunded" => Self::Refunded,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for PaymentStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

/// Lifecycle of a single return request.
///
/// `Pending -> Approved -> Processing -> Completed`, or any non-terminal
/// state `-> Rejected`. `Completed` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum ReturnRequestStatus {
    #[default]
    Pending,
    Approved,
    Processing,
    Completed,
    Rejected,
    Unknown,
}

impl ReturnRequestStatus {
    /// Wire representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a wire value, degrading to `Unknown`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "rejected" => Self::Rejected,
            _ => Self::Unknown,
        }
    }

    /// How far along the return is. Higher wins when several returns
    /// compete to represent an order.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Self::Pending => 1,
            Self::Approved => 2,
            Self::Processing => 3,
            Self::Completed => 4,
            Self::Rejected | Self::Unknown => 0,
        }
    }

    /// Everything except `Rejected` counts as an active return.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Rejected)
    }

    /// Whether staff may move a return from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (*self, next),
            (Self::Pending, Self::Approved)
                | (Self::Approved, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (
                    Self::Pending | Self::Approved | Self::Processing,
                    Self::Rejected
                )
        )
    }
}

impl std::fmt::Display for ReturnRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ReturnRequestStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}
