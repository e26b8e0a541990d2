//! Status enums for carts and orders.
//!
//! Both stores persist statuses as lowercase text. Parsing is strict except
//! for the legacy `active` order status, which older data uses for `pending`.

use serde::{Deserialize, Serialize};

/// Error returned when a stored status string is outside its domain.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid {kind} status: {value}")]
pub struct StatusParseError {
    kind: &'static str,
    value: String,
}

/// Shopping cart lifecycle status.
///
/// `Active` is the only state that accepts items or transitions; `Abandoned`
/// and `Converted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    #[default]
    Active,
    Abandoned,
    Converted,
}

impl CartStatus {
    /// Lowercase storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Abandoned => "abandoned",
            Self::Converted => "converted",
        }
    }

    /// Whether no further transition is allowed from this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Whether `self -> next` is a permitted transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Abandoned | Self::Converted)
        )
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CartStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "abandoned" => Ok(Self::Abandoned),
            "converted" => Ok(Self::Converted),
            _ => Err(StatusParseError {
                kind: "cart",
                value: s.to_owned(),
            }),
        }
    }
}

/// Order status. All values are terminal; no transition is modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[serde(alias = "active")]
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Lowercase storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" | "active" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(StatusParseError {
                kind: "order",
                value: s.to_owned(),
            }),
        }
    }
}
