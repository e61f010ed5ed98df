//! Order value types shared between persistence and the domain.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a status string is not one of the allowed values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}

/// Fulfilment status of an order.
///
/// No transition graph is enforced: an administrator may move an order from
/// any status to any other status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Every allowed status, in lifecycle order.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Returns the persisted name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError {
                kind: "order status",
                value: s.to_string(),
            })
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(ParseStatusError {
                kind: "payment status",
                value: other.to_string(),
            }),
        }
    }
}

/// How an order is paid for. Cash on delivery is the only supported method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "COD")]
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "COD",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COD" => Ok(PaymentMethod::CashOnDelivery),
            other => Err(ParseStatusError {
                kind: "payment method",
                value: other.to_string(),
            }),
        }
    }
}

/// Error returned when a required address field is missing or blank.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("shipping address field '{field}' is required")]
pub struct AddressError {
    pub field: &'static str,
}

/// Where an order is delivered.
///
/// Missing required fields deserialize as empty strings so that
/// [`ShippingAddress::validate`] names the field instead of the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl ShippingAddress {
    /// Creates an address with the four required fields.
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            city: city.into(),
            postal_code: postal_code.into(),
            country: country.into(),
            state: None,
            instructions: None,
        }
    }

    /// Sets the optional state/region.
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Sets optional delivery instructions.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Checks that every required field is present and not blank.
    pub fn validate(&self) -> Result<(), AddressError> {
        let required = [
            ("street", &self.street),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ];

        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(AddressError { field: *field }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_parses_every_allowed_value() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn order_status_rejects_unknown_value() {
        let err = "bogus".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.value, "bogus");
        assert_eq!(err.to_string(), "invalid order status: bogus");
    }

    #[test]
    fn order_status_parse_is_case_sensitive() {
        assert!("Shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn defaults_match_new_order() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(PaymentStatus::default(), PaymentStatus::Unpaid);
        assert_eq!(PaymentMethod::default().as_str(), "COD");
    }

    #[test]
    fn payment_method_serializes_as_cod() {
        let json = serde_json::to_string(&PaymentMethod::CashOnDelivery).unwrap();
        assert_eq!(json, "\"COD\"");
    }

    #[test]
    fn payment_status_roundtrips_through_str() {
        for status in [PaymentStatus::Unpaid, PaymentStatus::Paid, PaymentStatus::Refunded] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
    }

    #[test]
    fn complete_address_validates() {
        let address = ShippingAddress::new("1 Main St", "Springfield", "12345", "US")
            .with_state("IL")
            .with_instructions("leave at the door");
        assert!(address.validate().is_ok());
    }

    #[test]
    fn blank_required_field_is_rejected() {
        let address = ShippingAddress::new("1 Main St", "   ", "12345", "US");
        assert_eq!(address.validate().unwrap_err().field, "city");

        let address = ShippingAddress::new("1 Main St", "Springfield", "12345", "");
        assert_eq!(address.validate().unwrap_err().field, "country");
    }

    #[test]
    fn address_uses_snake_case_on_the_wire() {
        let json = serde_json::json!({
            "street": "1 Main St",
            "city": "Springfield",
            "postal_code": "12345",
            "country": "US"
        });
        let address: ShippingAddress = serde_json::from_value(json).unwrap();
        assert_eq!(address.postal_code, "12345");
        assert!(address.state.is_none());

        let back = serde_json::to_value(&address).unwrap();
        assert_eq!(back["postal_code"], "12345");
        assert!(back.get("state").is_none());
    }

    #[test]
    fn address_missing_required_field_fails_validation() {
        let json = serde_json::json!({ "street": "1 Main St", "city": "Springfield" });
        let address: ShippingAddress = serde_json::from_value(json).unwrap();
        assert_eq!(address.validate().unwrap_err().field, "postal_code");
    }
}
