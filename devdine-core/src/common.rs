//! Request and response data types that are common and useful between clients of and the devdine server

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Request to issue a verification code for an email address
#[derive(Deserialize, Serialize, Clone, Debug, Default, ToSchema)]
pub struct OtpRequest {
    /// The email address to verify
    #[serde(default)]
    pub email: String,
}

/// Request to check a verification code
#[derive(Deserialize, Serialize, Clone, Debug, Default, ToSchema)]
pub struct OtpVerifyRequest {
    /// The email address the code was issued for
    #[serde(default)]
    pub email: String,
    /// The six digit code
    #[serde(default)]
    #[schema(example = "007123")]
    pub otp: String,
}

/// Response to issuing a verification code
#[derive(Deserialize, Serialize, Clone, Debug, ToSchema)]
pub struct OtpIssuedResponse {
    /// Whether the code was issued
    pub success: bool,
    /// The code itself. Only present when the server runs with the demo
    /// shortcut enabled, real deployments deliver it out of band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
    /// When the code stops being accepted
    #[schema(value_type = String)]
    pub expires_at: DateTime<Utc>,
}

/// Request to create or update a user
#[derive(Deserialize, Serialize, Clone, Debug, Default, ToSchema, Validate)]
pub struct UpsertUserRequest {
    /// Display name
    #[serde(default)]
    #[validate(length(min = 1))]
    pub name: String,
    /// Email address, the unique key of the user
    #[serde(default)]
    #[validate(length(min = 1))]
    pub email: String,
}

/// Response to a user upsert
#[derive(Deserialize, Serialize, Clone, Debug, ToSchema)]
pub struct UpsertUserResponse {
    /// Whether the user was saved
    pub success: bool,
    /// Identifier of the stored record
    pub id: i32,
    /// Whether the record was created or updated
    pub message: String,
}

/// A stored user
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, ToSchema)]
pub struct UserResponse {
    /// Identifier of the record
    pub id: i32,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// When the user was first saved
    #[schema(value_type = String)]
    pub created_at: NaiveDateTime,
    /// When the user was last changed, if ever
    #[schema(value_type = Option<String>)]
    pub updated_at: Option<NaiveDateTime>,
}

/// Response type indiciating success
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct SuccessResponse {
    /// Whether the response was successful
    pub success: bool,
}

/// Body of every error response
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct ErrorResponse {
    /// Human readable description, safe to show to the user
    #[schema(example = "Invalid OTP")]
    pub error: String,
}

/// How the customer wants their order
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum OrderType {
    /// Dine in
    EatHere,
    /// Take away
    TakeHome,
}

impl OrderType {
    /// All choices, in the order they're offered
    pub const ALL: [OrderType; 2] = [OrderType::EatHere, OrderType::TakeHome];
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::EatHere => write!(f, "Eat here"),
            OrderType::TakeHome => write!(f, "Take home"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use testresult::TestResult;

    #[test]
    fn test_order_type_wire_names() -> TestResult {
        assert_eq!(serde_json::to_value(OrderType::EatHere)?, json!("eat-here"));
        assert_eq!(serde_json::to_value(OrderType::TakeHome)?, json!("take-home"));
        Ok(())
    }

    #[test]
    fn test_missing_fields_default_to_empty() -> TestResult {
        let request: UpsertUserRequest = serde_json::from_value(json!({ "name": "Alice" }))?;
        assert_eq!(request.email, "");
        assert!(validator::Validate::validate(&request).is_err());
        Ok(())
    }

    #[test]
    fn test_issued_response_omits_missing_code() -> TestResult {
        let response = OtpIssuedResponse {
            success: true,
            otp: None,
            expires_at: Utc::now(),
        };
        assert!(serde_json::to_value(response)?.get("otp").is_none());
        Ok(())
    }
}
