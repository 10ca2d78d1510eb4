//! Request and response bodies for the farm-management endpoints.
//!
//! Response types are lenient: optional fields default when absent, and
//! decimal fields accept either a JSON number or a numeric string.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// New-account form for `account/user/register/`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// The signed-in user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<u64>,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state_province: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    /// The farm owned by this user, when the backend reports one.
    #[serde(default, alias = "farm_id")]
    pub farm: Option<u64>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Partial profile update; unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Farm {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub farm_name: Option<String>,
    #[serde(default)]
    pub farm_email: Option<String>,
    #[serde(default)]
    pub farm_website: Option<String>,
    #[serde(default)]
    pub farm_phone_number: Option<String>,
    #[serde(default)]
    pub farm_address: Option<String>,
    #[serde(default)]
    pub farm_city: Option<String>,
    #[serde(default)]
    pub farm_state_province: Option<String>,
    #[serde(default)]
    pub farm_country: Option<String>,
    #[serde(default)]
    pub farm_postal_code: Option<String>,
}

/// Partial farm update, also used to complete onboarding.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FarmUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_state_province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_postal_code: Option<String>,
}

impl FarmUpdate {
    pub fn is_empty(&self) -> bool {
        self.farm_name.is_none()
            && self.farm_email.is_none()
            && self.farm_website.is_none()
            && self.farm_phone_number.is_none()
            && self.farm_address.is_none()
            && self.farm_city.is_none()
            && self.farm_state_province.is_none()
            && self.farm_country.is_none()
            && self.farm_postal_code.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Livestock {
    pub id: u64,
    pub animal_type: String,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub acquisition_date: Option<NaiveDate>,
    #[serde(default)]
    pub acquisition_method: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub health_status: Option<String>,
    #[serde(default, deserialize_with = "decimal")]
    pub current_weight: Option<f64>,
    #[serde(default, deserialize_with = "decimal")]
    pub current_age: Option<f64>,
    #[serde(default)]
    pub photo: Option<String>,
}

/// Body for creating or patching an animal.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LivestockInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animal_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_age: Option<f64>,
}

/// One page of a paginated list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "decimal")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "decimal")]
    pub stock: Option<f64>,
    #[serde(default, deserialize_with = "decimal")]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub category: Option<u64>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
}

/// Where to send the user for Google sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleLoginUrl {
    pub url: String,
}

#[derive(Serialize)]
pub(crate) struct ForgotPasswordRequest<'a> {
    pub email: &'a str,
}

#[derive(Serialize)]
pub(crate) struct ChangePasswordRequest<'a> {
    pub old_password: &'a str,
    pub new_password: &'a str,
}

/// Decimal fields arrive as numbers or as strings like `"42.50"`.
fn decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid decimal: {s}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_livestock_accepts_string_decimals() {
        let animal: Livestock = serde_json::from_value(json!({
            "id": 7,
            "animal_type": "Goat",
            "breed": "Boer",
            "date_of_birth": "2023-04-01",
            "current_weight": "41.50",
            "current_age": 18,
            "status": "Active"
        }))
        .unwrap();

        assert_eq!(animal.current_weight, Some(41.5));
        assert_eq!(animal.current_age, Some(18.0));
        assert_eq!(animal.date_of_birth, NaiveDate::from_ymd_opt(2023, 4, 1));
        assert_eq!(animal.gender, None);
    }

    #[test]
    fn test_livestock_rejects_garbage_decimal() {
        let result: Result<Livestock, _> = serde_json::from_value(json!({
            "id": 7,
            "animal_type": "Goat",
            "current_weight": "heavy"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_updates_skip_unset_fields() {
        let update = FarmUpdate {
            farm_name: Some("Green Acres".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({ "farm_name": "Green Acres" })
        );
        assert!(!update.is_empty());
        assert!(FarmUpdate::default().is_empty());

        let input = LivestockInput {
            animal_type: Some("Cow".into()),
            date_of_birth: NaiveDate::from_ymd_opt(2022, 1, 9),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({ "animal_type": "Cow", "date_of_birth": "2022-01-09" })
        );
    }

    #[test]
    fn test_page_and_profile() {
        let page: Page<Category> = serde_json::from_value(json!({
            "count": 3,
            "next": "https://farm.example.com/api/inventory/categories/?page=2",
            "previous": null,
            "results": [{ "id": 1, "name": "Feed" }]
        }))
        .unwrap();
        assert!(page.has_next());
        assert_eq!(page.results[0].name, "Feed");

        let profile: UserProfile = serde_json::from_value(json!({
            "email": "jo@farm.test",
            "first_name": "Jo",
            "last_name": "",
            "farm_id": 12
        }))
        .unwrap();
        assert_eq!(profile.full_name(), "Jo");
        assert_eq!(profile.farm, Some(12));
    }
}
