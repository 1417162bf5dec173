//! Contact info, postal address and the city/street lookup tables

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Deduplicated name tables referenced by addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LookupTable {
    City,
    Street,
}

impl LookupTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            LookupTable::City => "cities",
            LookupTable::Street => "streets",
        }
    }

    /// Form field that errors for this table are reported under
    pub fn field(&self) -> &'static str {
        match self {
            LookupTable::City => "city",
            LookupTable::Street => "street",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LookupTable::City => "City",
            LookupTable::Street => "Street",
        }
    }
}

/// Row of the cities or streets table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LookupEntry {
    pub id: i32,
    pub name: String,
}

/// Contact info, one per account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LibraryUserInfo {
    pub id: i32,
    pub account_id: i32,
    pub phone_number: i32,
}

/// Postal address, one per contact info row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LibraryUserAddress {
    pub id: i32,
    pub user_info_id: i32,
    pub city_id: i32,
    pub street_id: i32,
    pub building_number: i32,
    pub apartment_number: i32,
}

/// Address with city and street names resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AddressDetails {
    pub building_number: i32,
    pub apartment_number: i32,
    pub city: String,
    pub street: String,
}

/// Contact and address rows created together with an account
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub phone_number: i32,
    pub city_id: i32,
    pub street_id: i32,
    pub building_number: i32,
    pub apartment_number: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContactInfo {
    pub phone_number: i32,
}

/// Profile page data. Missing contact or address rows are `null`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileView {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub contact: Option<ContactInfo>,
    pub address: Option<AddressDetails>,
}

/// Writes resolved from a profile edit, applied together or not at all.
/// `None` leaves the corresponding record untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub account_id: i32,
    pub email: Option<String>,
    pub user_info_id: i32,
    pub phone_number: Option<i32>,
    pub address: Option<LibraryUserAddress>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone_number.is_none() && self.address.is_none()
    }
}

/// Profile edit request: only the fields to change are present
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ProfileChanges {
    #[validate(email(message = "Enter a valid email address."), length(max = 254))]
    pub email: Option<String>,
    #[validate(range(min = 0, max = 99999))]
    pub phone_number: Option<i32>,
    #[validate(length(max = 200))]
    pub pick_city: Option<String>,
    #[validate(length(max = 200))]
    pub add_city: Option<String>,
    #[validate(length(max = 200))]
    pub pick_street: Option<String>,
    #[validate(length(max = 200))]
    pub add_street: Option<String>,
    #[validate(range(min = 0, max = 32767))]
    pub building_number: Option<i32>,
    #[validate(range(min = 0, max = 32767))]
    pub apartment_number: Option<i32>,
}
