//! Customer frame entity: a branded overlay owned by a customer.

use postframe_core::eligibility::FrameFacet;
use postframe_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `customer_frames` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CustomerFrame {
    pub id: DbId,
    pub customer_id: DbId,
    pub group_id: Option<DbId>,
    pub frame_image: String,
    pub display_name: Option<String>,
    pub profession_type: Option<String>,
    pub business_category_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CustomerFrame {
    /// The attributes eligibility rules look at.
    pub fn facet(&self) -> FrameFacet {
        FrameFacet {
            id: self.id,
            customer_id: self.customer_id,
            group_id: self.group_id,
            profession_type: self.profession_type.clone(),
            business_category_id: self.business_category_id,
        }
    }
}

/// DTO for creating a customer frame.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCustomerFrame {
    pub customer_id: DbId,
    pub group_id: Option<DbId>,
    pub frame_image: String,
    pub display_name: Option<String>,
    pub profession_type: Option<String>,
    pub business_category_id: Option<DbId>,
}

/// DTO for updating a customer frame.
///
/// Outer `None` leaves the column untouched; `Some(None)` clears a nullable
/// column.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCustomerFrame {
    #[serde(default, with = "double_option")]
    pub group_id: Option<Option<DbId>>,
    pub frame_image: Option<String>,
    #[serde(default, with = "double_option")]
    pub display_name: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub profession_type: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub business_category_id: Option<Option<DbId>>,
}

/// Distinguishes an absent JSON field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_distinguishes_null_from_absent() {
        let update: UpdateCustomerFrame =
            serde_json::from_value(serde_json::json!({ "group_id": null })).unwrap();
        assert_eq!(update.group_id, Some(None));
        assert_eq!(update.business_category_id, None);

        let update: UpdateCustomerFrame =
            serde_json::from_value(serde_json::json!({ "group_id": 4 })).unwrap();
        assert_eq!(update.group_id, Some(Some(4)));
    }
}
