//! Customer frame hooks.
//!
//! Frame writes go through here so that the creation rules are enforced in
//! one transaction and the resulting save is dispatched to the trigger
//! layer exactly once.

use postframe_core::error::CoreError;
use postframe_core::frame_rules::{
    normalize_display_name, normalize_profession_type, validate_frame_quota,
};
use postframe_core::trigger::{
    EntitySaved, EntityType, FIELD_BUSINESS_CATEGORY_ID, FIELD_FRAME_IMAGE, FIELD_GROUP_ID,
    FIELD_PROFESSION_TYPE,
};
use postframe_core::types::DbId;
use postframe_db::models::customer_frame::{CreateCustomerFrame, CustomerFrame, UpdateCustomerFrame};
use postframe_db::repositories::{CustomerFrameRepo, CustomerRepo};

use crate::error::PipelineError;
use crate::trigger::{DispatchReport, TriggerDispatcher};

/// Create a frame and fan it out.
///
/// Enforced in one transaction, with the customer row locked:
/// - the customer exists and owns fewer than `no_of_post` frames;
/// - the display name is not already used by the customer;
/// - with both a display name and a profession, the customer has no other
///   frame with the same profession and business category.
pub async fn create_customer_frame(
    dispatcher: &TriggerDispatcher,
    input: &CreateCustomerFrame,
) -> Result<(CustomerFrame, DispatchReport), PipelineError> {
    let mut input = input.clone();
    input.display_name = normalize_display_name(input.display_name.as_deref())?;
    input.profession_type = normalize_profession_type(input.profession_type.as_deref())?;
    if input.frame_image.trim().is_empty() {
        return Err(CoreError::Validation("Frame image is required".to_string()).into());
    }

    let mut tx = dispatcher.pool().begin().await?;

    let customer = CustomerRepo::lock_by_id(&mut tx, input.customer_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "customer",
            id: input.customer_id,
        })?;

    let existing = CustomerFrameRepo::count_for_customer(&mut tx, customer.id).await?;
    validate_frame_quota(existing, customer.no_of_post)?;

    if let Some(name) = input.display_name.as_deref() {
        if CustomerFrameRepo::display_name_taken(&mut tx, customer.id, name).await? {
            return Err(CoreError::Conflict(format!(
                "The customer already has a frame named \"{name}\""
            ))
            .into());
        }
        if let Some(profession) = input.profession_type.as_deref() {
            let duplicate = CustomerFrameRepo::exists_with_business(
                &mut tx,
                customer.id,
                profession,
                input.business_category_id,
            )
            .await?;
            if duplicate {
                return Err(CoreError::Conflict(
                    "The customer already has a frame for this profession and business category"
                        .to_string(),
                )
                .into());
            }
        }
    }

    let frame = CustomerFrameRepo::create(&mut tx, &input).await?;
    tx.commit().await?;

    tracing::info!(
        frame_id = frame.id,
        customer_id = frame.customer_id,
        group_id = ?frame.group_id,
        "Customer frame created"
    );

    let report = dispatcher
        .on_entity_saved(&EntitySaved::created(EntityType::CustomerFrame, frame.id))
        .await;
    Ok((frame, report))
}

/// Update a frame and dispatch whatever its changed fields call for.
pub async fn update_customer_frame(
    dispatcher: &TriggerDispatcher,
    frame_id: DbId,
    input: &UpdateCustomerFrame,
) -> Result<(CustomerFrame, DispatchReport), PipelineError> {
    let not_found = CoreError::NotFound {
        entity: "customer_frame",
        id: frame_id,
    };
    let before = CustomerFrameRepo::find_by_id(dispatcher.pool(), frame_id)
        .await?
        .ok_or(not_found)?;

    let mut input = input.clone();
    if let Some(name) = input.display_name.take() {
        input.display_name = Some(normalize_display_name(name.as_deref())?);
    }
    if let Some(profession) = input.profession_type.take() {
        input.profession_type = Some(normalize_profession_type(profession.as_deref())?);
    }

    let after = CustomerFrameRepo::update(dispatcher.pool(), frame_id, &input)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "customer_frame",
            id: frame_id,
        })?;

    let changed = changed_fields(&before, &after);
    let report = dispatcher
        .on_entity_saved(&EntitySaved::updated(
            EntityType::CustomerFrame,
            frame_id,
            changed,
        ))
        .await;
    Ok((after, report))
}

/// Mapping-relevant fields that differ between two versions of a frame.
pub fn changed_fields(before: &CustomerFrame, after: &CustomerFrame) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if before.group_id != after.group_id {
        fields.push(FIELD_GROUP_ID);
    }
    if before.frame_image != after.frame_image {
        fields.push(FIELD_FRAME_IMAGE);
    }
    if before.profession_type != after.profession_type {
        fields.push(FIELD_PROFESSION_TYPE);
    }
    if before.business_category_id != after.business_category_id {
        fields.push(FIELD_BUSINESS_CATEGORY_ID);
    }
    fields
}
