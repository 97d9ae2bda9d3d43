//! Frame creation rules and the hooks' own dispatch.

mod common;

use assert_matches::assert_matches;
use common::*;
use postframe_core::dispatch::DispatchMode;
use postframe_core::error::CoreError;
use postframe_core::mapping::MappingKind;
use postframe_core::trigger::TriggerAction;
use postframe_db::models::customer_frame::UpdateCustomerFrame;
use postframe_pipeline::frames::{create_customer_frame, update_customer_frame};
use postframe_pipeline::PipelineError;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn created_frame_is_normalized_and_mapped(pool: PgPool) {
    let group_a = group(&pool, "A").await;
    let e1 = event(&pool, "E1", Some(days_from_today(2))).await;
    let p1 = post(&pool, e1, group_a).await;
    let customer_id = customer(&pool, "c1", 2).await;

    let mut input = frame_input(customer_id, Some(group_a));
    input.display_name = Some("  City Clinic ".into());
    input.profession_type = Some(" Doctor".into());

    let dispatcher = dispatcher(&pool, DispatchMode::Inline);
    let (frame, report) = create_customer_frame(&dispatcher, &input).await.unwrap();

    assert_eq!(frame.display_name.as_deref(), Some("City Clinic"));
    assert_eq!(frame.profession_type.as_deref(), Some("doctor"));
    assert_eq!(
        report.actions[0].action,
        TriggerAction::MapFrame { frame_id: frame.id }
    );
    assert_eq!(mapped_posts(&pool, MappingKind::Post, frame.id).await, vec![p1]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn frame_quota_is_enforced(pool: PgPool) {
    let customer_id = customer(&pool, "c1", 1).await;
    let dispatcher = dispatcher(&pool, DispatchMode::Inline);

    create_customer_frame(&dispatcher, &frame_input(customer_id, None))
        .await
        .unwrap();
    let err = create_customer_frame(&dispatcher, &frame_input(customer_id, None))
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Validation(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_customer_is_not_found(pool: PgPool) {
    let dispatcher = dispatcher(&pool, DispatchMode::Inline);
    let err = create_customer_frame(&dispatcher, &frame_input(9_999, None))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        PipelineError::Core(CoreError::NotFound { entity: "customer", id: 9_999 })
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn display_name_is_unique_per_customer(pool: PgPool) {
    let first = customer(&pool, "c1", 5).await;
    let second = customer(&pool, "c2", 5).await;
    let dispatcher = dispatcher(&pool, DispatchMode::Inline);

    let mut input = frame_input(first, None);
    input.display_name = Some("Shop".into());
    create_customer_frame(&dispatcher, &input).await.unwrap();

    input.display_name = Some(" Shop ".into());
    let err = create_customer_frame(&dispatcher, &input).await.unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Conflict(_)));

    // Another customer may reuse the name.
    input.customer_id = second;
    create_customer_frame(&dispatcher, &input).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_business_identity_is_rejected(pool: PgPool) {
    let customer_id = customer(&pool, "c1", 5).await;
    let cardio = business_category(&pool, "Cardiology", "doctor").await;
    let dispatcher = dispatcher(&pool, DispatchMode::Inline);

    let mut input = frame_input(customer_id, None);
    input.display_name = Some("Heart care".into());
    input.profession_type = Some("doctor".into());
    input.business_category_id = Some(cardio);
    create_customer_frame(&dispatcher, &input).await.unwrap();

    input.display_name = Some("Heart care 2".into());
    input.profession_type = Some("DOCTOR".into());
    let err = create_customer_frame(&dispatcher, &input).await.unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Conflict(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn blank_frame_image_is_rejected(pool: PgPool) {
    let customer_id = customer(&pool, "c1", 5).await;
    let mut input = frame_input(customer_id, None);
    input.frame_image = "   ".into();
    let err = create_customer_frame(&dispatcher(&pool, DispatchMode::Inline), &input)
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Core(CoreError::Validation(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_dispatches_for_changed_fields_only(pool: PgPool) {
    let group_a = group(&pool, "A").await;
    let group_b = group(&pool, "B").await;
    let e1 = event(&pool, "E1", Some(days_from_today(2))).await;
    post(&pool, e1, group_a).await;
    let p2 = post(&pool, e1, group_b).await;
    let customer_id = customer(&pool, "c1", 5).await;
    let dispatcher = dispatcher(&pool, DispatchMode::Inline);
    let (frame, _) = create_customer_frame(&dispatcher, &frame_input(customer_id, Some(group_a)))
        .await
        .unwrap();

    // Same image: nothing to do.
    let (_, report) = update_customer_frame(
        &dispatcher,
        frame.id,
        &UpdateCustomerFrame {
            frame_image: Some(frame.frame_image.clone()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(report.actions.is_empty());

    let (updated, report) = update_customer_frame(
        &dispatcher,
        frame.id,
        &UpdateCustomerFrame {
            group_id: Some(Some(group_b)),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.group_id, Some(group_b));
    assert_eq!(
        report.actions[0].action,
        TriggerAction::ReconcileFrameGroup { frame_id: frame.id }
    );
    assert_eq!(mapped_posts(&pool, MappingKind::Post, frame.id).await, vec![p2]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn updating_missing_frame_is_not_found(pool: PgPool) {
    let err = update_customer_frame(
        &dispatcher(&pool, DispatchMode::Inline),
        77,
        &UpdateCustomerFrame::default(),
    )
    .await
    .unwrap_err();
    assert_matches!(
        err,
        PipelineError::Core(CoreError::NotFound { entity: "customer_frame", .. })
    );
}
