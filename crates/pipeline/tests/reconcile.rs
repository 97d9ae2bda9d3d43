//! Group-change reconciliation and business re-derivation.

mod common;

use assert_matches::assert_matches;
use common::*;
use postframe_core::dispatch::DispatchMode;
use postframe_core::mapping::{MappingKey, MappingKind};
use postframe_core::trigger::{
    EntitySaved, EntityType, TriggerAction, FIELD_BUSINESS_CATEGORY_ID, FIELD_GROUP_ID,
    FIELD_PROFESSION_TYPE,
};
use postframe_core::types::DbId;
use postframe_db::models::customer_frame::UpdateCustomerFrame;
use postframe_db::models::post::UpdateBusinessPost;
use postframe_db::repositories::{BusinessPostRepo, CustomerFrameRepo, MappingRepo};
use postframe_pipeline::trigger::Disposition;
use postframe_pipeline::TriggerDispatcher;
use sqlx::PgPool;

async fn move_frame(dispatcher: &TriggerDispatcher, frame_id: DbId, group_id: Option<DbId>) {
    CustomerFrameRepo::update(
        dispatcher.pool(),
        frame_id,
        &UpdateCustomerFrame {
            group_id: Some(group_id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let report = dispatcher
        .on_entity_saved(&EntitySaved::updated(
            EntityType::CustomerFrame,
            frame_id,
            [FIELD_GROUP_ID],
        ))
        .await;
    assert!(!report.has_failures(), "{report:?}");
}

async fn map_frame(dispatcher: &TriggerDispatcher, frame_id: DbId) {
    dispatcher
        .on_entity_saved(&EntitySaved::created(EntityType::CustomerFrame, frame_id))
        .await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn mappings_without_counterpart_are_removed(pool: PgPool) {
    let group_a = group(&pool, "A").await;
    let group_b = group(&pool, "B").await;
    let shared = event(&pool, "Shared", Some(days_from_today(4))).await;
    let only_a = event(&pool, "OnlyA", Some(days_from_today(4))).await;
    let only_b = event(&pool, "OnlyB", Some(days_from_today(4))).await;
    post(&pool, shared, group_a).await;
    post(&pool, only_a, group_a).await;
    let shared_b = post(&pool, shared, group_b).await;
    let only_b_post = post(&pool, only_b, group_b).await;

    let dispatcher = dispatcher(&pool, DispatchMode::Inline);
    let frame = frame_in(&pool, "c1", Some(group_a)).await;
    map_frame(&dispatcher, frame.id).await;
    assert_eq!(mapped_posts(&pool, MappingKind::Post, frame.id).await.len(), 2);

    move_frame(&dispatcher, frame.id, Some(group_b)).await;

    let mut expected = vec![shared_b, only_b_post];
    expected.sort_unstable();
    assert_eq!(mapped_posts(&pool, MappingKind::Post, frame.id).await, expected);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reconcile_never_duplicates_an_existing_replacement(pool: PgPool) {
    let group_a = group(&pool, "A").await;
    let group_b = group(&pool, "B").await;
    let e1 = event(&pool, "E1", Some(days_from_today(4))).await;
    let p1 = post(&pool, e1, group_a).await;
    let p2 = post(&pool, e1, group_b).await;

    let dispatcher = dispatcher(&pool, DispatchMode::Inline);
    let frame = frame_in(&pool, "c1", Some(group_b)).await;
    // The frame already holds both the old-group and the new-group row.
    dispatcher
        .executor()
        .materializer()
        .materialize(
            MappingKind::Post,
            [
                MappingKey::new(frame.customer_id, frame.id, p1),
                MappingKey::new(frame.customer_id, frame.id, p2),
            ],
            false,
        )
        .await
        .unwrap();

    let result = dispatcher
        .executor()
        .reconciler()
        .reconcile_frame_group(frame.id, today())
        .await
        .unwrap();

    assert_eq!(result.repointed, 0);
    assert_eq!(result.removed, 1);
    assert_eq!(mapped_posts(&pool, MappingKind::Post, frame.id).await, vec![p2]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reconcile_twice_finds_nothing_to_do(pool: PgPool) {
    let group_a = group(&pool, "A").await;
    let group_b = group(&pool, "B").await;
    let e1 = event(&pool, "E1", Some(days_from_today(4))).await;
    post(&pool, e1, group_a).await;
    post(&pool, e1, group_b).await;

    let dispatcher = dispatcher(&pool, DispatchMode::Inline);
    let frame = frame_in(&pool, "c1", Some(group_a)).await;
    map_frame(&dispatcher, frame.id).await;
    move_frame(&dispatcher, frame.id, Some(group_b)).await;

    let again = dispatcher
        .executor()
        .reconciler()
        .reconcile_frame_group(frame.id, today())
        .await
        .unwrap();
    assert_eq!(again.repointed, 0);
    assert_eq!(again.removed, 0);
    assert!(again.materialized.is_noop());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn group_change_prunes_other_and_business_rows(pool: PgPool) {
    let group_a = group(&pool, "A").await;
    let group_b = group(&pool, "B").await;
    let other_a = other_post(&pool, group_a).await;
    let other_b = other_post(&pool, group_b).await;
    business_post(&pool, group_a, None, None).await;
    let business_b = business_post(&pool, group_b, None, None).await;

    let dispatcher = dispatcher(&pool, DispatchMode::Inline);
    let frame = frame_in(&pool, "c1", Some(group_a)).await;
    map_frame(&dispatcher, frame.id).await;
    assert_eq!(mapped_posts(&pool, MappingKind::OtherPost, frame.id).await, vec![other_a]);

    move_frame(&dispatcher, frame.id, Some(group_b)).await;

    assert_eq!(mapped_posts(&pool, MappingKind::OtherPost, frame.id).await, vec![other_b]);
    assert_eq!(
        mapped_posts(&pool, MappingKind::BusinessPost, frame.id).await,
        vec![business_b]
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn clearing_the_group_drops_every_mapping(pool: PgPool) {
    let group_a = group(&pool, "A").await;
    let e1 = event(&pool, "E1", Some(days_from_today(4))).await;
    post(&pool, e1, group_a).await;
    other_post(&pool, group_a).await;
    business_post(&pool, group_a, None, None).await;

    let dispatcher = dispatcher(&pool, DispatchMode::Inline);
    let frame = frame_in(&pool, "c1", Some(group_a)).await;
    map_frame(&dispatcher, frame.id).await;

    move_frame(&dispatcher, frame.id, None).await;

    for kind in MappingKind::ALL {
        assert!(mapped_posts(&pool, kind, frame.id).await.is_empty(), "{kind}");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn profession_change_rederives_business_rows(pool: PgPool) {
    let group_a = group(&pool, "A").await;
    let doctor_post = business_post(&pool, group_a, Some("doctor"), None).await;
    let lawyer_post = business_post(&pool, group_a, Some("lawyer"), None).await;
    let open_post = business_post(&pool, group_a, None, None).await;

    let dispatcher = dispatcher(&pool, DispatchMode::Inline);
    let customer_id = customer(&pool, "c1", 5).await;
    let mut input = frame_input(customer_id, Some(group_a));
    input.profession_type = Some("doctor".into());
    let frame = raw_frame(&pool, input).await;
    map_frame(&dispatcher, frame.id).await;

    let mut expected = vec![doctor_post, open_post];
    expected.sort_unstable();
    assert_eq!(mapped_posts(&pool, MappingKind::BusinessPost, frame.id).await, expected);

    CustomerFrameRepo::update(
        &pool,
        frame.id,
        &UpdateCustomerFrame {
            profession_type: Some(Some("lawyer".into())),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let report = dispatcher
        .on_entity_saved(&EntitySaved::updated(
            EntityType::CustomerFrame,
            frame.id,
            [FIELD_PROFESSION_TYPE],
        ))
        .await;
    assert_eq!(
        report.actions[0].action,
        TriggerAction::RefreshFrameBusiness { frame_id: frame.id }
    );
    let outcome = assert_matches!(&report.actions[0].disposition, Disposition::Inline { outcome } => outcome);
    assert_eq!(outcome.removed, 1);

    let mut expected = vec![lawyer_post, open_post];
    expected.sort_unstable();
    assert_eq!(mapped_posts(&pool, MappingKind::BusinessPost, frame.id).await, expected);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn business_category_change_on_frame_drops_mismatches(pool: PgPool) {
    let group_a = group(&pool, "A").await;
    let cardio = business_category(&pool, "Cardiology", "doctor").await;
    let neuro = business_category(&pool, "Neurology", "doctor").await;
    let cardio_post = business_post(&pool, group_a, Some("doctor"), Some(cardio)).await;
    let neuro_post = business_post(&pool, group_a, Some("doctor"), Some(neuro)).await;

    let dispatcher = dispatcher(&pool, DispatchMode::Inline);
    let customer_id = customer(&pool, "c1", 5).await;
    let mut input = frame_input(customer_id, Some(group_a));
    input.profession_type = Some("doctor".into());
    input.business_category_id = Some(cardio);
    let frame = raw_frame(&pool, input).await;
    map_frame(&dispatcher, frame.id).await;
    assert_eq!(mapped_posts(&pool, MappingKind::BusinessPost, frame.id).await, vec![cardio_post]);

    CustomerFrameRepo::update(
        &pool,
        frame.id,
        &UpdateCustomerFrame {
            business_category_id: Some(Some(neuro)),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    dispatcher
        .on_entity_saved(&EntitySaved::updated(
            EntityType::CustomerFrame,
            frame.id,
            [FIELD_BUSINESS_CATEGORY_ID],
        ))
        .await;

    assert_eq!(mapped_posts(&pool, MappingKind::BusinessPost, frame.id).await, vec![neuro_post]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn narrowing_a_business_post_prunes_frames(pool: PgPool) {
    let group_a = group(&pool, "A").await;
    let dispatcher = dispatcher(&pool, DispatchMode::Inline);

    let mut frames = Vec::new();
    for (name, profession) in [("doc", "doctor"), ("law", "lawyer")] {
        let customer_id = customer(&pool, name, 5).await;
        let mut input = frame_input(customer_id, Some(group_a));
        input.profession_type = Some(profession.into());
        frames.push(raw_frame(&pool, input).await);
    }

    let bp = business_post(&pool, group_a, None, None).await;
    dispatcher
        .on_entity_saved(&EntitySaved::created(EntityType::BusinessPost, bp))
        .await;
    assert_eq!(
        MappingRepo::count_for_post(&pool, MappingKind::BusinessPost, bp).await.unwrap(),
        2
    );

    BusinessPostRepo::update(
        &pool,
        bp,
        &UpdateBusinessPost {
            profession_type: Some("doctor".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    dispatcher
        .on_entity_saved(&EntitySaved::updated(
            EntityType::BusinessPost,
            bp,
            [FIELD_PROFESSION_TYPE],
        ))
        .await;

    assert_eq!(mapped_posts(&pool, MappingKind::BusinessPost, frames[0].id).await, vec![bp]);
    assert!(mapped_posts(&pool, MappingKind::BusinessPost, frames[1].id).await.is_empty());
}
