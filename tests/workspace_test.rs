mod common;

use backoffice_queue::{
    ActionExecutor, ActionKind, BatchApplication, Entity, EntityStatus, Filters, QueueError,
    QueueState, RemoteReply, Resolution, ReviewOutcome, SearchFields, SelectionError,
    StatusFilter, Workspace,
};
use common::{ids, outcome_ids, RecordingBackend, Script};
use std::sync::Arc;
use tokio::time::Duration;

fn listing() -> Vec<Entity> {
    vec![
        Entity::new("1", EntityStatus::Pending)
            .with_attr("title", "Vintage lamp")
            .with_attr("category", "home"),
        Entity::new("2", EntityStatus::Pending)
            .with_attr("title", "Road bike")
            .with_attr("category", "sport"),
        Entity::new("3", EntityStatus::Published)
            .with_attr("title", "Oak desk")
            .with_attr("category", "home"),
        Entity::new("4", EntityStatus::Deleted)
            .with_attr("title", "Broken chair")
            .with_attr("category", "home"),
    ]
}

fn workspace(backend: &RecordingBackend) -> Workspace {
    let backend = Arc::new(backend.clone());
    let executor = ActionExecutor::new(backend.clone(), "listings", Duration::from_millis(200), 4);
    Workspace::new(
        backend,
        executor,
        SearchFields::new(&["title", "description"], "category"),
    )
}

fn visible_ids(ws: &Workspace) -> Vec<&str> {
    ws.visible().iter().map(|e| e.id.as_str()).collect()
}

#[tokio::test]
async fn filtering_prunes_selection_to_visible_page() {
    let backend = RecordingBackend::with_listing(listing());
    let mut ws = workspace(&backend);
    ws.refresh().await.unwrap();
    assert_eq!(visible_ids(&ws), vec!["1", "2", "3", "4"]);

    ws.set_filters(Filters {
        status: Some(StatusFilter::Only(EntityStatus::Pending)),
        ..Default::default()
    });
    assert_eq!(visible_ids(&ws), vec!["1", "2"]);

    ws.select_all_visible();
    assert!(ws.is_fully_selected());

    ws.set_filters(Filters {
        category: Some("home".into()),
        ..Default::default()
    });
    assert_eq!(visible_ids(&ws), vec!["1", "3", "4"]);
    assert_eq!(ws.selection().selected_in_view_order(), ids(&["1"]));
    assert!(!ws.is_fully_selected());

    assert_eq!(
        ws.toggle(&"2".into()).unwrap_err(),
        SelectionError::NotVisible("2".into())
    );
}

#[tokio::test]
async fn bulk_action_applies_successes_and_reports_failures_by_id() {
    let backend = RecordingBackend::with_listing(listing());
    backend.script("2", Script::Hang).await;
    let mut ws = workspace(&backend);
    ws.refresh().await.unwrap();
    ws.set_filters(Filters {
        status: Some("pending".parse().unwrap()),
        ..Default::default()
    });
    ws.select_all_visible();

    let BatchApplication::Applied(result) = ws.run_batch(ActionKind::Validate).await else {
        panic!("batch should apply");
    };
    assert_eq!(result.success_count, 1);
    assert_eq!(result.failure_count, 1);
    assert_eq!(outcome_ids(&result), vec!["1", "2"]);
    assert_eq!(result.outcomes[1].error_message.as_deref(), Some("timeout"));

    assert_eq!(
        ws.store().get(&"1".into()).unwrap().status,
        EntityStatus::Approved
    );
    assert_eq!(
        ws.store().get(&"2".into()).unwrap().status,
        EntityStatus::Pending
    );
    // "1" no longer matches the pending filter; the failed id stays selected.
    assert_eq!(visible_ids(&ws), vec!["2"]);
    assert_eq!(ws.selection().selected_in_view_order(), ids(&["2"]));
}

#[tokio::test]
async fn restore_only_reaches_backend_for_deleted_entities() {
    let backend = RecordingBackend::with_listing(listing());
    let mut ws = workspace(&backend);
    ws.refresh().await.unwrap();
    ws.toggle(&"3".into()).unwrap();
    ws.toggle(&"4".into()).unwrap();

    let BatchApplication::Applied(result) = ws.run_batch(ActionKind::Restore).await else {
        panic!("batch should apply");
    };
    assert_eq!(outcome_ids(&result), vec!["3", "4"]);
    assert!(!result.outcomes[0].succeeded);
    assert_eq!(
        result.outcomes[0].error_message.as_deref(),
        Some("restore not applicable to published")
    );
    assert!(result.outcomes[1].succeeded);
    assert_eq!(backend.calls().await, vec![(ActionKind::Restore, "4".to_string())]);
    assert_eq!(
        ws.store().get(&"4".into()).unwrap().status,
        EntityStatus::Pending
    );
}

#[tokio::test]
async fn review_never_sends_decisions_for_deleted_entities() {
    let backend = RecordingBackend::with_listing(listing());
    let mut ws = workspace(&backend);
    ws.refresh().await.unwrap();
    ws.set_filters(Filters {
        status: Some(StatusFilter::Only(EntityStatus::Deleted)),
        ..Default::default()
    });
    ws.load_queue();
    assert_eq!(ws.queue().state(), QueueState::Focused("4".into()));

    match ws.resolve_focused(Resolution::Approved).await.unwrap() {
        ReviewOutcome::Failed(outcome) => {
            assert_eq!(outcome.id.as_str(), "4");
            assert_eq!(
                outcome.error_message.as_deref(),
                Some("validate not applicable to deleted")
            );
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(backend.calls().await.is_empty());
    assert_eq!(ws.queue().state(), QueueState::Focused("4".into()));
    assert_eq!(
        ws.store().get(&"4".into()).unwrap().status,
        EntityStatus::Deleted
    );
}

#[tokio::test]
async fn confirmed_delete_removes_entity_and_selection() {
    let backend = RecordingBackend::with_listing(listing());
    backend
        .script("2", Script::Reply(RemoteReply::refused("has open orders")))
        .await;
    let mut ws = workspace(&backend);
    ws.refresh().await.unwrap();
    ws.toggle(&"1".into()).unwrap();
    ws.toggle(&"2".into()).unwrap();

    let BatchApplication::Applied(result) = ws.run_batch(ActionKind::Delete).await else {
        panic!("batch should apply");
    };
    assert!(result.is_partial_failure());
    assert!(ws.store().get(&"1".into()).is_none());
    assert_eq!(visible_ids(&ws), vec!["2", "3", "4"]);
    assert_eq!(ws.selection().selected_in_view_order(), ids(&["2"]));
}

#[tokio::test]
async fn late_result_after_close_is_discarded() {
    let backend = RecordingBackend::with_listing(listing());
    let mut ws = workspace(&backend);
    ws.refresh().await.unwrap();
    ws.toggle(&"1".into()).unwrap();

    let pending = ws.begin_batch(ActionKind::Block);
    let executor = ActionExecutor::new(
        Arc::new(backend.clone()),
        "listings",
        Duration::from_secs(1),
        1,
    );
    let result = executor.execute(&pending.request).await;
    ws.close();

    assert_eq!(ws.complete_batch(pending, result), BatchApplication::Discarded);
    assert_eq!(
        ws.store().get(&"1".into()).unwrap().status,
        EntityStatus::Pending
    );
}

#[tokio::test]
async fn refresh_invalidates_outstanding_batches() {
    let backend = RecordingBackend::with_listing(listing());
    let mut ws = workspace(&backend);
    ws.refresh().await.unwrap();
    ws.toggle(&"3".into()).unwrap();
    let pending = ws.begin_batch(ActionKind::Unpublish);

    backend.set_listing(listing()[..3].to_vec()).await;
    ws.refresh().await.unwrap();
    assert_eq!(ws.store().len(), 3);

    let executor = ActionExecutor::new(
        Arc::new(backend.clone()),
        "listings",
        Duration::from_secs(1),
        1,
    );
    let result = executor.execute(&pending.request).await;
    assert_eq!(ws.complete_batch(pending, result), BatchApplication::Discarded);
}

#[tokio::test]
async fn review_queue_advances_only_on_confirmed_decisions() {
    let backend = RecordingBackend::with_listing(listing());
    backend.script("2", Script::Fail("503".into())).await;
    let mut ws = workspace(&backend);
    ws.refresh().await.unwrap();
    ws.set_filters(Filters {
        status: Some(StatusFilter::Only(EntityStatus::Pending)),
        ..Default::default()
    });
    ws.load_queue();
    assert_eq!(ws.queue().state(), QueueState::Focused("1".into()));

    match ws.resolve_focused(Resolution::Approved).await.unwrap() {
        ReviewOutcome::Resolved { entity, outcome } => {
            assert_eq!(entity.id.as_str(), "1");
            assert!(outcome.succeeded);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(ws.queue().state(), QueueState::Focused("2".into()));
    assert_eq!(
        ws.store().get(&"1".into()).unwrap().status,
        EntityStatus::Approved
    );

    match ws.resolve_focused(Resolution::Rejected).await.unwrap() {
        ReviewOutcome::Failed(outcome) => {
            assert_eq!(outcome.id.as_str(), "2");
            assert_eq!(outcome.error_message.as_deref(), Some("503"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(ws.queue().state(), QueueState::Focused("2".into()));

    backend
        .script("2", Script::Reply(RemoteReply::ok()))
        .await;
    ws.resolve_focused(Resolution::Rejected).await.unwrap();
    assert_eq!(ws.queue().state(), QueueState::Idle);
    assert_eq!(
        ws.store().get(&"2".into()).unwrap().status,
        EntityStatus::Rejected
    );

    assert_eq!(
        ws.resolve_focused(Resolution::Approved).await.unwrap_err(),
        QueueError::InvalidState {
            operation: "resolve"
        }
    );
    assert_eq!(
        backend.calls().await,
        vec![
            (ActionKind::Validate, "1".to_string()),
            (ActionKind::Reject, "2".to_string()),
            (ActionKind::Reject, "2".to_string()),
        ]
    );
}
