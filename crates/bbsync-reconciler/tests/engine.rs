//! Reconciliation engine against the in-memory repository service.

use std::sync::Arc;

use bbsync_client::{
    ErrorKind, GroupGrant, InMemoryRepositoryService, Operation, Permission, RecordedCall,
    Repository, RepositoryRef,
};
use bbsync_reconciler::{DesiredState, RepositoryReconciler, ResourceState};
use tokio_util::sync::CancellationToken;

fn setup() -> (Arc<InMemoryRepositoryService>, RepositoryReconciler) {
    let store = InMemoryRepositoryService::shared();
    let reconciler = RepositoryReconciler::new(store.clone());
    (store, reconciler)
}

fn grant(name: &str, permission: Permission) -> GroupGrant {
    GroupGrant::new(name, permission)
}

fn svc() -> DesiredState {
    DesiredState::new("CORE", "svc")
        .with_description("x")
        .with_group(grant("devs", Permission::Write))
}

fn remote(description: &str, public: bool) -> Repository {
    Repository {
        id: None,
        name: "svc".into(),
        project: "CORE".into(),
        description: description.into(),
        public,
    }
}

fn svc_ref() -> RepositoryRef {
    RepositoryRef::new("CORE", "svc")
}

#[tokio::test]
async fn test_observe_missing_repository() {
    let (store, reconciler) = setup();

    let observation = reconciler
        .observe(&svc(), &CancellationToken::new())
        .await
        .expect("missing is not an error");

    assert_eq!(observation.state, ResourceState::Missing);
    assert_eq!(observation.id, None);
    assert!(!observation.exists());
    assert_eq!(store.calls(), vec![RecordedCall::Get(svc_ref())]);
}

#[tokio::test]
async fn test_observe_up_to_date_carries_id() {
    let (store, reconciler) = setup();
    let seeded = store.insert(remote("x", false), vec![grant("devs", Permission::Write)]);

    let observation = reconciler
        .observe(&svc(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(observation.state, ResourceState::UpToDate);
    assert_eq!(observation.id, seeded.id);
    assert!(observation.is_up_to_date());
}

#[tokio::test]
async fn test_observe_description_drift_skips_group_fetch() {
    let (store, reconciler) = setup();
    store.insert(remote("stale", false), vec![grant("devs", Permission::Write)]);

    let observation = reconciler
        .observe(&svc(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(observation.state, ResourceState::OutOfDate);
    assert!(observation.exists());
    assert_eq!(store.calls(), vec![RecordedCall::Get(svc_ref())]);
}

#[tokio::test]
async fn test_observe_absent_description_matches_empty() {
    let (store, reconciler) = setup();
    store.insert(remote("", false), Vec::new());

    let desired = DesiredState::new("CORE", "svc");
    let observation = reconciler
        .observe(&desired, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(observation.state, ResourceState::UpToDate);
}

#[tokio::test]
async fn test_observe_visibility_drift() {
    let (store, reconciler) = setup();
    store.insert(remote("x", true), vec![grant("devs", Permission::Write)]);

    let observation = reconciler
        .observe(&svc(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(observation.state, ResourceState::OutOfDate);
}

#[tokio::test]
async fn test_observe_group_comparison() {
    let cancel = CancellationToken::new();
    let desired = DesiredState::new("CORE", "svc")
        .with_description("x")
        .with_group(grant("A", Permission::Read))
        .with_group(grant("B", Permission::Write));

    let cases = [
        (vec![grant("B", Permission::Write), grant("A", Permission::Read)], ResourceState::UpToDate),
        (vec![grant("A", Permission::Write), grant("B", Permission::Write)], ResourceState::OutOfDate),
        (vec![grant("A", Permission::Read)], ResourceState::OutOfDate),
        (
            vec![
                grant("A", Permission::Read),
                grant("B", Permission::Write),
                grant("C", Permission::Read),
            ],
            ResourceState::OutOfDate,
        ),
    ];

    for (remote_groups, expected) in cases {
        let (store, reconciler) = setup();
        store.insert(remote("x", false), remote_groups.clone());
        let observation = reconciler.observe(&desired, &cancel).await.unwrap();
        assert_eq!(observation.state, expected, "remote groups: {remote_groups:?}");
    }
}

#[tokio::test]
async fn test_observe_propagates_other_errors() {
    let (store, reconciler) = setup();
    store.insert(remote("x", false), Vec::new());

    store.fail_next(Operation::Get, ErrorKind::PermissionDenied);
    let err = reconciler
        .observe(&svc(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    store.fail_next(Operation::GetGroups, ErrorKind::Malformed);
    let err = reconciler
        .observe(&svc(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[tokio::test]
async fn test_observe_rejects_invalid_declaration_without_remote_calls() {
    let (store, reconciler) = setup();
    let desired = svc().with_group(grant("devs", Permission::Read));

    let err = reconciler
        .observe(&desired, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("duplicate group"));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_create_against_empty_store() {
    let (store, reconciler) = setup();
    let cancel = CancellationToken::new();

    let created = reconciler.create(&svc(), &cancel).await.unwrap();

    assert!(created.id.is_some());
    assert_eq!(
        store.calls(),
        vec![
            RecordedCall::Create(remote("x", false)),
            RecordedCall::AddGroup(svc_ref(), grant("devs", Permission::Write)),
        ]
    );
    assert_eq!(
        store.grants(&svc_ref()).unwrap(),
        vec![grant("devs", Permission::Write)]
    );

    let observation = reconciler.observe(&svc(), &cancel).await.unwrap();
    assert_eq!(observation.state, ResourceState::UpToDate);
    assert_eq!(observation.id, created.id);
}

#[tokio::test]
async fn test_create_grants_in_declaration_order() {
    let (store, reconciler) = setup();
    let desired = DesiredState::new("CORE", "svc")
        .with_group(grant("C", Permission::Read))
        .with_group(grant("A", Permission::Admin));

    reconciler
        .create(&desired, &CancellationToken::new())
        .await
        .unwrap();

    let granted: Vec<_> = store
        .mutations()
        .into_iter()
        .filter_map(|call| match call {
            RecordedCall::AddGroup(_, g) => Some(g.name),
            _ => None,
        })
        .collect();
    assert_eq!(granted, ["C", "A"]);
}

#[tokio::test]
async fn test_create_stops_at_first_failed_grant() {
    let (store, reconciler) = setup();
    let desired = svc()
        .with_group(grant("ops", Permission::Read))
        .with_group(grant("qa", Permission::Read));
    store.fail_next(Operation::Create, ErrorKind::Conflict);

    let err = reconciler
        .create(&desired, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(store.is_empty());

    // Second attempt: the repository is created, the first grant fails.
    store.clear_calls();
    store.fail_next(Operation::AddGroup, ErrorKind::Transport);
    let err = reconciler
        .create(&desired, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(store.len(), 1);
    assert_eq!(store.grants(&svc_ref()).unwrap(), Vec::new());
    assert_eq!(store.calls().len(), 2);
}

#[tokio::test]
async fn test_update_upserts_then_prunes() {
    let (store, reconciler) = setup();
    store.insert(
        remote("x", false),
        vec![grant("A", Permission::Read), grant("B", Permission::Write)],
    );
    let desired = DesiredState::new("CORE", "svc")
        .with_description("x")
        .with_group(grant("A", Permission::Admin))
        .with_group(grant("C", Permission::Read));

    reconciler
        .update(&desired, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        store.mutations(),
        vec![
            RecordedCall::Update(remote("x", false)),
            RecordedCall::AddGroup(svc_ref(), grant("A", Permission::Admin)),
            RecordedCall::AddGroup(svc_ref(), grant("C", Permission::Read)),
            RecordedCall::RevokeGroup(svc_ref(), grant("B", Permission::Write)),
        ]
    );
    let mut grants = store.grants(&svc_ref()).unwrap();
    grants.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(
        grants,
        vec![grant("A", Permission::Admin), grant("C", Permission::Read)]
    );
}

#[tokio::test]
async fn test_update_refreshes_description_and_visibility() {
    let (store, reconciler) = setup();
    store.insert(remote("old", false), vec![grant("devs", Permission::Write)]);
    let desired = svc().with_public(true);
    let cancel = CancellationToken::new();

    assert_eq!(
        reconciler.observe(&desired, &cancel).await.unwrap().state,
        ResourceState::OutOfDate
    );
    let updated = reconciler.update(&desired, &cancel).await.unwrap();

    assert_eq!(updated.description, "x");
    assert!(updated.public);
    assert_eq!(
        reconciler.observe(&desired, &cancel).await.unwrap().state,
        ResourceState::UpToDate
    );
}

#[tokio::test]
async fn test_update_failure_leaves_completed_steps() {
    let (store, reconciler) = setup();
    store.insert(remote("x", false), vec![grant("B", Permission::Write)]);
    let desired = DesiredState::new("CORE", "svc")
        .with_description("x")
        .with_group(grant("A", Permission::Admin))
        .with_group(grant("C", Permission::Read));
    store.fail_next(Operation::AddGroup, ErrorKind::Transport);
    store.fail_next(Operation::AddGroup, ErrorKind::Transport);
    let cancel = CancellationToken::new();

    // The first upsert fails: nothing after it runs.
    assert!(reconciler.update(&desired, &cancel).await.is_err());
    assert!(
        !store
            .mutations()
            .iter()
            .any(|call| matches!(call, RecordedCall::RevokeGroup(..)))
    );
    assert_eq!(store.grants(&svc_ref()).unwrap(), vec![grant("B", Permission::Write)]);

    // A later pass converges.
    reconciler.update(&desired, &cancel).await.unwrap_err();
    reconciler.update(&desired, &cancel).await.unwrap();
    assert_eq!(
        reconciler.observe(&desired, &cancel).await.unwrap().state,
        ResourceState::UpToDate
    );
}

#[tokio::test]
async fn test_update_missing_repository_is_not_found() {
    let (_store, reconciler) = setup();
    let err = reconciler
        .update(&svc(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_delete_removes_repository() {
    let (store, reconciler) = setup();
    store.insert(remote("x", false), vec![grant("devs", Permission::Write)]);
    let cancel = CancellationToken::new();

    reconciler.delete(&svc(), &cancel).await.unwrap();

    assert_eq!(store.mutations(), vec![RecordedCall::Delete(svc_ref())]);
    assert_eq!(
        reconciler.observe(&svc(), &cancel).await.unwrap().state,
        ResourceState::Missing
    );
}

#[tokio::test]
async fn test_permission_denied_surfaces_from_every_operation() {
    let cancel = CancellationToken::new();
    for operation in [Operation::Create, Operation::Update, Operation::Delete] {
        let (store, reconciler) = setup();
        if operation != Operation::Create {
            store.insert(remote("x", false), Vec::new());
        }
        store.fail_next(operation, ErrorKind::PermissionDenied);

        let kind = match operation {
            Operation::Create => reconciler.create(&svc(), &cancel).await.unwrap_err().kind(),
            Operation::Update => reconciler.update(&svc(), &cancel).await.unwrap_err().kind(),
            _ => reconciler.delete(&svc(), &cancel).await.unwrap_err().kind(),
        };
        assert_eq!(kind, ErrorKind::PermissionDenied, "{operation:?}");
    }
}

#[tokio::test]
async fn test_cancelled_token_aborts_before_mutation() {
    let (store, reconciler) = setup();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = reconciler.create(&svc(), &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(store.is_empty());
}
