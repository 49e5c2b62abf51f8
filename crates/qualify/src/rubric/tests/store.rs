use super::common::*;
use crate::rubric::{
    ActivationRecord, ChangeType, ConfigHistoryEntry, ConfigurationConflictError, ConfigurationId, ConfigurationRepository,
    ConfigurationStatus, ConfigurationStore, MemoryConfigurationRepository, OrganizationId,
    RepositoryError, StoreError, ValidationIssue, WeightPolicy,
};
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Barrier};
use std::thread;

fn record_activation(change: &ActivationRecord) -> ConfigHistoryEntry {
    ConfigHistoryEntry::activation(change, &actor(), Utc::now())
}

#[test]
fn save_assigns_monotonic_versions_and_leaves_them_inactive() {
    let (store, _) = build_store();
    let org = organization();

    let first = store
        .save_configuration(&org, definition(), &actor(), None)
        .expect("first save");
    let second = store
        .save_configuration(&org, definition(), &actor(), Some("tweak".to_string()))
        .expect("second save");

    assert_eq!(first.version, 1);
    assert_eq!(second.version, 2);
    assert_eq!(second.configuration_id, ConfigurationId::new("org-acme:v2"));

    let versions = store.list_versions(&org).expect("versions");
    assert!(versions
        .iter()
        .all(|config| config.status() == ConfigurationStatus::Draft));
    assert!(matches!(
        store.get_active_configuration(&org),
        Err(StoreError::NoActiveConfiguration { .. })
    ));
}

#[test]
fn versions_are_numbered_per_organization() {
    let (store, _) = build_store();
    let other = OrganizationId::new("org-globex");

    store
        .save_configuration(&organization(), definition(), &actor(), None)
        .expect("save acme");
    let saved = store
        .save_configuration(&other, definition(), &actor(), None)
        .expect("save globex");

    assert_eq!(saved.version, 1);
}

#[test]
fn save_rejects_invalid_definitions_before_persisting() {
    let (store, repository) = build_store();
    let org = organization();
    let mut invalid = definition();
    invalid.thresholds.medium = invalid.thresholds.low;

    match store.save_configuration(&org, invalid, &actor(), None) {
        Err(StoreError::Validation(error)) => {
            assert!(matches!(
                error.issues.as_slice(),
                [ValidationIssue::ThresholdsNotDecreasing { .. }]
            ));
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    assert!(repository.versions(&org).expect("versions").is_empty());
    assert!(repository.history(&org).expect("history").is_empty());
}

#[test]
fn draft_policy_allows_partial_weights() {
    let repository = Arc::new(MemoryConfigurationRepository::new());
    let store = ConfigurationStore::new(repository, WeightPolicy::DraftAllowed);
    let mut partial = definition();
    partial.pillars.pop();

    let saved = store
        .save_configuration(&organization(), partial, &actor(), None)
        .expect("draft policy accepts 75 of 100");
    assert_eq!(saved.version, 1);
}

#[test]
fn activating_new_version_supersedes_previous_and_records_history() {
    let (store, repository) = build_store();
    let org = organization();
    store
        .save_configuration(&org, definition(), &actor(), None)
        .expect("save v1");
    store
        .activate_configuration(&org, 1, &actor())
        .expect("activate v1");
    let mut edited = definition();
    edited.pillars[0].weight = 45.0;
    edited.pillars[2].weight = 20.0;
    store
        .save_configuration(&org, edited, &actor(), None)
        .expect("save v2");

    let activated = store
        .activate_configuration(&org, 2, &actor())
        .expect("activate v2");

    assert!(activated.is_active);
    let v1 = store.get_configuration(&org, 1).expect("v1 present");
    assert!(!v1.is_active);
    assert_eq!(v1.status(), ConfigurationStatus::Superseded);
    assert_eq!(active_count(repository.as_ref(), &org), 1);

    let history = store.get_history(&org, None).expect("history");
    let latest = &history[0];
    assert_eq!(latest.change_type, ChangeType::Activated);
    assert_eq!(latest.previous_version, Some(1));
    assert_eq!(latest.new_version, 2);
    assert_eq!(latest.diff.weights_changed.len(), 2);
    assert_eq!(latest.before.as_ref().map(|config| config.version), Some(1));
    assert_eq!(latest.actor_id, actor());
}

#[test]
fn activating_the_active_version_is_a_no_op() {
    let (store, _) = build_store();
    let org = organization();
    store
        .save_configuration(&org, definition(), &actor(), None)
        .expect("save");
    store.activate_configuration(&org, 1, &actor()).expect("activate");

    let again = store
        .activate_configuration(&org, 1, &actor())
        .expect("re-activation succeeds");

    assert!(again.is_active);
    let activations = store
        .get_history(&org, None)
        .expect("history")
        .into_iter()
        .filter(|entry| entry.change_type == ChangeType::Activated)
        .count();
    assert_eq!(activations, 1);
}

#[test]
fn activating_unknown_version_reports_not_found() {
    let (store, _) = build_store();
    let org = organization();
    store
        .save_configuration(&org, definition(), &actor(), None)
        .expect("save");

    match store.activate_configuration(&org, 9, &actor()) {
        Err(err @ StoreError::VersionNotFound { version: 9, .. }) => {
            assert!(err.is_not_found());
            assert!(!err.is_retryable());
        }
        other => panic!("expected missing version, got {other:?}"),
    }
}

#[test]
fn concurrent_activations_leave_exactly_one_active_version() {
    let org = organization();
    let repository = Arc::new(RacingRepository {
        inner: MemoryConfigurationRepository::new(),
        barrier: Barrier::new(2),
    });
    let store = ConfigurationStore::new(repository.clone(), WeightPolicy::default());
    for _ in 0..3 {
        store
            .save_configuration(&org, definition(), &actor(), None)
            .expect("save");
    }
    repository
        .inner
        .activate(&org, 1, None, Utc::now(), record_activation)
        .expect("seed v1 active");

    let results = thread::scope(|scope| {
        let handles: Vec<_> = [2u32, 3u32]
            .into_iter()
            .map(|version| {
                let store = &store;
                let org = &org;
                scope.spawn(move || store.activate_configuration(org, version, &actor()))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("activation thread"))
            .collect::<Vec<_>>()
    });

    let successes = results.iter().filter(|result| result.is_ok()).count();
    let conflicts: Vec<&ConfigurationConflictError> = results
        .iter()
        .filter_map(|result| match result {
            Err(StoreError::Conflict(conflict)) => Some(conflict),
            _ => None,
        })
        .collect();

    assert_eq!(successes, 1);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].expected_active, Some(1));
    assert_eq!(active_count(&repository.inner, &org), 1);

    let activations = store
        .get_history(&org, None)
        .expect("history")
        .into_iter()
        .filter(|entry| entry.change_type == ChangeType::Activated)
        .count();
    assert_eq!(activations, 1);
}

#[test]
fn repository_compare_and_set_admits_a_single_winner() {
    let (store, repository) = build_store();
    let org = organization();
    for _ in 0..6 {
        store
            .save_configuration(&org, definition(), &actor(), None)
            .expect("save");
    }
    repository
        .activate(&org, 1, None, Utc::now(), record_activation)
        .expect("seed v1 active");

    let outcomes = thread::scope(|scope| {
        let handles: Vec<_> = (2u32..=6)
            .map(|version| {
                let repository = repository.clone();
                let org = org.clone();
                scope.spawn(move || {
                    repository.activate(&org, version, Some(1), Utc::now(), record_activation)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .collect::<Vec<_>>()
    });

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .all(|err| *err == RepositoryError::Conflict));
    assert_eq!(active_count(repository.as_ref(), &org), 1);
}

#[test]
fn restore_creates_new_version_from_old_snapshot() {
    let (store, _) = build_store();
    let org = organization();
    store
        .save_configuration(&org, definition(), &actor(), None)
        .expect("save v1");
    let mut edited = definition();
    edited.thresholds.low = 80.0;
    store
        .save_configuration(&org, edited, &actor(), None)
        .expect("save v2");

    let restored = store
        .restore_configuration(&org, 1, &actor(), Some("revert thresholds".to_string()))
        .expect("restore");

    assert_eq!(restored.version, 3);
    let v3 = store.get_configuration(&org, 3).expect("v3");
    let v1 = store.get_configuration(&org, 1).expect("v1");
    assert_eq!(v3.pillars, v1.pillars);
    assert_eq!(v3.thresholds, v1.thresholds);
    assert_eq!(v3.restored_from, Some(1));
    assert_eq!(v3.status(), ConfigurationStatus::Draft);

    let history = store.get_history(&org, None).expect("history");
    assert_eq!(history[0].change_type, ChangeType::RolledBack);
    assert_eq!(history[0].previous_version, Some(2));
    assert_eq!(history[0].new_version, 3);
    assert!(history[0].diff.thresholds.is_some());
    assert_eq!(history[0].reason.as_deref(), Some("revert thresholds"));
}

#[test]
fn history_is_newest_first_and_filters_by_configuration() {
    let (store, _) = build_store();
    let org = organization();
    let first = store
        .save_configuration(&org, definition(), &actor(), None)
        .expect("save v1");
    store.activate_configuration(&org, 1, &actor()).expect("activate v1");
    store
        .save_configuration(&org, definition(), &actor(), None)
        .expect("save v2");

    let history = store.get_history(&org, None).expect("history");
    let versions: Vec<_> = history
        .iter()
        .map(|entry| (entry.change_type, entry.new_version))
        .collect();
    assert_eq!(
        versions,
        vec![
            (ChangeType::Created, 2),
            (ChangeType::Activated, 1),
            (ChangeType::Created, 1)
        ]
    );

    let filtered = store
        .get_history(&org, Some(&first.configuration_id))
        .expect("filtered history");
    assert_eq!(filtered.len(), 2);
    assert!(filtered
        .iter()
        .all(|entry| entry.configuration_id == first.configuration_id));
}

#[test]
fn infrastructure_failures_are_distinct_and_retryable() {
    let store = ConfigurationStore::new(Arc::new(UnavailableRepository), WeightPolicy::default());

    match store.save_configuration(&organization(), definition(), &actor(), None) {
        Err(err @ StoreError::Infrastructure(RepositoryError::Unavailable(_))) => {
            assert!(err.is_retryable());
        }
        other => panic!("expected infrastructure error, got {other:?}"),
    }

    assert!(matches!(
        store.get_active_configuration(&organization()),
        Err(StoreError::Infrastructure(_))
    ));
}

#[test]
fn superseded_version_cannot_be_reactivated() {
    let (store, _) = build_store();
    let org = organization();
    for _ in 0..2 {
        store
            .save_configuration(&org, definition(), &actor(), None)
            .expect("save");
    }
    store.activate_configuration(&org, 1, &actor()).expect("activate v1");
    store.activate_configuration(&org, 2, &actor()).expect("activate v2");

    match store.activate_configuration(&org, 1, &actor()) {
        Err(err @ StoreError::SupersededVersion { version: 1, .. }) => {
            assert!(!err.is_retryable());
            assert!(!err.is_not_found());
        }
        other => panic!("expected superseded version error, got {other:?}"),
    }

    let active = store.get_active_configuration(&org).expect("active");
    assert_eq!(active.version, 2);

    let restored = store
        .restore_configuration(&org, 1, &actor(), None)
        .expect("restore v1");
    let activated = store
        .activate_configuration(&org, restored.version, &actor())
        .expect("restored copy activates");
    assert_eq!(activated.restored_from, Some(1));
}

#[test]
fn activation_without_audit_entry_is_never_committed() {
    let org = organization();
    let repository = Arc::new(AuditOutageRepository::default());
    let store = ConfigurationStore::new(repository.clone(), WeightPolicy::default());
    store
        .save_configuration(&org, definition(), &actor(), None)
        .expect("save v1");

    repository.audit_offline.store(true, Ordering::SeqCst);
    let err = store
        .activate_configuration(&org, 1, &actor())
        .expect_err("activation fails while the audit log is offline");
    assert!(matches!(err, StoreError::Infrastructure(_)));
    assert!(err.is_retryable());
    assert!(matches!(
        store.get_active_configuration(&org),
        Err(StoreError::NoActiveConfiguration { .. })
    ));
    assert!(store
        .save_configuration(&org, definition(), &actor(), None)
        .is_err());
    assert_eq!(store.list_versions(&org).expect("versions").len(), 1);

    repository.audit_offline.store(false, Ordering::SeqCst);
    store
        .activate_configuration(&org, 1, &actor())
        .expect("retry activates");

    let history = store.get_history(&org, None).expect("history");
    let changes: Vec<_> = history.iter().map(|entry| entry.change_type).collect();
    assert_eq!(changes, vec![ChangeType::Activated, ChangeType::Created]);
}

#[test]
fn concurrent_saves_chain_previous_versions() {
    let (store, _) = build_store();
    let org = organization();
    store
        .save_configuration(&org, definition(), &actor(), None)
        .expect("save v1");

    let barrier = Barrier::new(4);
    thread::scope(|scope| {
        for _ in 0..4 {
            let (store, org, barrier) = (&store, &org, &barrier);
            scope.spawn(move || {
                barrier.wait();
                store
                    .save_configuration(org, definition(), &actor(), None)
                    .expect("concurrent save");
            });
        }
    });

    let history = store.get_history(&org, None).expect("history");
    assert_eq!(history.len(), 5);
    for entry in &history {
        let expected_previous = entry.new_version.checked_sub(1).filter(|version| *version > 0);
        assert_eq!(entry.previous_version, expected_previous);
        assert_eq!(
            entry.before.as_ref().map(|config| config.version),
            expected_previous
        );
    }
}
