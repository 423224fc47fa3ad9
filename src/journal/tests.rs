use super::*;
use crate::locks::{CompareMask, IdentityFactory};
use crate::test_support::{seed_journal, temp_dir, write_tokens};
use std::fs;
use std::path::PathBuf;

fn held_guard(journal_path: &Path, factory: &IdentityFactory) -> ResourceLock {
    let mut guard = ResourceLock::new(journal_path, factory).with_mask(CompareMask::ALL);
    assert!(guard.try_lock(false, CompareMask::ALL).unwrap());
    guard
}

fn open(journal_path: &Path, factory: &IdentityFactory) -> Journal {
    Journal::load(held_guard(journal_path, factory))
        .unwrap()
        .unwrap()
}

fn seeded(count: usize) -> (tempfile::TempDir, PathBuf) {
    let temp = temp_dir();
    let journal_path = seed_journal(temp.path(), count);
    (temp, journal_path)
}

#[test]
fn test_entry_json_field_names() {
    let entry = ResourceEntry {
        in_use: true,
        owner: Some("ci@BUILD-01".to_string()),
        file_name: Some("uploader1.vdf".to_string()),
    };

    let value = serde_json::to_value(&entry).unwrap();

    assert_eq!(value["inUse"], true);
    assert_eq!(value["username"], "ci@BUILD-01");
    assert_eq!(value["tokenFileName"], "uploader1.vdf");
}

#[test]
fn test_entry_missing_fields_default() {
    let entries: Vec<ResourceEntry> =
        serde_json::from_str(r#"[{"tokenFileName": "a.vdf"}, {}]"#).unwrap();

    assert_eq!(entries[0], ResourceEntry::available("a.vdf"));
    assert_eq!(entries[1], ResourceEntry::default());
}

#[test]
fn test_seed_from_dir_lists_tokens() {
    let temp = temp_dir();
    write_tokens(temp.path(), 2);
    fs::write(temp.path().join("readme.txt"), "x").unwrap();

    let entries = Journal::seed_from_dir(temp.path(), "vdf").unwrap();

    assert_eq!(
        entries,
        vec![
            ResourceEntry::available("uploader1.vdf"),
            ResourceEntry::available("uploader2.vdf"),
        ]
    );
}

#[test]
fn test_load_requires_guard() {
    let (_temp, journal_path) = seeded(1);
    let factory = IdentityFactory::with_host("host-a");
    let guard = ResourceLock::new(&journal_path, &factory).with_mask(CompareMask::ALL);

    let err = Journal::load(guard).unwrap_err();

    assert!(matches!(err, TokenError::GuardNotHeld(_)));
}

#[test]
fn test_load_invalid_json_returns_none_and_releases_guard() {
    let (_temp, journal_path) = seeded(1);
    fs::write(&journal_path, "{\"inUse\": true}").unwrap();
    let factory = IdentityFactory::with_host("host-a");

    let loaded = Journal::load(held_guard(&journal_path, &factory)).unwrap();

    assert!(loaded.is_none());
    assert!(!ResourceLock::marker_path_for(&journal_path).exists());
}

#[test]
fn test_create_requires_guard() {
    let temp = temp_dir();
    let factory = IdentityFactory::with_host("host-a");
    let guard = ResourceLock::new(temp.path().join(JOURNAL_FILE_NAME), &factory);

    let err = Journal::create(guard, Vec::new()).unwrap_err();

    assert!(matches!(err, TokenError::GuardNotHeld(_)));
}

#[test]
fn test_save_round_trips_entries() {
    let (_temp, journal_path) = seeded(2);
    let factory = IdentityFactory::with_host("host-a");

    let mut journal = open(&journal_path, &factory);
    journal.try_acquire_entry(&CheckoutCriteria::any(), "ci@host-a");
    assert!(journal.save().unwrap());
    journal.into_guard().unlock(false, CompareMask::ALL).unwrap();

    let reloaded = open(&journal_path, &factory);
    assert!(reloaded.entries()[0].in_use);
    assert_eq!(reloaded.entries()[0].owner.as_deref(), Some("ci@host-a"));
    assert!(!reloaded.entries()[1].in_use);
}

#[test]
fn test_save_after_guard_stolen_leaves_file_untouched() {
    let (_temp, journal_path) = seeded(1);
    let before = fs::read_to_string(&journal_path).unwrap();
    let factory_a = IdentityFactory::with_host("host-a");
    let factory_b = IdentityFactory::with_host("host-b");

    let mut journal = open(&journal_path, &factory_a);
    journal.try_acquire_entry(&CheckoutCriteria::any(), "ci@host-a");

    let mut thief = ResourceLock::new(&journal_path, &factory_b).with_mask(CompareMask::ALL);
    assert!(thief.try_lock(true, CompareMask::ALL).unwrap());

    assert!(!journal.save().unwrap());
    assert_eq!(fs::read_to_string(&journal_path).unwrap(), before);
}

#[test]
fn test_acquire_any_takes_first_free() {
    let (_temp, journal_path) = seeded(3);
    let factory = IdentityFactory::with_host("host-a");
    let mut journal = open(&journal_path, &factory);

    let first = journal.try_acquire_entry(&CheckoutCriteria::any(), "one");
    let second = journal.try_acquire_entry(&CheckoutCriteria::any(), "two");

    assert_eq!(first, Some(("uploader1.vdf".to_string(), 0)));
    assert_eq!(second, Some(("uploader2.vdf".to_string(), 1)));
}

#[test]
fn test_acquire_any_ignores_force_and_exhausts() {
    let (_temp, journal_path) = seeded(1);
    let factory = IdentityFactory::with_host("host-a");
    let mut journal = open(&journal_path, &factory);
    journal.try_acquire_entry(&CheckoutCriteria::any(), "one");

    let forced_any = CheckoutCriteria {
        specific: None,
        force: true,
    };

    assert_eq!(journal.try_acquire_entry(&forced_any, "two"), None);
    assert_eq!(journal.entries()[0].owner.as_deref(), Some("one"));
}

#[test]
fn test_acquire_specific_respects_force() {
    let (_temp, journal_path) = seeded(2);
    let factory = IdentityFactory::with_host("host-a");
    let mut journal = open(&journal_path, &factory);

    let taken = journal.try_acquire_entry(&CheckoutCriteria::specific("uploader2.vdf", false), "one");
    assert_eq!(taken, Some(("uploader2.vdf".to_string(), 1)));

    assert_eq!(
        journal.try_acquire_entry(&CheckoutCriteria::specific("uploader2.vdf", false), "two"),
        None
    );
    assert_eq!(
        journal.try_acquire_entry(&CheckoutCriteria::specific("uploader2.vdf", true), "two"),
        Some(("uploader2.vdf".to_string(), 1))
    );
    assert_eq!(journal.entries()[1].owner.as_deref(), Some("two"));
    assert_eq!(
        journal.try_acquire_entry(&CheckoutCriteria::specific("missing.vdf", true), "two"),
        None
    );
}

#[test]
fn test_release_entry_checks_owner() {
    let (_temp, journal_path) = seeded(1);
    let factory = IdentityFactory::with_host("host-a");
    let mut journal = open(&journal_path, &factory);
    journal.try_acquire_entry(&CheckoutCriteria::any(), "one");

    assert!(!journal.release_entry("uploader1.vdf", Some("two")));
    assert!(journal.entry_owned_by("uploader1.vdf", "one"));

    assert!(journal.release_entry("uploader1.vdf", Some("one")));
    assert!(!journal.entry_owned_by("uploader1.vdf", "one"));
    assert!(!journal.release_entry("uploader1.vdf", None));
}

#[test]
fn test_release_entry_without_owner_clears_any_claim() {
    let (_temp, journal_path) = seeded(1);
    let factory = IdentityFactory::with_host("host-a");
    let mut journal = open(&journal_path, &factory);
    journal.try_acquire_entry(&CheckoutCriteria::any(), "one");

    assert!(journal.release_entry("uploader1.vdf", None));
    assert_eq!(journal.entries()[0], ResourceEntry::available("uploader1.vdf"));
}

#[test]
fn test_merge_entries_adds_only_new_files() {
    let (_temp, journal_path) = seeded(2);
    let factory = IdentityFactory::with_host("host-a");
    let mut journal = open(&journal_path, &factory);
    journal.try_acquire_entry(&CheckoutCriteria::any(), "one");

    let added = journal.merge_entries(vec![
        ResourceEntry::available("uploader1.vdf"),
        ResourceEntry::available("uploader3.vdf"),
    ]);

    assert_eq!(added, 1);
    assert_eq!(journal.entries().len(), 3);
    assert!(journal.entries()[0].in_use);
    assert_eq!(journal.entries()[2].file_name.as_deref(), Some("uploader3.vdf"));
}
