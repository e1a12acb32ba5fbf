use super::*;
use crate::connection::TargetDb;
use std::sync::mpsc;
use std::thread;

fn lock() -> MigrationLock {
    MigrationLock::new("tidemark_lock").with_poll_interval(Duration::from_millis(10))
}

#[test]
fn test_acquire_and_release() {
    let db = TargetDb::open_memory().unwrap();
    let lock = lock();

    let guard = lock.acquire(db.conn(), "a", Duration::ZERO).unwrap();
    assert_eq!(guard.owner(), "a");
    assert_eq!(lock.holder(db.conn()).unwrap().unwrap().owner, "a");

    guard.release().unwrap();
    assert!(lock.holder(db.conn()).unwrap().is_none());
}

#[test]
fn test_holder_without_table() {
    let db = TargetDb::open_memory().unwrap();
    assert!(lock().holder(db.conn()).unwrap().is_none());
    assert!(!lock().force_unlock(db.conn()).unwrap());
}

#[test]
fn test_drop_releases() {
    let db = TargetDb::open_memory().unwrap();
    let lock = lock();
    {
        let _guard = lock.acquire(db.conn(), "a", Duration::ZERO).unwrap();
    }
    assert!(lock.holder(db.conn()).unwrap().is_none());
    assert!(lock.try_acquire(db.conn(), "b").unwrap());
}

#[test]
fn test_zero_timeout_fails_fast_naming_holder() {
    let db = TargetDb::open_memory().unwrap();
    let other = db.try_clone().unwrap();
    let lock = lock();

    let _held = lock.acquire(db.conn(), "first", Duration::ZERO).unwrap();
    let started = Instant::now();
    let result = lock.acquire(other.conn(), "second", Duration::ZERO);
    assert!(started.elapsed() < Duration::from_secs(1));
    match result {
        Err(DbError::LockContention { holder, .. }) => assert_eq!(holder, "first"),
        Err(e) => panic!("expected lock contention, got {e}"),
        Ok(_) => panic!("expected lock contention"),
    }
}

#[test]
fn test_timeout_expires_while_held() {
    let db = TargetDb::open_memory().unwrap();
    let lock = lock();
    let _held = lock.acquire(db.conn(), "first", Duration::ZERO).unwrap();

    let started = Instant::now();
    let result = lock.acquire(db.conn(), "second", Duration::from_millis(80));
    assert!(matches!(result, Err(DbError::LockContention { .. })));
    assert!(started.elapsed() >= Duration::from_millis(80));
}

#[test]
fn test_waiter_acquires_after_release() {
    let db = TargetDb::open_memory().unwrap();
    let waiter_db = db.try_clone().unwrap();
    let lock = lock();
    let held = lock.acquire(db.conn(), "first", Duration::ZERO).unwrap();

    let (tx, rx) = mpsc::channel();
    let waiter_lock = lock.clone();
    let handle = thread::spawn(move || {
        tx.send(()).unwrap();
        let guard = waiter_lock
            .acquire(waiter_db.conn(), "second", Duration::from_secs(10))
            .unwrap();
        guard.owner().to_string()
    });

    rx.recv().unwrap();
    thread::sleep(Duration::from_millis(50));
    held.release().unwrap();

    assert_eq!(handle.join().unwrap(), "second");
}

#[test]
fn test_release_by_non_owner_is_noop() {
    let db = TargetDb::open_memory().unwrap();
    let lock = lock();
    let _held = lock.acquire(db.conn(), "first", Duration::ZERO).unwrap();

    assert!(!lock.release(db.conn(), "intruder").unwrap());
    assert_eq!(lock.holder(db.conn()).unwrap().unwrap().owner, "first");
}

#[test]
fn test_force_unlock_clears_stale_holder() {
    let db = TargetDb::open_memory().unwrap();
    let lock = lock();
    let guard = lock.acquire(db.conn(), "crashed", Duration::ZERO).unwrap();
    // simulate a process that died without releasing
    std::mem::forget(guard);

    assert!(lock.force_unlock(db.conn()).unwrap());
    assert!(!lock.force_unlock(db.conn()).unwrap());
    assert!(lock.try_acquire(db.conn(), "next").unwrap());
}

#[test]
fn test_schema_qualified_lock_table() {
    let db = TargetDb::open_memory().unwrap();
    let lock = MigrationLock::new("ops.run_lock");
    let _guard = lock.acquire(db.conn(), "a", Duration::ZERO).unwrap();
    assert!(db.relation_exists("ops.run_lock").unwrap());
}

#[test]
fn test_owner_ids_are_unique() {
    let a = new_owner_id();
    let b = new_owner_id();
    assert_ne!(a, b);
    assert!(a.starts_with(&format!("{}:", std::process::id())));
}
