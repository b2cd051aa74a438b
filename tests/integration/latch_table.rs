//! Ownership-ledger verification: per-thread records, leak detection, and
//! ledger isolation between contexts.

use std::sync::{mpsc, Arc};
use std::thread;

use vesper_latch::{Latch, LatchConfig, LatchContext, LatchTable};

fn verified() -> Arc<LatchContext> {
    LatchContext::new(LatchConfig::new().verify_latches(true))
}

fn table_of(ctx: &Arc<LatchContext>) -> Arc<LatchTable> {
    Arc::clone(ctx.table().expect("verification enabled"))
}

#[test]
fn ledger_tracks_acquire_and_release() {
    let ctx = verified();
    let table = table_of(&ctx);
    let latch = Latch::with_context("L", ctx);

    assert_eq!(table.held_by_current_thread(), 0);
    latch.acquire().unwrap();
    assert_eq!(table.held_by_current_thread(), 1);
    assert_eq!(table.latches_held_by_current_thread(), vec!["L".to_string()]);

    latch.release().unwrap();
    assert_eq!(table.held_by_current_thread(), 0);
    assert!(table.is_empty());
}

#[test]
fn ledger_shows_exactly_the_owning_thread() {
    let ctx = verified();
    let table = table_of(&ctx);
    let latch = Arc::new(Latch::with_context("L", ctx));
    latch.acquire().unwrap();

    let remote_table = Arc::clone(&table);
    thread::spawn(move || {
        assert_eq!(remote_table.held_by_current_thread(), 0);
    })
    .join()
    .unwrap();

    assert_eq!(table.held_by_current_thread(), 1);
    latch.release().unwrap();
}

#[test]
fn leaked_acquire_stays_recorded_after_thread_exit() {
    let ctx = verified();
    let table = table_of(&ctx);
    let latch = Arc::new(Latch::with_context("leaky", ctx));

    {
        let latch = Arc::clone(&latch);
        thread::spawn(move || {
            latch.acquire().unwrap();
            // Exits without releasing: the permanent entry is the point.
        })
        .join()
        .unwrap();
    }

    assert!(!table.is_empty(), "leak must remain visible after exit");
    assert!(table.dump().contains("leaky"), "dump: {}", table.dump());

    // The leaked latch is owned by a dead thread; this thread cannot
    // release it through either variant.
    assert!(latch.release().is_err());
    latch.release_if_owner();
    assert!(!table.is_empty());
}

#[test]
fn failed_try_acquire_records_nothing() {
    let ctx = verified();
    let table = table_of(&ctx);
    let latch = Arc::new(Latch::with_context("busy", ctx));
    let (held_tx, held_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let holder = {
        let latch = Arc::clone(&latch);
        thread::spawn(move || {
            latch.acquire().unwrap();
            held_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            latch.release().unwrap();
        })
    };
    held_rx.recv().unwrap();

    assert!(!latch.try_acquire().unwrap());
    assert_eq!(table.held_by_current_thread(), 0);

    release_tx.send(()).unwrap();
    holder.join().unwrap();
    assert!(table.is_empty());
}

#[test]
fn silent_release_of_unheld_latch_leaves_ledger_consistent() {
    let ctx = verified();
    let table = table_of(&ctx);
    let latch = Latch::with_context("L", ctx);

    latch.release_if_owner();
    assert!(table.is_empty());
}

#[test]
fn contexts_have_isolated_ledgers() {
    let ctx_a = verified();
    let ctx_b = verified();
    let latch = Latch::with_context("A", Arc::clone(&ctx_a));

    latch.acquire().unwrap();
    assert_eq!(table_of(&ctx_a).held_by_current_thread(), 1);
    assert_eq!(table_of(&ctx_b).held_by_current_thread(), 0);
    latch.release().unwrap();
}

#[test]
fn several_latches_held_at_once_are_all_recorded() {
    let ctx = verified();
    let table = table_of(&ctx);
    let first = Latch::with_context("first", Arc::clone(&ctx));
    let second = Latch::with_context("second", Arc::clone(&ctx));

    first.acquire().unwrap();
    second.acquire().unwrap();
    assert_eq!(table.held_by_current_thread(), 2);
    let mut names = table.latches_held_by_current_thread();
    names.sort();
    assert_eq!(names, vec!["first".to_string(), "second".to_string()]);

    second.release().unwrap();
    first.release().unwrap();
    assert!(table.is_empty());
}
