/*!
 * Shared-Cache Integration Tests
 *
 * Real SQLite connections contending on one shared cache
 */

use libsqlite3_sys as ffi;
use sqlite_unlock_notify::{Conn, NotifyConfig, RetryStats};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const HOLD: Duration = Duration::from_millis(200);

fn memory_uri(name: &str) -> String {
    format!("file:{}?mode=memory&cache=shared", name)
}

/// Writer with an open write transaction on `t`
fn locked_writer(uri: &str) -> Conn {
    let writer = Conn::open_shared(uri).unwrap();
    writer.execute("CREATE TABLE t (v INTEGER)").unwrap();
    writer.execute("INSERT INTO t VALUES (1)").unwrap();
    writer.execute("BEGIN IMMEDIATE").unwrap();
    writer.execute("INSERT INTO t VALUES (2)").unwrap();
    writer
}

#[test]
fn test_step_blocks_until_commit() {
    let uri = memory_uri("shared_step_blocks_until_commit");
    let writer = locked_writer(&uri);

    let (ready_tx, ready_rx) = mpsc::channel();
    let reader_uri = uri.clone();
    let handle = thread::spawn(move || {
        let reader = Conn::open_shared(&reader_uri)
            .unwrap()
            .with_config(NotifyConfig::bounded(Duration::from_secs(10)));
        ready_tx.send(()).unwrap();

        let start = Instant::now();
        let mut stmt = reader.prepare("SELECT count(*) FROM t").unwrap();
        assert!(stmt.step().unwrap());
        (stmt.column_i64(0), start.elapsed())
    });

    ready_rx.recv().unwrap();
    thread::sleep(HOLD);
    writer.execute("COMMIT").unwrap();

    let (count, elapsed) = handle.join().unwrap();
    assert_eq!(count, 2);
    assert!(elapsed >= HOLD / 2, "reader returned after {:?}", elapsed);
}

#[test]
fn test_rusqlite_closure_waits_for_rollback() {
    let uri = memory_uri("shared_closure_waits_for_rollback");
    let writer = locked_writer(&uri);

    let (ready_tx, ready_rx) = mpsc::channel();
    let reader_uri = uri.clone();
    let handle = thread::spawn(move || -> (i64, RetryStats) {
        let reader = Conn::open_shared(&reader_uri).unwrap();
        ready_tx.send(()).unwrap();

        let (count, stats) = reader.run_with_stats(|| {
            reader
                .connection()
                .query_row("SELECT count(*) FROM t", [], |row| row.get::<_, i64>(0))
        });
        (count.unwrap(), stats)
    });

    ready_rx.recv().unwrap();
    thread::sleep(HOLD);
    writer.execute("ROLLBACK").unwrap();

    let (count, stats) = handle.join().unwrap();
    assert_eq!(count, 1);
    assert!(stats.wait_cycles >= 1, "{:?}", stats);
    assert_eq!(stats.attempts, stats.wait_cycles + 1);
}

#[test]
fn test_bounded_wait_times_out_then_recovers() {
    let uri = memory_uri("shared_bounded_wait_times_out");
    let writer = locked_writer(&uri);
    let reader = Conn::open_shared(&uri)
        .unwrap()
        .with_config(NotifyConfig::bounded(Duration::from_millis(50)));

    let mut stmt = reader.prepare("SELECT count(*) FROM t").unwrap();
    let start = Instant::now();
    let err = stmt.step().unwrap_err();

    assert!(err.is_timeout(), "unexpected error: {}", err);
    assert!(start.elapsed() >= Duration::from_millis(50));

    writer.execute("COMMIT").unwrap();

    assert!(stmt.step().unwrap());
    assert_eq!(stmt.column_i64(0), 2);
}

#[test]
fn test_same_connection_lock_is_not_waited_on() {
    let uri = memory_uri("shared_same_connection_lock");
    let conn = Conn::open_shared(&uri).unwrap();
    conn.execute("CREATE TABLE t (v INTEGER)").unwrap();
    conn.execute("INSERT INTO t VALUES (1), (2)").unwrap();

    let mut select = conn.prepare("SELECT v FROM t").unwrap();
    assert!(select.step().unwrap());

    // The pending read belongs to this very connection; waiting would hang
    let start = Instant::now();
    let err = conn.execute("DROP TABLE t").unwrap_err();

    let code = err.operation().copied().unwrap();
    assert_eq!(code.primary(), ffi::SQLITE_LOCKED);
    assert!(!code.is_locked_sharedcache());
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_on_disk_shared_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");
    let writer = locked_writer(path.to_str().unwrap());

    let (ready_tx, ready_rx) = mpsc::channel();
    let reader_path = path.clone();
    let handle = thread::spawn(move || {
        let reader = Conn::open_shared(&reader_path).unwrap();
        ready_tx.send(()).unwrap();
        let mut stmt = reader.prepare("SELECT sum(v) FROM t").unwrap();
        assert!(stmt.step().unwrap());
        stmt.column_i64(0)
    });

    ready_rx.recv().unwrap();
    thread::sleep(HOLD);
    writer.execute("COMMIT").unwrap();

    assert_eq!(handle.join().unwrap(), 3);
}
