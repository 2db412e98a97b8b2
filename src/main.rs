/*!
 * Unlock-Notify Demo
 *
 * Two connections share one in-memory cache:
 * - the writer opens a write transaction and holds it
 * - a reader thread queries the same table and blocks on the unlock
 *   notification instead of failing with SQLITE_LOCKED_SHAREDCACHE
 * - the writer commits and the reader resumes
 *
 * Environment variables:
 * - DEMO_HOLD_MS: how long the writer holds its transaction (default: 250)
 * - RUST_LOG / UNLOCK_NOTIFY_TRACE_JSON: tracing output
 */

use anyhow::{anyhow, Context, Result};
use sqlite_unlock_notify::{init_tracing, Conn, RetryStats};
use std::thread;
use std::time::Duration;
use tracing::info;

const DEMO_URI: &str = "file:unlock_notify_demo?mode=memory&cache=shared";

fn main() -> Result<()> {
    init_tracing();

    let hold = std::env::var("DEMO_HOLD_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(250));

    let writer = Conn::open_shared(DEMO_URI).context("Failed to open writer connection")?;
    writer.execute("CREATE TABLE events (id INTEGER PRIMARY KEY, note TEXT)")?;
    writer.execute("INSERT INTO events (note) VALUES ('committed')")?;

    writer.execute("BEGIN IMMEDIATE")?;
    writer.execute("INSERT INTO events (note) VALUES ('pending')")?;
    info!(hold_ms = hold.as_millis() as u64, "Writer holding write transaction");

    let reader = thread::Builder::new()
        .name("reader".into())
        .spawn(move || -> Result<(i64, RetryStats)> {
            let reader = Conn::open_shared(DEMO_URI).context("Failed to open reader connection")?;
            let (count, stats) = reader.run_with_stats(|| {
                reader
                    .connection()
                    .query_row("SELECT count(*) FROM events", [], |row| row.get::<_, i64>(0))
            });
            Ok((count?, stats))
        })
        .context("Failed to spawn reader thread")?;

    thread::sleep(hold);
    info!("Committing writer transaction");
    writer.execute("COMMIT")?;

    let (count, stats) = reader
        .join()
        .map_err(|_| anyhow!("Reader thread panicked"))??;

    info!(
        rows = count,
        attempts = stats.attempts,
        wait_cycles = stats.wait_cycles,
        "Reader finished"
    );
    println!("{}", stats.to_json()?);

    Ok(())
}
