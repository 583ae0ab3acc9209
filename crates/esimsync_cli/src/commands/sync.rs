//! Sync command implementation.

use esimsync_engine::{CycleStatus, SyncCycleResult};
use std::path::Path;
use std::time::Duration;

/// Runs one sync cycle, or keeps syncing in watch mode.
pub async fn run(
    store_path: &Path,
    endpoints: Vec<String>,
    watch: bool,
    interval_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = super::open_service(store_path, endpoints)?;

    if !watch {
        let result = service.orchestrator().run_sync().await;
        print_result(&result);
        return Ok(());
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    println!("Syncing every {interval_secs}s, Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let result = service.orchestrator().run_sync().await;
                print_result(&result);
            }
        }
    }
    service.dispose();

    let stats = service.orchestrator().stats();
    println!(
        "Done: {} cycles, {} deferred, {} partial failures",
        stats.cycles_completed, stats.cycles_deferred, stats.partial_failures
    );
    Ok(())
}

fn print_result(result: &SyncCycleResult) {
    match result.status {
        CycleStatus::Deferred => println!("deferred: no reachable endpoint"),
        CycleStatus::Skipped => println!("skipped: a cycle was already running"),
        CycleStatus::Completed => {
            println!(
                "completed in {:?}: users {}↓ {}↑, esims {}↓",
                result.duration, result.users.pulled, result.users.pushed, result.esims.pulled
            );
            for failure in result.users.failures.iter().chain(&result.esims.failures) {
                println!("  partial failure: {failure}");
            }
        }
    }
}
