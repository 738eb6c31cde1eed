//! Polls a simulated service and prints every value the engine publishes.
//!
//! Run with `API_POLLING_LOG_MODE=debug` to see each issued, settled and
//! discarded attempt.

use api_polling::logging::init_logging_from_env;
use api_polling::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum Health {
    Unknown,
    Up { region: &'static str, load: u32 },
    Degraded(String),
}

#[derive(Debug)]
struct ServiceError(String);

/// Pretend endpoint: every fourth call fails, and the "eu" region is slow
fn health_check(
    region: &'static str,
    counter: Arc<AtomicU32>,
) -> PollingOptions<Health, ServiceError, &'static str> {
    let latency = if region == "eu" { 400 } else { 50 };

    PollingOptions::new(
        move || {
            let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                tokio::time::sleep(Duration::from_millis(latency)).await;
                if call % 4 == 0 {
                    Err(ServiceError(format!("{} timed out on call {}", region, call)))
                } else {
                    Ok(Health::Up {
                        region,
                        load: (call * 17) % 100,
                    })
                }
            }
        },
        Health::Unknown,
    )
    .with_config(PollingConfig::fast())
    .on_error(|e: ServiceError, set| set.set(Health::Degraded(e.0)))
    .with_trigger(region)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env()?;

    let calls = Arc::new(AtomicU32::new(0));
    let engine = PollingEngine::new(health_check("eu", Arc::clone(&calls)));
    let mut watcher = engine.watch();

    let printer = tokio::spawn(async move {
        while let Some(health) = watcher.changed().await {
            println!("[v{}] {:?}", watcher.version(), health);
        }
    });

    {
        let _mounted = engine.mount()?;

        tokio::time::sleep(Duration::from_millis(200)).await;
        // Switch region while the slow "eu" attempt is still in flight;
        // its result will be discarded when it lands.
        engine.reconcile(health_check("us", Arc::clone(&calls)))?;

        tokio::time::sleep(Duration::from_secs(3)).await;
        println!("{}", engine.stats());
    }

    println!("Unmounted; final value: {:?}", engine.read());
    drop(engine);
    printer.await?;

    Ok(())
}
