use futures::future::join_all;
use request_coordinator::{CacheConfig, MockBackend, RateLimiter, UserService};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let cache_config = CacheConfig::new(
        Duration::from_secs(60), // entries stay fresh for a minute after the last read
        100,                     // at most 100 users resident
        Duration::from_secs(5),  // sweep stale entries every 5 seconds
    );
    let service = UserService::new(Arc::new(MockBackend::new()), cache_config);
    let sweeper = service.spawn_cache_sweeper();

    println!("=== Cold read ===");
    let start = Instant::now();
    let user = service.get_user(1).await?;
    println!("Fetched {:?} in {:?}", user, start.elapsed());

    println!("\n=== Cached read ===");
    let start = Instant::now();
    let user = service.get_user(1).await?;
    println!("Fetched {:?} in {:?}", user, start.elapsed());

    println!("\n=== Ten concurrent reads of one id ===");
    let start = Instant::now();
    let results = join_all((0..10).map(|_| service.get_user(2))).await;
    println!(
        "{} results in {:?} (one backend call)",
        results.len(),
        start.elapsed()
    );

    println!("\n=== Rate limiting one client ===");
    let limiter = RateLimiter::default();
    for n in 1..=12 {
        let decision = limiter.check_limit("127.0.0.1");
        println!("request {:>2}: {:?}", n, decision);
    }

    println!("\nCache stats: {:?}", service.cache_stats());
    sweeper.shutdown().await;

    Ok(())
}
