//! Records key reads from several threads and replays them into an access
//! frequency table, the way a cache feeds its eviction policy.
//!
//! Run with: `RUST_LOG=fastflow_rs=trace cargo run --example read_recorder`

use fastflow_rs::{Config, FastFlowBuffer, ReadBuffer};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const N_READERS: u64 = 4;
const READS_PER_THREAD: u64 = 200_000;
const KEYS: u64 = 64;

/// Applies drained reads to the policy's frequency table.
fn replay(buffer: &dyn ReadBuffer<u64>, frequencies: &mut HashMap<u64, u64>) -> usize {
    buffer.drain_to(&mut |key| *frequencies.entry(key).or_default() += 1)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::new(6, true);
    let buffer = Arc::new(FastFlowBuffer::<u64>::new(config).expect("valid config"));
    let stop = Arc::new(AtomicBool::new(false));

    println!("FastFlow Read Recorder");
    println!("======================\n");
    println!("  Buffer capacity: {} slots", buffer.capacity());
    println!("  Reader threads:  {}", N_READERS);
    println!("  Reads per thread: {}\n", READS_PER_THREAD);

    let start = Instant::now();

    let maintenance = {
        let buf = Arc::clone(&buffer);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut frequencies = HashMap::new();
            loop {
                let finished = stop.load(Ordering::Acquire);
                replay(&*buf, &mut frequencies);
                if finished && buf.is_empty() {
                    return frequencies;
                }
                thread::yield_now();
            }
        })
    };

    let readers: Vec<_> = (0..N_READERS)
        .map(|id| {
            let buf = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut recorded = 0u64;
                for i in 0..READS_PER_THREAD {
                    // Skewed access: low keys are hot
                    let key = u64::from((i * (id + 1)).trailing_zeros()) % KEYS;
                    // Losing a read sample is fine, the policy is probabilistic
                    recorded += u64::from(buf.offer(key).is_success());
                }
                recorded
            })
        })
        .collect();

    let recorded: u64 = readers.into_iter().map(|r| r.join().unwrap()).sum();
    stop.store(true, Ordering::Release);
    let frequencies = maintenance.join().unwrap();
    let elapsed = start.elapsed();

    let replayed: u64 = frequencies.values().sum();
    let mut hottest: Vec<_> = frequencies.into_iter().collect();
    hottest.sort_unstable_by(|a, b| b.1.cmp(&a.1));

    println!("Results:");
    println!("  Recorded: {} of {}", recorded, N_READERS * READS_PER_THREAD);
    println!("  Replayed: {}", replayed);
    println!("  Hottest keys: {:?}", &hottest[..hottest.len().min(5)]);
    println!("  Elapsed: {:?}", elapsed);
    println!("  Metrics: {:?}", buffer.metrics());

    assert_eq!(recorded, replayed);
}
