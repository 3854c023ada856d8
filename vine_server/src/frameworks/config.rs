use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("VINE_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5000)
}

pub fn tick_interval() -> Duration {
    let millis = env::var("TICK_INTERVAL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|millis| *millis > 0)
        .unwrap_or(16);
    Duration::from_millis(millis)
}

pub fn max_spectators() -> usize {
    env::var("MAX_SPECTATORS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(2)
}

pub const COMMAND_CHANNEL_CAPACITY: usize = 1024;
// Roughly half a second of frames at the default tick rate.
pub const LISTENER_QUEUE_CAPACITY: usize = 32;
