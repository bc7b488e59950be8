use std::time::Duration;

/// Blocks the control loop between polls.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Puts the current thread to sleep.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
