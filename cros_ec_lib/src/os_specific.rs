//! Helper functions that need OS/platform specific implementations

use std::{thread, time};

/// Sleep a number of microseconds
pub fn sleep(micros: u64) {
    if micros == 0 {
        return;
    }
    let duration = time::Duration::from_micros(micros);
    thread::sleep(duration);
}
