//! Wait/ping controller
//!
//! Blocks until each database server accepts connections. The emitted
//! progress bytes are part of the interface: nothing on first-try success,
//! otherwise `Waiting for database` followed by one dot per attempt and a
//! closing newline.

use crate::error::{Error, Result};
use std::io::Write;
use std::thread;
use std::time::Duration;
use tm_db::Driver;

/// Ping every driver in order, sleeping `interval` between attempts and
/// giving up on a driver once `timeout` has accumulated.
pub(crate) fn wait_for_connection(
    log: &mut dyn Write,
    drivers: &[&dyn Driver],
    interval: Duration,
    timeout: Duration,
) -> Result<()> {
    'drivers: for driver in drivers {
        let mut last_err = match driver.ping() {
            Ok(()) => continue,
            Err(err) => err,
        };

        let _ = write!(log, "Waiting for database");
        let _ = log.flush();

        let mut elapsed = Duration::ZERO;
        while elapsed < timeout {
            let _ = write!(log, ".");
            let _ = log.flush();
            thread::sleep(interval);
            elapsed += interval;

            match driver.ping() {
                Ok(()) => {
                    let _ = writeln!(log);
                    continue 'drivers;
                }
                Err(err) => last_err = err,
            }
        }

        let _ = writeln!(log);
        return Err(Error::CantConnect(last_err));
    }

    Ok(())
}

#[cfg(test)]
#[path = "wait_test.rs"]
mod tests;
