//! # Result table.
//!
//! Renders one row per [`AttemptResult`] in delivery order:
//!
//! ```text
//!        RealTime SystemTime   UserTime    Success      Error
//!    1     3.21ms      1.1ms        2ms       true
//!    2     2.98ms    1.023ms    1.904ms      false exit status 1
//! ```
//!
//! The header is written before the first row. Rows are numbered by delivery
//! position, not by attempt index. CPU times that were not measured (overlapping
//! attempts, entries that never ran) print as `-`.

use std::io::{self, Write};
use std::time::Duration;

use crate::command::AttemptResult;
use crate::duration::{format_duration, round_to};

/// Table writer over any [`Write`]. Not thread safe; one table per stream.
#[derive(Debug)]
pub struct Table<W: Write> {
    writer: W,
    line: usize,
}

impl<W: Write> Table<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, line: 0 }
    }

    /// Writes `result` as the next row, preceded by the header on the first call.
    pub fn print_row(&mut self, result: &AttemptResult) -> io::Result<()> {
        self.line += 1;
        if self.line == 1 {
            writeln!(
                self.writer,
                "{:>4} {:>10} {:>10} {:>10} {:>10} {:>10}",
                "", "RealTime", "SystemTime", "UserTime", "Success", "Error"
            )?;
        }

        let error = result.error.as_ref().map(ToString::to_string).unwrap_or_default();
        writeln!(
            self.writer,
            "{:>4} {:>10} {:>10} {:>10} {:>10} {:>10}",
            self.line,
            format_duration(round_min(result.real_time)),
            cpu_time(result.system_time),
            cpu_time(result.user_time),
            result.executed && result.success,
            error,
        )?;
        self.writer.flush()
    }

    /// Rows written so far.
    pub fn rows(&self) -> usize {
        self.line
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Measured CPU time, or `-` when it could not be attributed to the attempt.
fn cpu_time(d: Option<Duration>) -> String {
    d.map_or_else(|| "-".to_string(), format_duration)
}

/// Rounds a wall-clock duration to a precision that fits its magnitude.
pub fn round_min(d: Duration) -> Duration {
    const HOUR: Duration = Duration::from_secs(3_600);
    const MINUTE: Duration = Duration::from_secs(60);
    const SECOND: Duration = Duration::from_secs(1);
    const MILLI: Duration = Duration::from_millis(1);

    let unit = if d >= HOUR {
        MINUTE
    } else if d >= MINUTE {
        SECOND
    } else if d >= SECOND {
        MILLI
    } else if d >= MILLI {
        Duration::from_micros(1)
    } else {
        MILLI
    };
    round_to(d, unit)
}
