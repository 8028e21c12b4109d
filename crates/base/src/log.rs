use std::{
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Debug => write!(f, "DEBUG"),
            Level::Info => write!(f, "INFO"),
            Level::Warn => write!(f, "WARN"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

pub trait Logger: Send + Sync {
    fn log(&self, level: Level, file: &str, line: usize, message: &str);
}

pub static LOGGER: Mutex<Option<Box<dyn Logger>>> = Mutex::new(None);

pub fn format_timestamp() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let (year, month, day) = civil_from_days((secs / 86400) as i64);
    let time_of_day = secs % 86400;
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        year,
        month,
        day,
        time_of_day / 3600,
        (time_of_day % 3600) / 60,
        time_of_day % 60
    )
}

// Howard Hinnant's civil-from-days algorithm.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

pub struct StdoutLogger;

impl Logger for StdoutLogger {
    fn log(&self, level: Level, file: &str, line: usize, message: &str) {
        let timestamp = format_timestamp();
        let thread_id = std::thread::current().id();
        println!(
            "[{:?}:{}:{} - {}:{}] {}",
            thread_id, level, timestamp, file, line, message
        );
    }
}

pub fn init_stdout_logger() {
    LOGGER.lock().unwrap().replace(Box::new(StdoutLogger));
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{ let message = format_args!($($arg)*).to_string(); if let Some(logger) = $crate::log::LOGGER.lock().unwrap_or_else(|e| e.into_inner()).as_ref() { logger.log($crate::log::Level::Debug, file!(), line!() as usize, &message); } }};
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{ let message = format_args!($($arg)*).to_string(); if let Some(logger) = $crate::log::LOGGER.lock().unwrap_or_else(|e| e.into_inner()).as_ref() { logger.log($crate::log::Level::Info, file!(), line!() as usize, &message); } }};
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{ let message = format_args!($($arg)*).to_string(); if let Some(logger) = $crate::log::LOGGER.lock().unwrap_or_else(|e| e.into_inner()).as_ref() { logger.log($crate::log::Level::Warn, file!(), line!() as usize, &message); } }};
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{ let message = format_args!($($arg)*).to_string(); if let Some(logger) = $crate::log::LOGGER.lock().unwrap_or_else(|e| e.into_inner()).as_ref() { logger.log($crate::log::Level::Error, file!(), line!() as usize, &message); } }};
}
