use spin::Mutex;

#[cfg(feature = "logs")]
#[macro_use]
pub mod debug;
#[cfg(not(feature = "logs"))]
#[macro_use]
#[path = "debug_disabled.rs"]
pub mod debug;

pub trait ConsoleWriter: Send + Sync {
    fn write_str(&self, s: &str) -> core::fmt::Result;
}

struct NoopWriter {}

impl ConsoleWriter for NoopWriter {
    fn write_str(&self, _s: &str) -> core::fmt::Result {
        Ok(())
    }
}

static OUTPUT_WRITER: Mutex<&'static dyn ConsoleWriter> = Mutex::new(&NoopWriter {});
static LOG_WRITER: Mutex<&'static dyn ConsoleWriter> = Mutex::new(&NoopWriter {});

pub fn register_output_driver(driver: &'static dyn ConsoleWriter) {
    *OUTPUT_WRITER.lock() = driver;
}

pub fn register_log_driver(driver: &'static dyn ConsoleWriter) {
    *LOG_WRITER.lock() = driver;
}

struct Writer {}

impl core::fmt::Write for Writer {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let console = *OUTPUT_WRITER.lock();
        console.write_str(s)
    }
}

struct Log {}

impl core::fmt::Write for Log {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let log = *LOG_WRITER.lock();
        log.write_str(s)
    }
}

pub fn write_fmt(args: core::fmt::Arguments) -> core::fmt::Result {
    core::fmt::write(&mut Writer {}, args)
}

pub fn log_fmt(args: core::fmt::Arguments) -> core::fmt::Result {
    core::fmt::write(&mut Log {}, args)
}

#[macro_export]
macro_rules! println {
    ($fmt:expr) => ($crate::print!(concat!($fmt, "\n")));
    ($fmt:expr, $($arg:tt)*) => ($crate::print!(concat!($fmt, "\n"), $($arg)*));
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ({
        let _ = $crate::kernel::output::write_fmt(format_args!($($arg)*));
    });
}

#[macro_export]
macro_rules! logln {
    ($fmt:expr) => ($crate::log!(concat!($fmt, "\n")));
    ($fmt:expr, $($arg:tt)*) => ($crate::log!(concat!($fmt, "\n"), $($arg)*));
}

#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => ({
        let _ = $crate::kernel::output::log_fmt(format_args!($($arg)*));
    });
}
