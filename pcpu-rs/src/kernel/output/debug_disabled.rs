pub fn init() {}

pub fn enabled(_log: &str) -> bool {
    false
}

#[macro_export]
macro_rules! dbg {
    ($log:ident, $($arg:tt)*) => ({
        let _ = format_args!($($arg)*);
    });
}

#[macro_export]
macro_rules! dbgln {
    ($log:ident, $fmt:expr) => ($crate::dbg!($log, concat!(stringify!($log), ": ", $fmt, "\n")));
    ($log:ident, $fmt:expr, $($arg:tt)*) => ($crate::dbg!($log, concat!(stringify!($log), ": ", $fmt, "\n"), $($arg)*));
}
