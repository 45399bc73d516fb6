use alloc::string::String;
use hashbrown::HashSet;
use spin::Once;

static ENABLED_LOGGERS: Once<HashSet<String>> = Once::new();

pub fn init() {
    ENABLED_LOGGERS.call_once(|| {
        let mut ret = HashSet::new();
        if let Some(loggers) = crate::kernel::params::get("logs") {
            for e in loggers.split(',').filter(|e| !e.is_empty()) {
                ret.insert(String::from(e));
            }
        }
        ret
    });
}

pub fn loggers() -> Option<&'static HashSet<String>> {
    ENABLED_LOGGERS.get()
}

pub fn enabled(log: &str) -> bool {
    loggers().map_or(false, |l| l.contains(log))
}

#[macro_export]
macro_rules! dbg {
    ($log:ident, $($arg:tt)*) => ({
        if $crate::kernel::output::debug::enabled(stringify!($log)) {
            let _ = $crate::kernel::output::log_fmt(format_args!($($arg)*));
        }
    });
}

#[macro_export]
macro_rules! dbgln {
    ($log:ident, $fmt:expr) => ($crate::dbg!($log, concat!(stringify!($log), ": ", $fmt, "\n")));
    ($log:ident, $fmt:expr, $($arg:tt)*) => ($crate::dbg!($log, concat!(stringify!($log), ": ", $fmt, "\n"), $($arg)*));
}
