// Log levels are opted into through cargo features. When a level is disabled its
// macro still type-checks the format arguments but compiles to nothing.

#[cfg(feature = "log-debug")]
macro_rules! debug {
    ($($arg:tt)+) => (log::debug!(target: "cl-stream", $($arg)+))
}

#[cfg(not(feature = "log-debug"))]
macro_rules! debug {
    ($($arg:tt)+) => {{
        if false {
            let _ = format_args!($($arg)+);
        }
    }};
}

#[cfg(feature = "log-info")]
macro_rules! info {
    ($($arg:tt)+) => (log::info!(target: "cl-stream", $($arg)+))
}

#[cfg(not(feature = "log-info"))]
macro_rules! info {
    ($($arg:tt)+) => {{
        if false {
            let _ = format_args!($($arg)+);
        }
    }};
}

#[cfg(feature = "log-warn")]
macro_rules! warn {
    ($($arg:tt)+) => (log::warn!(target: "cl-stream", $($arg)+))
}

#[cfg(not(feature = "log-warn"))]
macro_rules! warn {
    ($($arg:tt)+) => {{
        if false {
            let _ = format_args!($($arg)+);
        }
    }};
}

#[cfg(feature = "log-error")]
macro_rules! error {
    ($($arg:tt)+) => (log::error!(target: "cl-stream", $($arg)+))
}

#[cfg(not(feature = "log-error"))]
macro_rules! error {
    ($($arg:tt)+) => {{
        if false {
            let _ = format_args!($($arg)+);
        }
    }};
}
