//! Console output for the interactive subcommands. The daemon logs through `tracing`.
#[macro_export]
macro_rules! success_message {
    ($($arg:tt)*) => {
        println!("{} {}", colored::Colorize::bold(colored::Colorize::green("[OK]")), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! error_message {
    ($($arg:tt)*) => {
        eprintln!("{} {}", colored::Colorize::bold(colored::Colorize::red("[ERROR]")), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! warning_message {
    ($($arg:tt)*) => {
        println!("{} {}", colored::Colorize::bold(colored::Colorize::yellow("[WARN]")), format!($($arg)*));
    };
}

/// An indented `key -> value` line under a section header.
#[macro_export]
macro_rules! entry_message {
    ($key:expr, $value:expr) => {
        println!("  {} {} {}", colored::Colorize::cyan($key), colored::Colorize::dimmed("->"), $value);
    };
}
