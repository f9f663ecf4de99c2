use chrono::Local;
use std::fmt::Arguments;

pub struct Logger;

impl Logger {
    fn write(tag: &str, to_stderr: bool, args: Arguments) {
        let local = Local::now().format("%d/%m/%Y %H:%M:%S");
        if to_stderr {
            eprintln!("[{tag}] [{local}] {args}");
        } else {
            println!("[{tag}] [{local}] {args}");
        }
    }

    pub fn info(args: Arguments) {
        Logger::write("INFO ", false, args);
    }

    pub fn debug(args: Arguments) {
        Logger::write("DEBUG", false, args);
    }

    pub fn warn(args: Arguments) {
        Logger::write("WARN ", true, args);
    }

    pub fn error(args: Arguments) {
        Logger::write("ERROR", true, args);
    }
}

#[macro_export]
macro_rules! logger {
    (INFO, $($arg:tt)*) => {
        Logger::info(format_args!($($arg)*))
    };
    (DEBUG, $($arg:tt)*) => {
        Logger::debug(format_args!($($arg)*))
    };
    (WARN, $($arg:tt)*) => {
        Logger::warn(format_args!($($arg)*))
    };
    (ERROR, $($arg:tt)*) => {
        Logger::error(format_args!($($arg)*))
    };
}
