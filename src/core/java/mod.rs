mod provision;
mod runtime;

pub use provision::JavaRuntimes;
pub use runtime::select_java_binary;
