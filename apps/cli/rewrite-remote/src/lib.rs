// Library exports for testing
// Both binaries import these as well

pub mod document;
pub mod error;
pub mod logger;
pub mod params;
pub mod run;
pub mod worker;

#[cfg(test)]
mod tests;

/// Name of the reference worker binary, looked up next to the host binary.
pub const WORKER_BINARY_NAME: &str = "remoting-worker";
