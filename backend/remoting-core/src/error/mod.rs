pub mod config;
pub mod remoting;

pub use config::ConfigError;
pub use remoting::RemotingError;
