mod counting;
mod descriptor;
mod endpoint;
mod error;
mod protocol;
mod tracker;
