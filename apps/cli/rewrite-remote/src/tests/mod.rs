mod document;
mod logger;
mod operation;
mod params;
mod worker;
