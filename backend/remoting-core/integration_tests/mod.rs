mod helpers;

mod incremental;
mod recovery;
mod registry;
mod startup;
