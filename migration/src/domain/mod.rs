pub mod migration;
pub mod persistence;
