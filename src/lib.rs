pub mod aggregate;
pub mod boundaries;
pub mod config;
pub mod figure;
pub mod maps;
pub mod output;
pub mod proportions;
pub mod records;
