pub mod models;
pub mod projections;
pub mod scoring;
