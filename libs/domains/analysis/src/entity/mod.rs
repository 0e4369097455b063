//! Sea-ORM entities for the pipeline tables

pub mod analysis;
pub mod document;
pub mod embedding;
