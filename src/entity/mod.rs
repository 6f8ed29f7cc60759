//! Entity module - SeaORM entity definitions

pub mod department;
pub mod person;
