//! Request handlers module

pub mod department;
pub mod people;
