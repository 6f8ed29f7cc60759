//! Directory core
//!
//! Department forest, person filtering and the data-access seam.

pub mod people;
pub mod store;
pub mod tree;

pub use people::{filter_people, Avatar, Person, PersonFilter};
pub use store::{DirectoryStore, SeaOrmStore};
pub use tree::{DepartmentForest, DepartmentNode, DepartmentRef, DepartmentRow};
