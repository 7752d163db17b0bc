pub mod assignments;
pub mod core;
pub mod courses;
pub mod subjects;
pub mod tree;
