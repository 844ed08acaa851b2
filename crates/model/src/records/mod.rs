pub mod entity;
pub mod raw;
