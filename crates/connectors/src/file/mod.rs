pub mod archive;
pub mod csv;
