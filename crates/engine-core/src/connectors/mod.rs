pub mod archive;
pub mod notify;
pub mod sink;
pub mod source;
