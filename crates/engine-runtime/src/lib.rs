pub mod coordinator;
pub mod error;
pub mod job;
pub mod step;

#[cfg(test)]
mod tests;
