pub mod bundle;
pub mod crawler;
pub mod docs;
pub mod execution;
pub mod graph;
pub mod identity;
pub mod object;
pub mod runner;
pub mod signature;
pub mod stats;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

#[cfg(test)]
mod tests;
