pub mod compare;
pub mod config;
pub mod dashboard;
pub mod parse;
pub mod report;
pub mod result;
pub mod runner;
pub mod schedule;
pub mod secrets;
pub mod step;
pub mod store;
pub mod threshold;

#[cfg(test)]
mod compare_test;
#[cfg(test)]
mod report_test;
#[cfg(test)]
mod store_test;
