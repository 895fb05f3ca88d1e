//! Random history generation for exercising the `twopl_core` scheduler.

pub mod generator;
