//! Library half of the `repipe` command line tool.

pub mod frame;
pub mod logging;
pub mod report;
