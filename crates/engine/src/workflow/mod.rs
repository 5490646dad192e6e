//! Workflow execution and suite loading.
//!
//! [`runner`] drives the steps of each workflow against a transport;
//! [`document`] reads suite files from disk.

pub mod document;
pub mod runner;
