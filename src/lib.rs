//! Packaging pipeline for the Web Notes browser extension.
//!
//! Turns the extension source tree into a validated, store-ready zip archive:
//! the manifest and required files are checked up front, the production file
//! set is copied into a scoped staging area, SVG icons are rasterised with
//! whichever converter is installed, the staging area is archived with the
//! first available backend, and the result is verified before it is reported.
//!
//! The [`pipeline::Pipeline`] type drives the stages; the remaining modules
//! each implement one of them.

pub mod archive;
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod exec;
pub mod icons;
pub mod lock;
pub mod manifest;
pub mod naming;
pub mod pipeline;
pub mod policy;
pub mod preflight;
pub mod report;
pub mod staging;
pub mod verify;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
