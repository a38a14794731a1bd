//! # Test Cases & Classification
//!
//! Declared probes ([`TestCase`]), their acceptable status sets, the
//! classifier that turns a dispatch outcome into exactly one [`TestResult`],
//! and the keyword rules that group results by feature area.

pub mod capture;
pub mod case;
pub mod category;
pub mod classify;
pub mod result;

pub use case::{ExpectedStatus, TestCase};
pub use category::{Category, CategoryRules};
pub use classify::{classify, not_executed};
pub use result::TestResult;
