// src/lib.rs
//! Field extraction for Chinese bond disclosure text, plus a ChinaMoney bond
//! list downloader.
//!
//! ```no_run
//! use disclosure_extractor::extractors::{reg_search, RuleSet};
//!
//! let rules = vec![RuleSet::new().custom("标的证券").custom("换股期限")];
//! let results = reg_search("标的证券：股票代码：600900.SH", &rules)?;
//! # Ok::<(), disclosure_extractor::utils::error::ExtractError>(())
//! ```
pub mod chinamoney;
pub mod extractors;
pub mod storage;
pub mod utils;
