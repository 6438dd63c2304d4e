//! Wallet activity analysis.
//!
//! - [`locator`] finds the first block a wallet sent a transaction in
//! - [`scanner`] extracts activity metrics from a block range
//! - [`classifier`] sorts `Transfer`-emitting contracts into token kinds
//! - [`analyzer`] runs a whole request: cache read, locate, scan, aggregate, commit
//! - [`report`] renders a result for output

pub mod analyzer;
pub mod classifier;
pub mod lease;
pub mod locator;
pub mod metrics;
pub mod report;
pub mod scanner;

pub use analyzer::{
    AnalysisDiagnostics, AnalysisStatus, CommitOutcome, WalletAnalysis, WalletAnalyzer,
};
pub use classifier::{Classification, TokenClassifier, TokenKind};
pub use lease::{WalletLease, WalletLeases};
pub use locator::{FirstActivity, FirstActivityLocator, LocatorOutcome};
pub use metrics::{CacheRecord, ScanWindow, WalletMetrics, METRIC_FIELDS};
pub use report::AnalysisReport;
pub use scanner::{BlockScanner, ScanDiagnostics, ScanReport, SkippedBlock, TransferScope};
