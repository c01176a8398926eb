pub mod candidate;
pub mod config;
pub mod config_loader;
pub mod extractor;
pub mod model;
pub mod normalization;
pub mod notification;
pub mod patterns;
pub mod scoring;

pub use config::{DetectionConfig, PatternRule, PositiveKeywords};
pub use config_loader::ConfigLoader;
pub use extractor::{
    extract, extract_with_defaults, Candidate, CandidateDebug, CodeExtractor, ExtractionResult,
};
pub use model::{resolve_codes, CodeModel, CodeSource, ModelAnswer, ResolvedCodes};
pub use normalization::{normalize_content, NormalizedContent};
pub use notification::{NotificationSummary, PreviewLimit};
