//! Optional model-backed code lookup.
//!
//! Some deployments can ask a remote language model for the code when the
//! keyword extractor comes up empty. The extractor never calls a model on its
//! own; callers combine both through [`resolve_codes`].

use crate::extractor::ExtractionResult;
use serde::{Deserialize, Serialize};

/// Reply of a model lookup: either a code, an error, or neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelAnswer {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// "Ask the model for the code" capability.
pub trait CodeModel: Send + Sync {
    fn ask_model(&self, subject: &str, plain_text: &str) -> ModelAnswer;
    fn name(&self) -> &str;
}

/// Where the verified codes of a [`ResolvedCodes`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeSource {
    Extractor,
    Model,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCodes {
    pub verified: Vec<String>,
    pub uncertain: Vec<String>,
    pub source: CodeSource,
    pub model_error: Option<String>,
}

/// Combine extractor output with an optional model fallback.
///
/// The model is only consulted when the extractor found no high-confidence
/// code. Low-confidence candidates are kept either way.
pub fn resolve_codes(
    extraction: &ExtractionResult,
    model: Option<&dyn CodeModel>,
    subject: &str,
    plain_text: &str,
) -> ResolvedCodes {
    let mut resolved = ResolvedCodes {
        verified: extraction.high_confidence.clone(),
        uncertain: extraction.low_confidence.clone(),
        source: CodeSource::None,
        model_error: None,
    };

    if !resolved.verified.is_empty() {
        resolved.source = CodeSource::Extractor;
        return resolved;
    }

    let Some(model) = model else {
        return resolved;
    };

    let answer = model.ask_model(subject, plain_text);
    if let Some(error) = answer.error {
        log::warn!("Model '{}' failed to extract a code: {}", model.name(), error);
        resolved.model_error = Some(error);
    }
    if let Some(code) = answer.code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        log::debug!("Model '{}' supplied code {}", model.name(), code);
        resolved.uncertain.retain(|c| c != code);
        resolved.verified.push(code.to_string());
        resolved.source = CodeSource::Model;
    }

    resolved
}
