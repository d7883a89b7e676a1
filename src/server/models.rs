//! Request and response bodies.

use serde::{Deserialize, Serialize};

use crate::ideas::{IdeaRecord, ValidationReport};

pub use crate::ideas::IdeaGenerationRequest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub idea: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeasResponse {
    pub ideas: Vec<IdeaRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub market_analysis: String,
    pub technical_evaluation: String,
    pub business_plan: String,
}

impl From<ValidationReport> for ValidationResponse {
    fn from(report: ValidationReport) -> Self {
        Self {
            market_analysis: report.market_analysis,
            technical_evaluation: report.technical_evaluation,
            business_plan: report.business_plan,
        }
    }
}
