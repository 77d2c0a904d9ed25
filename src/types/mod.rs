//! Public types for the Nutrigate API.

mod criteria;
mod health;
mod nutrition;
mod provider;
mod request;
mod task;

pub use criteria::{Accuracy, Complexity, Language, SelectionCriteria, Urgency};
pub use health::{
    HealthProfile, HealthRecord, HealthRiskAssessment, RiskLevel, RiskSignal, RiskSignals,
};
pub use nutrition::{DiiComponent, DiiScore, FoodAnalysis, FoodItem, InflammationLevel};
pub use provider::ProviderKind;
pub use request::{AnalysisOutput, AnalysisPayload, AnalysisRequest, AnalysisResult};
pub use task::TaskType;
