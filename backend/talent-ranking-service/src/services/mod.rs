pub mod analysis;
pub mod comparison;
pub mod elimination;
pub mod llm;
pub mod pool;
pub mod priority;
pub mod ranking;
pub mod tie_breaker;

pub use analysis::{AnalysisError, AnalysisPipeline, AnalysisReport, AnalysisRequest};
pub use comparison::{ComparisonExplainer, ComparisonExplanation};
pub use elimination::ThresholdEliminator;
pub use llm::{LlmError, LlmProvider, ScoringCollaborator};
pub use pool::{CandidateStore, InMemoryCandidateStore, PoolAssembler, StoreError};
pub use priority::PriorityInference;
pub use ranking::RankingEngine;
pub use tie_breaker::TieBreakerResolver;
