pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use models::{
    Candidate, Dimension, DimensionThreshold, PriorityLevel, PriorityMap, RankingRecord,
    ScoreMap, ThresholdConfig, WeightMap,
};
pub use services::{
    AnalysisError, AnalysisPipeline, AnalysisReport, AnalysisRequest, CandidateStore,
    ComparisonExplainer, InMemoryCandidateStore, LlmError, LlmProvider, PoolAssembler,
    PriorityInference, RankingEngine, ScoringCollaborator, ThresholdEliminator,
    TieBreakerResolver,
};
