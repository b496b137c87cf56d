pub mod analysis;

pub use analysis::{AnalyzeRequest, AnalyzeResponse, HealthResponse, Percentages, Score};
