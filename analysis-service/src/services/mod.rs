pub mod metrics;
pub mod prompt;
pub mod providers;

pub use metrics::{get_metrics, init_metrics};
pub use prompt::{build_analysis_prompt, DIMENSION_COUNT, DIMENSION_LABELS};
pub use providers::{
    chat::ChatCompletionsProvider, CompletionProvider, GenerationParams, ProviderError,
};
