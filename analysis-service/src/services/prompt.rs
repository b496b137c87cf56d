//! Prompt rendering for needs-test analysis.
//!
//! The prompt is fully determined by the scores: labels and scores are paired
//! index-for-index and embedded in a fixed instruction block.

use crate::dtos::Percentages;

pub const DIMENSION_COUNT: usize = 10;

/// Dimension labels in scoring order: meaning, love, connection, growth,
/// creativity, power, fun, security, freedom, contribution.
pub const DIMENSION_LABELS: [&str; DIMENSION_COUNT] = [
    "意义", "爱", "连接", "成长", "创造", "权力", "乐趣", "安全感", "自由", "贡献",
];

const PROMPT_PREAMBLE: &str = "你是一位专业的心理咨询师和人格分析专家。请根据以下精神需求测试结果，为用户提供深入、温暖且富有洞察力的分析。";

const PROMPT_INSTRUCTIONS: &str = "【分析要求】
1. 识别用户的核心精神需求（得分最高的 2-3 个维度）
2. 分析这些核心需求如何影响用户的日常生活和决策
3. 提供具体的、可操作的建议，帮助用户更好地满足这些精神需求
4. 指出可能被忽视但重要的精神需求（得分较低的维度）
5. 提供平衡发展的建议

【输出格式】
请用中文输出，分为以下几个部分：
1. 核心驱动力分析（100-150字）
2. 生活影响洞察（100-150字）
3. 成长建议（3-5条，每条50-80字）
4. 平衡发展提示（3-5条，每条50-80字）

【语气要求】
- 专业但温暖
- 充满同理心
- 避免过于学术化的语言
- 鼓励性和启发性";

/// One `label: value%` line per dimension, in dimension order.
pub fn render_results(percentages: &Percentages, labels: &[&str; DIMENSION_COUNT]) -> String {
    labels
        .iter()
        .zip(percentages.as_array())
        .map(|(label, value)| format!("{}: {}%", label, value))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_analysis_prompt(percentages: &Percentages, labels: &[&str; DIMENSION_COUNT]) -> String {
    format!(
        "{}\n\n【测试结果】\n{}\n\n{}",
        PROMPT_PREAMBLE,
        render_results(percentages, labels),
        PROMPT_INSTRUCTIONS
    )
}
