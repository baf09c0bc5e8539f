// Resume-to-job-description analysis.
// One pipeline parameterised by `AnalysisKind`: the catalog picks the prompt,
// the parser picks the reply shape. All backend calls go through llm_client.

pub mod catalog;
pub mod export;
pub mod handlers;
pub mod kind;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod session;
