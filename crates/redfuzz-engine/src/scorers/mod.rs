// Builtin scorers

mod judge;
mod refusal;

pub use judge::HarmfulJudgeScorer;
pub use refusal::RefusalScorer;
