mod counters;
mod flow;
mod stack;
mod translator;

pub use counters::LabelCounters;
pub use translator::*;
