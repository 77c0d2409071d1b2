pub mod recommend_flow;

pub use recommend_flow::RecommendFlow;
