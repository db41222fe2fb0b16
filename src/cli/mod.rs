pub mod app;
pub mod commands;
pub mod env;
pub mod evaluate;
pub mod policy;
pub mod runtime;

pub use evaluate::{cmd_evaluate, EvaluateArgs};
pub use policy::{cmd_policy, PolicyArgs};
