use clap::Subcommand;

use super::evaluate::EvaluateArgs;
use super::policy::PolicyArgs;

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Run one request through a policy pipeline
    Evaluate(EvaluateArgs),

    /// Inspect the effective policy tables
    Policy(PolicyArgs),
}
