//! Built-in embedding strategies for vnesim.
//!
//! This crate provides the [`EmbeddingStrategy`] trait and several built-in
//! implementations for virtual network embedding:
//!
//! | Strategy | Placement | Best For |
//! |----------|-----------|----------|
//! | [`Greedy`] | Resource-rank nodes, shortest paths | General workloads |
//! | [`FirstFit`] | Lowest-id feasible node | Baseline comparison |
//! | [`RandomFit`] | Seeded uniform feasible choice | Lower-bound baseline |

pub mod first_fit;
pub mod greedy;
pub mod random_fit;
pub mod traits;

pub use first_fit::FirstFit;
pub use greedy::Greedy;
pub use random_fit::RandomFit;
pub use traits::*;

/// Create an embedding strategy by name.
///
/// `seed` feeds stochastic strategies; deterministic ones ignore it.
pub fn strategy_by_name(name: &str, seed: u64) -> Option<Box<dyn EmbeddingStrategy>> {
    match name {
        "greedy" => Some(Box::new(Greedy::new())),
        "first_fit" => Some(Box::new(FirstFit::new())),
        "random_fit" => Some(Box::new(RandomFit::new(seed))),
        _ => None,
    }
}

/// List all available built-in strategy names.
pub fn available_strategies() -> Vec<&'static str> {
    vec!["greedy", "first_fit", "random_fit"]
}
