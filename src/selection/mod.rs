//! Selection strategies
//!
//! A selection strategy decides, each iteration, which user is the target
//! and which items it may be offered. It also owns the notion of an
//! exhausted user.

pub mod limited;
pub mod non_sequential;
pub mod sequential;
pub mod tie_break;
pub mod traits;
pub mod user_selector;

pub mod prelude {
    pub use super::limited::LimitedSelection;
    pub use super::non_sequential::NonSequentialSelection;
    pub use super::sequential::{SequentialSelection, StreamCandidates};
    pub use super::tie_break::{argmax_random_tie, uniform_choice};
    pub use super::traits::SelectionStrategy;
    pub use super::user_selector::{
        RandomUserSelector, RoundRobinUserSelector, TargetUserSelector, UserSelection,
    };
}
