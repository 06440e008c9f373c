//! Update strategies
//!
//! An update strategy resolves a decision against the dataset and decides
//! which reward tuples the recommender and the metrics get to see.

pub mod contact;
pub mod general;
pub mod knowledge;
pub mod replayer;
pub mod traits;

pub mod prelude {
    pub use super::contact::ContactUpdate;
    pub use super::general::GeneralUpdate;
    pub use super::knowledge::{KnowledgeMode, KnowledgeUpdate};
    pub use super::replayer::ReplayerUpdate;
    pub use super::traits::{UpdateOutcome, UpdateStrategy};
}
