//! Streaming metrics
//!
//! Every metric keeps incremental state so that reading it after each
//! iteration costs no more than the update itself.

pub mod accuracy;
pub mod diversity;
pub mod gini;
pub mod traits;

pub mod prelude {
    pub use super::accuracy::{ClickThroughRate, CumulativeRecall, WindowedClickThroughRate};
    pub use super::diversity::{CumulativeGini, PopularityComplement, WindowedGini};
    pub use super::gini::{gini_coefficient, GiniIndex};
    pub use super::traits::CumulativeMetric;
}
