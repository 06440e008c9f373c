//! Ratings, datasets and interaction logs

pub mod dataset;
pub mod rating;
pub mod stream;

pub use dataset::{Dataset, RatingMatrix};
pub use rating::{resolve_reward, Rating, NOT_IN_GROUND_TRUTH, NOT_RATED_NOT_IGNORED};
pub use stream::{LineStream, RatingStream, VecStream};

pub mod prelude {
    pub use super::dataset::{Dataset, RatingMatrix};
    pub use super::rating::{Rating, NOT_IN_GROUND_TRUTH, NOT_RATED_NOT_IGNORED};
    pub use super::stream::{LineStream, RatingStream, VecStream};
}
