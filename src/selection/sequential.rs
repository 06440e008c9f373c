//! Sequential (stream) selection
//!
//! Targets follow the order of an interaction log. Recording the decision
//! for the current entry moves the cursor; there is no resampling and no
//! removal bookkeeping.

use std::sync::Arc;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::traits::SelectionStrategy;
use crate::data::{Dataset, Rating, RatingStream};
use crate::error::SimResult;
use crate::warmup::Warmup;

/// What a stream target is offered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamCandidates {
    /// The whole catalog
    #[default]
    Catalog,
    /// Only the logged item
    Logged,
}

/// Log-driven selection
///
/// A stream is consumed once, so every run needs its own instance.
pub struct SequentialSelection {
    stream: Box<dyn RatingStream>,
    candidates: StreamCandidates,
    catalog: Vec<u32>,
    current: Option<Rating>,
}

impl SequentialSelection {
    /// Create over a log
    pub fn new(stream: Box<dyn RatingStream>, candidates: StreamCandidates) -> Self {
        Self {
            stream,
            candidates,
            catalog: Vec::new(),
            current: None,
        }
    }
}

impl SelectionStrategy for SequentialSelection {
    fn init(
        &mut self,
        dataset: &Arc<dyn Dataset>,
        _warmup: &Warmup,
        _rng: &mut StdRng,
    ) -> SimResult<()> {
        self.catalog = dataset.all_item_indices();
        self.current = None;
        Ok(())
    }

    fn select_target(&mut self, _rng: &mut StdRng) -> SimResult<Option<u32>> {
        if self.current.is_none() {
            self.current = self.stream.advance()?;
        }
        Ok(self.current.map(|r| r.user))
    }

    fn select_candidates(&mut self, user: u32, _rng: &mut StdRng) -> Option<Vec<u32>> {
        let record = self.current.filter(|r| r.user == user)?;
        let items = match self.candidates {
            StreamCandidates::Catalog => self.catalog.clone(),
            StreamCandidates::Logged => vec![record.item],
        };
        if items.is_empty() {
            // nothing to offer: skip this entry
            self.current = None;
            return None;
        }
        Some(items)
    }

    fn update(&mut self, user: u32, _item: u32, _value: f64) {
        if self.current.map_or(false, |r| r.user == user) {
            self.current = None;
        }
    }

    fn is_available(&self, _user: u32, item: u32) -> bool {
        (item as usize) < self.catalog.len()
    }

    fn current_record(&self) -> Option<Rating> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RatingMatrix, VecStream};
    use rand::SeedableRng;

    fn setup(candidates: StreamCandidates) -> (SequentialSelection, StdRng) {
        let data: Arc<dyn Dataset> = Arc::new(RatingMatrix::new(3, 4, Vec::new(), 0.5).unwrap());
        let warmup = Warmup::empty(data.as_ref());
        let stream = VecStream::new(vec![Rating::new(2, 1, 1.0), Rating::new(0, 3, 1.0)]);
        let mut sel = SequentialSelection::new(Box::new(stream), candidates);
        let mut rng = StdRng::seed_from_u64(0);
        sel.init(&data, &warmup, &mut rng).unwrap();
        (sel, rng)
    }

    #[test]
    fn test_follows_log_order() {
        let (mut sel, mut rng) = setup(StreamCandidates::Catalog);
        assert_eq!(sel.select_target(&mut rng).unwrap(), Some(2));
        // not consumed yet: same entry
        assert_eq!(sel.select_target(&mut rng).unwrap(), Some(2));
        assert_eq!(sel.select_candidates(2, &mut rng).unwrap().len(), 4);
        sel.update(2, 0, f64::NAN);
        assert_eq!(sel.select_target(&mut rng).unwrap(), Some(0));
        sel.update(0, 3, 1.0);
        assert_eq!(sel.select_target(&mut rng).unwrap(), None);
    }

    #[test]
    fn test_logged_candidates() {
        let (mut sel, mut rng) = setup(StreamCandidates::Logged);
        let user = sel.select_target(&mut rng).unwrap().unwrap();
        assert_eq!(sel.select_candidates(user, &mut rng), Some(vec![1]));
        assert_eq!(sel.current_record(), Some(Rating::new(2, 1, 1.0)));
    }
}
