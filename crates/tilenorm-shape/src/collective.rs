//! Collective reductions over a fixed group of participants.
//!
//! Distributed shape construction needs exactly one collective: an
//! elementwise sum of equally sized buffers, after which every participant
//! holds the same total. [`Collective`] abstracts that step so the shape
//! engine does not depend on a particular transport.
//!
//! Two implementations ship with the crate:
//!
//! - [`SingleProcess`]: a group of one; the reduction is a no-op.
//! - [`LocalGroup`]: `n` participants inside one process, typically one per
//!   thread, synchronised with a `parking_lot` mutex and condition variable.
//!
//! A reduction blocks until every participant of the group has called it.
//! A participant that never arrives stalls the others indefinitely.
//!
//! [`BlockedOwnership`] assigns tiles to participants in contiguous blocks of
//! ordinals, so each participant knows which norms it is responsible for.

use std::ops::Range;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::error::{ShapeError, ShapeResult};
use crate::norm_tensor::{NormScalar, NormTensor};

/// A group of participants able to sum buffers collectively.
pub trait Collective<T>: Send + Sync {
    /// Index of this participant, in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of participants.
    fn size(&self) -> usize;

    /// Replace `buffer` by the elementwise sum of every participant's
    /// buffer. Blocks until all participants have contributed.
    fn all_reduce_sum(&self, buffer: &mut [T]) -> ShapeResult<()>;
}

/// Group made of the calling process alone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SingleProcess;

impl<T: NormScalar> Collective<T> for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce_sum(&self, _buffer: &mut [T]) -> ShapeResult<()> {
        Ok(())
    }
}

/// Factory for an in-process group of communicating participants.
///
/// # Examples
///
/// ```
/// use std::thread;
///
/// use tilenorm_shape::{Collective, LocalGroup};
///
/// let handles: Vec<_> = LocalGroup::<f64>::new(3)
///     .into_iter()
///     .map(|comm| {
///         thread::spawn(move || {
///             let mut buffer = vec![0.0; 3];
///             buffer[comm.rank()] = (comm.rank() + 1) as f64;
///             comm.all_reduce_sum(&mut buffer).unwrap();
///             buffer
///         })
///     })
///     .collect();
///
/// for handle in handles {
///     assert_eq!(handle.join().unwrap(), vec![1.0, 2.0, 3.0]);
/// }
/// ```
pub struct LocalGroup<T> {
    _marker: std::marker::PhantomData<T>,
}

impl<T: NormScalar> LocalGroup<T> {
    /// Create the `size` endpoints of a new group, ordered by rank.
    ///
    /// A group of size zero has no endpoints.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(size: usize) -> Vec<LocalComm<T>> {
        let shared = Arc::new(Shared {
            state: Mutex::new(RoundState::default()),
            cond: Condvar::new(),
            size,
        });
        (0..size)
            .map(|rank| LocalComm {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

/// One participant of a [`LocalGroup`].
pub struct LocalComm<T> {
    rank: usize,
    shared: Arc<Shared<T>>,
}

impl<T> std::fmt::Debug for LocalComm<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalComm")
            .field("rank", &self.rank)
            .field("size", &self.shared.size)
            .finish()
    }
}

struct Shared<T> {
    state: Mutex<RoundState<T>>,
    cond: Condvar,
    size: usize,
}

/// State of the reduction in progress.
///
/// A round first collects contributions (`arrived` counts up to `size`),
/// then drains: every participant copies the total out (`remaining` counts
/// down to zero) before the next round may start collecting.
struct RoundState<T> {
    generation: u64,
    arrived: usize,
    remaining: usize,
    draining: bool,
    sum: Vec<T>,
    failure: Option<String>,
}

impl<T> Default for RoundState<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            arrived: 0,
            remaining: 0,
            draining: false,
            sum: Vec::new(),
            failure: None,
        }
    }
}

impl<T: NormScalar> Collective<T> for LocalComm<T> {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn all_reduce_sum(&self, buffer: &mut [T]) -> ShapeResult<()> {
        let shared = &*self.shared;
        debug!(
            rank = self.rank,
            size = shared.size,
            len = buffer.len(),
            "all-reduce sum"
        );

        let mut state = shared.state.lock();
        while state.draining && state.failure.is_none() {
            shared.cond.wait(&mut state);
        }
        if let Some(failure) = &state.failure {
            return Err(ShapeError::Collective(failure.clone()));
        }

        if state.arrived == 0 {
            state.sum = buffer.to_vec();
        } else if state.sum.len() != buffer.len() {
            let failure = format!(
                "rank {} contributed {} values, expected {}",
                self.rank,
                buffer.len(),
                state.sum.len()
            );
            state.failure = Some(failure.clone());
            shared.cond.notify_all();
            return Err(ShapeError::Collective(failure));
        } else {
            for (acc, &v) in state.sum.iter_mut().zip(buffer.iter()) {
                *acc = *acc + v;
            }
        }
        state.arrived += 1;

        let generation = state.generation;
        if state.arrived == shared.size {
            state.draining = true;
            state.remaining = shared.size;
            shared.cond.notify_all();
        } else {
            while !(state.draining && state.generation == generation) && state.failure.is_none() {
                shared.cond.wait(&mut state);
            }
            if let Some(failure) = &state.failure {
                return Err(ShapeError::Collective(failure.clone()));
            }
        }

        buffer.copy_from_slice(&state.sum);
        state.remaining -= 1;
        if state.remaining == 0 {
            state.draining = false;
            state.arrived = 0;
            state.generation += 1;
            state.sum.clear();
            shared.cond.notify_all();
        }
        Ok(())
    }
}

/// Assignment of tile ordinals to participants in contiguous blocks.
///
/// With `n` tiles and `p` participants, participant `r` owns the ordinals
/// `r * b .. min((r + 1) * b, n)` where `b = ceil(n / p)`.
///
/// # Examples
///
/// ```
/// use tilenorm_shape::BlockedOwnership;
///
/// let owners = BlockedOwnership::new(10, 1, 4).unwrap();
/// assert_eq!(owners.local_range(), 3..6);
/// assert!(owners.is_local(4));
/// assert_eq!(owners.owner(9), 3);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockedOwnership {
    tile_count: usize,
    rank: usize,
    size: usize,
    block: usize,
}

impl BlockedOwnership {
    /// # Errors
    ///
    /// Returns [`ShapeError::Collective`] unless `rank < size`.
    pub fn new(tile_count: usize, rank: usize, size: usize) -> ShapeResult<Self> {
        if rank >= size {
            return Err(ShapeError::Collective(format!(
                "rank {rank} is not part of a group of size {size}"
            )));
        }
        Ok(Self {
            tile_count,
            rank,
            size,
            block: tile_count.div_ceil(size),
        })
    }

    /// Ownership for the calling participant of `comm`.
    pub fn for_collective<T, C>(tile_count: usize, comm: &C) -> ShapeResult<Self>
    where
        C: Collective<T> + ?Sized,
    {
        Self::new(tile_count, comm.rank(), comm.size())
    }

    pub fn tile_count(&self) -> usize {
        self.tile_count
    }

    /// Rank owning `ordinal`.
    pub fn owner(&self, ordinal: usize) -> usize {
        if self.block == 0 {
            0
        } else {
            (ordinal / self.block).min(self.size - 1)
        }
    }

    /// Ordinals owned by this participant.
    pub fn local_range(&self) -> Range<usize> {
        self.range_of(self.rank)
    }

    /// Ordinals owned by `rank`.
    pub fn range_of(&self, rank: usize) -> Range<usize> {
        let start = (rank * self.block).min(self.tile_count);
        let end = ((rank + 1) * self.block).min(self.tile_count);
        start..end
    }

    pub fn is_local(&self, ordinal: usize) -> bool {
        self.local_range().contains(&ordinal)
    }

    /// Copy of `norms` with every entry this participant does not own set to
    /// zero.
    pub fn retain_local<T: NormScalar>(&self, norms: &NormTensor<T>) -> NormTensor<T> {
        let local = self.local_range();
        let values = norms
            .as_slice()
            .iter()
            .enumerate()
            .map(|(i, &v)| if local.contains(&i) { v } else { T::zero() })
            .collect();
        norms.with_values(values)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_single_process_is_identity() {
        let mut buffer = vec![1.0_f64, 2.0];
        let comm = SingleProcess;
        assert_eq!(Collective::<f64>::size(&comm), 1);
        comm.all_reduce_sum(&mut buffer).unwrap();
        assert_eq!(buffer, vec![1.0, 2.0]);
    }

    #[test]
    fn test_local_group_repeated_rounds() {
        let handles: Vec<_> = LocalGroup::<f64>::new(4)
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let mut totals = Vec::new();
                    for round in 0..5 {
                        let mut buffer = vec![(comm.rank() + round) as f64, 1.0];
                        comm.all_reduce_sum(&mut buffer).unwrap();
                        totals.push(buffer);
                    }
                    totals
                })
            })
            .collect();

        for handle in handles {
            let totals = handle.join().unwrap();
            for (round, buffer) in totals.iter().enumerate() {
                // ranks 0..4 plus 4 * round
                assert_eq!(buffer, &vec![(6 + 4 * round) as f64, 4.0]);
            }
        }
    }

    #[test]
    fn test_local_group_length_mismatch() {
        let mut comms = LocalGroup::<f64>::new(2);
        let second = comms.pop().unwrap();
        let first = comms.pop().unwrap();
        let waiter = thread::spawn(move || first.all_reduce_sum(&mut [1.0, 2.0]));
        // give the first participant a chance to arrive; either order fails
        thread::sleep(std::time::Duration::from_millis(20));
        let second_result = second.all_reduce_sum(&mut [1.0]);
        let first_result = waiter.join().unwrap();
        assert!(first_result.is_err() || second_result.is_err());
        assert!(matches!(
            second.all_reduce_sum(&mut [1.0]),
            Err(ShapeError::Collective(_))
        ));
    }

    #[test]
    fn test_blocked_ownership() {
        let owners: Vec<_> = (0..3)
            .map(|r| BlockedOwnership::new(7, r, 3).unwrap())
            .collect();
        assert_eq!(owners[0].local_range(), 0..3);
        assert_eq!(owners[1].local_range(), 3..6);
        assert_eq!(owners[2].local_range(), 6..7);
        for ordinal in 0..7 {
            let owning: Vec<_> = owners.iter().filter(|o| o.is_local(ordinal)).collect();
            assert_eq!(owning.len(), 1);
            assert_eq!(owners[0].owner(ordinal), owning[0].rank);
        }
        assert!(BlockedOwnership::new(7, 3, 3).is_err());
    }

    #[test]
    fn test_more_ranks_than_tiles() {
        let owners: Vec<_> = (0..4)
            .map(|r| BlockedOwnership::new(2, r, 4).unwrap())
            .collect();
        assert_eq!(owners[0].local_range(), 0..1);
        assert_eq!(owners[1].local_range(), 1..2);
        assert!(owners[2].local_range().is_empty());
        assert!(owners[3].local_range().is_empty());
    }

    #[test]
    fn test_retain_local() {
        let norms = NormTensor::from_vec(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let owner = BlockedOwnership::new(4, 1, 2).unwrap();
        assert_eq!(owner.retain_local(&norms).as_slice(), &[0.0, 0.0, 3.0, 4.0]);
    }
}
