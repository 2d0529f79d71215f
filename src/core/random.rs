/// Seedable randomness shared by instructions during a walk.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Uniform real sampling. Same seed and same call order give the same draws.
pub trait RandomSource {
    /// A real in `[low, high]` when `inclusive`, otherwise `[low, high)`.
    /// Returns `low` for an empty or degenerate range, and for one whose
    /// bounds or width are not finite.
    fn real(&mut self, low: f64, high: f64, inclusive: bool) -> f64;
}

/// Widest range `SeededRandom` samples from; the uniform sampler scales by
/// the width and needs it to stay finite.
const MAX_SPAN: f64 = f64::MAX / 2.0;

/// `StdRng`-backed source.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn real(&mut self, low: f64, high: f64, inclusive: bool) -> f64 {
        if !(low < high) || !low.is_finite() || !high.is_finite() || high - low > MAX_SPAN {
            return low;
        }
        if inclusive {
            self.rng.gen_range(low..=high)
        } else {
            self.rng.gen_range(low..high)
        }
    }
}

/// Handle to one sequential random stream.
///
/// Cloning copies the handle, so a context snapshot pushed on the branch
/// stack keeps drawing from the same stream as the live context.
#[derive(Clone)]
pub struct RandomCursor {
    source: Rc<RefCell<dyn RandomSource>>,
}

impl RandomCursor {
    pub fn new<R: RandomSource + 'static>(source: R) -> Self {
        Self {
            source: Rc::new(RefCell::new(source)),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(SeededRandom::new(seed))
    }

    pub fn real(&self, low: f64, high: f64, inclusive: bool) -> f64 {
        self.source.borrow_mut().real(low, high, inclusive)
    }

    /// True when both handles point at the same stream.
    pub fn shares_stream(&self, other: &RandomCursor) -> bool {
        Rc::ptr_eq(&self.source, &other.source)
    }
}

impl fmt::Debug for RandomCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomCursor")
            .field("handles", &Rc::strong_count(&self.source))
            .finish()
    }
}
