use crate::catalog::TrackRef;
use rand::seq::SliceRandom;
use rand::Rng;

/// Uniformly random permutation of `tracks`.
///
/// `SliceRandom::shuffle` is a Fisher-Yates shuffle, so every order is
/// equally likely.
pub fn shuffle<R: Rng + ?Sized>(tracks: &[TrackRef], rng: &mut R) -> Vec<TrackRef> {
    let mut order = tracks.to_vec();
    order.shuffle(rng);
    order
}
