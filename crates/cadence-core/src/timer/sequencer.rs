//! Phase sequencing.

/// Index of the phase after `current_index`.
///
/// A return value of `0` means the sequence wrapped and a cycle completed.
/// `phase_count` must be non-zero; techniques are validated before a session
/// starts, so the engine never calls this with an empty sequence.
pub fn next_index(current_index: usize, phase_count: usize) -> usize {
    debug_assert!(phase_count > 0);
    (current_index + 1) % phase_count
}

/// Whether advancing from `current_index` wraps back to the first phase.
pub fn wraps(current_index: usize, phase_count: usize) -> bool {
    next_index(current_index, phase_count) == 0
}
