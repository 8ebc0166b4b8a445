/// Required key-op quorum for the given block height.
///
/// One co-signature suffices below height 149; from there the requirement
/// grows as the truncation of `ln(height) * 2`.
pub fn quorum_for_height(height: u64) -> usize {
    if height < 149 {
        return 1;
    }
    ((height as f64).ln() * 2.0) as usize
}
