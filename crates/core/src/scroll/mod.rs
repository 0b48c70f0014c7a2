/// Decides when scroll movement is fast enough to be heard.
///
/// The gate compares each offset against the previous one and fires when the
/// jump exceeds the threshold. No debounce exists beyond this: a slow,
/// continuous scroll never fires, a flick fires once per event that moves
/// far enough.
#[derive(Debug, Clone)]
pub struct ScrollGate {
    threshold: f64,
    last_offset: f64,
}

impl ScrollGate {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last_offset: 0.0,
        }
    }

    /// Records `offset` and returns true if the distance from the previous
    /// offset is strictly greater than the threshold.
    ///
    /// Negative offsets (overscroll bounce) are stored as zero.
    pub fn observe(&mut self, offset: f64) -> bool {
        let delta = (offset - self.last_offset).abs();
        self.last_offset = if offset > 0.0 { offset } else { 0.0 };
        delta > self.threshold
    }

    pub fn last_offset(&self) -> f64 {
        self.last_offset
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}
