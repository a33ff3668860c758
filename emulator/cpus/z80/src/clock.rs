use femtos::{Duration, Frequency};

/// Monotonic count of T-states executed since the clock was created
///
/// Devices read this to schedule their own work (scanlines, audio samples), which is how they
/// stay in step with the CPU without being driven by it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Clock {
    ticks: u64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn advance(&mut self, t_states: u32) {
        self.ticks += t_states as u64;
    }

    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Real time equivalent of the elapsed ticks for a CPU running at `frequency`
    pub fn as_duration(&self, frequency: Frequency) -> Duration {
        frequency.period_duration() * self.ticks
    }
}

/// Number of whole T-states that fit in `duration` at `frequency`
pub fn duration_to_cycles(duration: Duration, frequency: Frequency) -> u64 {
    (duration / frequency.period_duration()) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_monotonically() {
        let mut clock = Clock::new();
        clock.advance(4);
        clock.advance(17);
        assert_eq!(clock.ticks(), 21);
    }

    #[test]
    fn converts_to_real_time() {
        let frequency = Frequency::from_mhz(4);
        let mut clock = Clock::new();
        clock.advance(4_000_000);
        assert_eq!(clock.as_duration(frequency), Duration::from_secs(1));
        assert_eq!(duration_to_cycles(Duration::from_millis(1), frequency), 4_000);
    }
}
