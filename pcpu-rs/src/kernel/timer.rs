/// Monotonic cycle counter plus the conversion needed to budget in
/// microseconds.
pub trait Clock: Sync {
    fn cycles(&self) -> u64;

    fn us_to_cycles(&self, us: u64) -> u64;

    fn udelay(&self, us: u64) {
        let dest = self.cycles().saturating_add(self.us_to_cycles(us));

        while self.cycles() < dest {
            core::hint::spin_loop();
        }
    }

    fn cycles_to_us(&self, cycles: u64) -> u64 {
        let per_ms = self.us_to_cycles(1000).max(1);
        cycles.saturating_mul(1000) / per_ms
    }
}

/// A point in time `budget` microseconds after creation.
pub struct Deadline<'a> {
    clock: &'a dyn Clock,
    start: u64,
    expires: u64,
}

impl<'a> Deadline<'a> {
    pub fn after_us(clock: &'a dyn Clock, budget_us: u64) -> Deadline<'a> {
        let start = clock.cycles();

        Deadline {
            clock,
            start,
            expires: start.saturating_add(clock.us_to_cycles(budget_us)),
        }
    }

    pub fn expired(&self) -> bool {
        self.clock.cycles() >= self.expires
    }

    pub fn elapsed_us(&self) -> u64 {
        self.clock
            .cycles_to_us(self.clock.cycles().saturating_sub(self.start))
    }

    /// Poll `cond` every `step_us` until it holds or the deadline passes.
    /// Returns the last value of `cond`.
    pub fn wait_until<F: FnMut() -> bool>(&self, step_us: u64, mut cond: F) -> bool {
        loop {
            if cond() {
                return true;
            }

            if self.expired() {
                return cond();
            }

            self.clock.udelay(step_us);
        }
    }
}
