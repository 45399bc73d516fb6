use crate::kernel::timer::Clock;

pub struct StopWatch<'a> {
    start_time: u64,
    name: &'static str,
    clock: &'a dyn Clock,
}

impl<'a> StopWatch<'a> {
    pub fn new(name: &'static str, clock: &'a dyn Clock) -> StopWatch<'a> {
        StopWatch {
            start_time: clock.cycles(),
            name,
            clock,
        }
    }
}

impl<'a> Drop for StopWatch<'a> {
    fn drop(&mut self) {
        let end_time = self.clock.cycles();
        let time = self
            .clock
            .cycles_to_us(end_time.saturating_sub(self.start_time));

        dbgln!(stopwatch, "{} took {} us", self.name, time);
    }
}
