// Counts NAMES queries issued but not yet answered. A count, not a queue: a
// reply is attributed to the oldest unconsumed request by convention, so two
// in-flight queries for different channels can be misattributed.
#[derive(Debug, Default)]
pub struct RosterTracker {
    pending: u32,
}

impl RosterTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) {
        self.pending += 1;
    }

    // False marks the reply as an unrelated background roster refresh.
    pub fn consume(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        self.pending -= 1;
        true
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }
}
