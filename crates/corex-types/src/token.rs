use serde::{Deserialize, Serialize};

/// Running input/output pair plus derived total. Monotonically
/// non-decreasing within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounter {
    pub input: u64,
    pub output: u64,
}

impl TokenCounter {
    pub fn total(&self) -> u64 {
        self.input + self.output
    }

    pub fn add(&mut self, input: u64, output: u64) {
        self.input += input;
        self.output += output;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_sum_and_monotonic_across_adds() {
        let mut c = TokenCounter::default();
        c.add(10, 5);
        c.add(3, 7);
        assert_eq!(c.input, 13);
        assert_eq!(c.output, 12);
        assert_eq!(c.total(), 25);
    }
}
