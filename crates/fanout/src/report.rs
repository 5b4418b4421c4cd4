//! DeliveryReport - outcomes of one fan-out

use contracts::{DeliveryOutcome, DeliveryStatus};

/// All outcomes of one `deliver` call, in completion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DeliveryReport {
    /// Number of attempted sends
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    /// Failed outcomes with their reasons
    pub fn failures(&self) -> impl Iterator<Item = (&DeliveryOutcome, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            DeliveryStatus::Failure(reason) => Some((o, reason.as_str())),
            DeliveryStatus::Success => None,
        })
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: DeliveryReport) {
        self.outcomes.extend(other.outcomes);
    }
}
