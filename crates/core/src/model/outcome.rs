use serde::Serialize;

/// Final tally of a finished session: `(correct, answered, earned, bonus)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionOutcome {
    pub correct_count: u32,
    pub answered_count: u32,
    pub earned_points: u32,
    pub bonus_points: u32,
}

impl SessionOutcome {
    #[must_use]
    pub fn new(correct_count: u32, answered_count: u32, earned_points: u32, bonus_points: u32) -> Self {
        Self {
            correct_count,
            answered_count,
            earned_points,
            bonus_points,
        }
    }

    /// Earned points plus any exam or mission bonus.
    #[must_use]
    pub fn total_points(&self) -> u64 {
        u64::from(self.earned_points) + u64::from(self.bonus_points)
    }

    #[must_use]
    pub fn as_tuple(&self) -> (u32, u32, u32, u32) {
        (
            self.correct_count,
            self.answered_count,
            self.earned_points,
            self.bonus_points,
        )
    }
}
