/// Aggregated view of session progress, useful for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub position: usize,
    pub answered: usize,
    pub correct: u32,
    pub earned_points: u32,
    pub is_complete: bool,
}
