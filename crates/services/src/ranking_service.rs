use std::sync::Arc;

use exam_core::model::{Role, Student, StudentId};
use storage::repository::{StorageError, StudentRepository};

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingEntry {
    /// 1-based.
    pub position: usize,
    pub student_id: StudentId,
    pub name: String,
    pub points: u64,
    pub streak: u32,
    pub accuracy_percent: u8,
}

/// Order students by points, highest first; ties are broken by name.
#[must_use]
pub fn rank(students: &[Student]) -> Vec<RankingEntry> {
    let mut sorted: Vec<&Student> = students
        .iter()
        .filter(|s| s.role() == Role::Student)
        .collect();
    sorted.sort_by(|a, b| {
        b.stats()
            .points
            .cmp(&a.stats().points)
            .then_with(|| a.name().cmp(b.name()))
    });

    sorted
        .into_iter()
        .enumerate()
        .map(|(index, student)| RankingEntry {
            position: index + 1,
            student_id: student.id(),
            name: student.name().to_string(),
            points: student.stats().points,
            streak: student.stats().streak,
            accuracy_percent: student.stats().accuracy_percent(),
        })
        .collect()
}

/// Gamified leaderboard over every registered student.
#[derive(Clone)]
pub struct RankingService {
    students: Arc<dyn StudentRepository>,
}

impl RankingService {
    #[must_use]
    pub fn new(students: Arc<dyn StudentRepository>) -> Self {
        Self { students }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    pub async fn leaderboard(&self) -> Result<Vec<RankingEntry>, StorageError> {
        let students = self.students.list_students().await?;
        Ok(rank(&students))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{SessionOutcome, StudentStats};

    fn student(id: u64, name: &str, points: u64, role: Role) -> Student {
        let stats = StudentStats {
            points,
            ..StudentStats::default()
        };
        Student::from_persisted(
            StudentId::new(id),
            name,
            &format!("{}@escola.br", name.to_lowercase()),
            role,
            stats,
        )
        .unwrap()
    }

    #[test]
    fn ranks_by_points_then_name() {
        let students = vec![
            student(1, "Caio", 300, Role::Student),
            student(2, "Bia", 900, Role::Student),
            student(3, "Ana", 300, Role::Student),
            student(4, "Prof", 10_000, Role::Teacher),
        ];
        let board = rank(&students);
        let names: Vec<_> = board.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Bia", "Ana", "Caio"]);
        let positions: Vec<_> = board.iter().map(|e| e.position).collect();
        assert_eq!(positions, [1, 2, 3]);
    }

    #[test]
    fn accuracy_is_rounded_and_zero_without_answers() {
        let mut s = student(1, "Ana", 0, Role::Student);
        assert_eq!(rank(std::slice::from_ref(&s))[0].accuracy_percent, 0);

        s.apply_outcome(&SessionOutcome::new(2, 3, 200, 0));
        let entry = &rank(&[s])[0];
        assert_eq!(entry.accuracy_percent, 67);
        assert_eq!(entry.points, 200);
        assert_eq!(entry.streak, 1);
    }
}
