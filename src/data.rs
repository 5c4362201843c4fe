use csv::Reader;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{AttemptRecord, InteractionRecord, StudentId, StudentRecords};

pub fn load_interactions(path: impl AsRef<Path>) -> Result<Vec<InteractionRecord>> {
    let rdr = Reader::from_path(path)?;
    read_records(rdr, InteractionRecord::validate)
}

pub fn load_attempts(path: impl AsRef<Path>) -> Result<Vec<AttemptRecord>> {
    let rdr = Reader::from_path(path)?;
    read_records(rdr, AttemptRecord::validate)
}

pub fn read_interactions<R: io::Read>(reader: R) -> Result<Vec<InteractionRecord>> {
    read_records(Reader::from_reader(reader), InteractionRecord::validate)
}

pub fn read_attempts<R: io::Read>(reader: R) -> Result<Vec<AttemptRecord>> {
    read_records(Reader::from_reader(reader), AttemptRecord::validate)
}

fn read_records<R, T>(mut rdr: Reader<R>, validate: fn(&T) -> Result<()>) -> Result<Vec<T>>
where
    R: io::Read,
    T: DeserializeOwned,
{
    let mut records = Vec::new();

    for (idx, result) in rdr.deserialize::<T>().enumerate() {
        let record = result?;
        // header is line 1
        let line = idx + 2;
        validate(&record).map_err(|err| match err {
            Error::InvalidInput { field, reason } => {
                tracing::warn!(line, field, "rejected record: {}", reason);
                Error::invalid(field, format!("{reason} (line {line})"))
            }
            other => other,
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Splits flat record lists into one entry per student, ordered by id.
pub fn group_by_student(
    interactions: Vec<InteractionRecord>,
    attempts: Vec<AttemptRecord>,
) -> BTreeMap<StudentId, StudentRecords> {
    let mut students: BTreeMap<StudentId, StudentRecords> = BTreeMap::new();
    for interaction in interactions {
        students
            .entry(interaction.student_id)
            .or_default()
            .interactions
            .push(interaction);
    }
    for attempt in attempts {
        students
            .entry(attempt.student_id)
            .or_default()
            .attempts
            .push(attempt);
    }
    students
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const INTERACTIONS: &str = "\
student_id,timestamp,interaction_type,content_id,duration,performance_score
1,2024-03-01T09:30:00,lesson_view,4,320,
1,2024-03-02T18:10:00,quiz_attempt,2,600,0.75
2,2024-03-02T21:00:00,puzzle_solve,,,
";

    const ATTEMPTS: &str = "\
student_id,quiz_id,score,total_points,completed_at
1,2,6,8,2024-03-02T18:20:00
3,2,4,8,2024-03-05T10:00:00
";

    #[test]
    fn reads_optional_cells_as_none() {
        let records = read_interactions(INTERACTIONS.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].performance_score, None);
        assert_eq!(records[1].performance_score, Some(0.75));
        assert_eq!(records[2].content_id, None);
        assert_eq!(records[2].duration, None);
    }

    #[test]
    fn rejects_negative_points_with_line_number() {
        let csv = "student_id,quiz_id,score,total_points,completed_at\n\
                   1,2,6,8,2024-03-02T18:20:00\n\
                   1,3,1,-4,2024-03-03T18:20:00\n";
        let err = read_attempts(csv.as_bytes()).unwrap_err();
        match err {
            Error::InvalidInput { field, reason } => {
                assert_eq!(field, "total_points");
                assert!(reason.contains("line 3"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ATTEMPTS.as_bytes()).unwrap();
        let attempts = load_attempts(file.path()).unwrap();
        assert_eq!(attempts.len(), 2);
        assert!((attempts[0].score_percentage() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn groups_students_from_either_collection() {
        let interactions = read_interactions(INTERACTIONS.as_bytes()).unwrap();
        let attempts = read_attempts(ATTEMPTS.as_bytes()).unwrap();
        let students = group_by_student(interactions, attempts);
        assert_eq!(students.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(students[&1].interactions.len(), 2);
        assert_eq!(students[&1].attempts.len(), 1);
        assert!(students[&3].interactions.is_empty());
    }
}
