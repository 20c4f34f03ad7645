use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::models::{Contribution, StudentRecord, Summary};

/// A single reducer transition. Nothing mutates store state except through
/// `RecordStore::dispatch`.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Full replace from a fetch; the server is the source of truth.
    SetStudents(Vec<StudentRecord>),
    SetSummary(Summary),
    /// Replace-or-insert one server-truth record (recalculate path).
    UpsertStudent(StudentRecord),
    /// Create-or-update one record from a single contributor's upload row.
    Ingest {
        student_id: String,
        name: String,
        contribution: Contribution,
    },
    /// Authorization was rejected: show an empty-but-valid state and ask the
    /// user to re-authenticate.
    MarkUnauthorized,
    Clear,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub students: Vec<StudentRecord>,
    pub summary: Summary,
    pub needs_reauth: bool,
}

fn reduce(state: &mut StoreState, action: Action) {
    match action {
        Action::SetStudents(students) => {
            state.students = students;
            state.needs_reauth = false;
        }
        Action::SetSummary(summary) => {
            state.summary = summary;
        }
        Action::UpsertStudent(record) => {
            match state
                .students
                .iter_mut()
                .find(|s| s.student_id == record.student_id)
            {
                Some(existing) => *existing = record,
                None => state.students.push(record),
            }
        }
        Action::Ingest {
            student_id,
            name,
            contribution,
        } => {
            match state
                .students
                .iter_mut()
                .find(|s| s.student_id == student_id)
            {
                Some(existing) => existing.apply_contribution(&name, &contribution),
                None => {
                    let mut record = StudentRecord::new(student_id, name.clone());
                    record.apply_contribution(&name, &contribution);
                    state.students.push(record);
                }
            }
        }
        Action::MarkUnauthorized => {
            state.students.clear();
            state.summary = Summary::default();
            state.needs_reauth = true;
        }
        Action::Clear => {
            *state = StoreState::default();
        }
    }
}

/// In-memory cache of student records plus the aggregate summary. Reads are
/// snapshots; writes go through the reducer.
#[derive(Debug, Default)]
pub struct RecordStore {
    state: Mutex<StoreState>,
}

impl RecordStore {
    pub fn new() -> Self {
        RecordStore::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn dispatch(&self, action: Action) {
        debug!(?action, "store transition");
        reduce(&mut self.lock(), action);
    }

    pub fn snapshot(&self) -> StoreState {
        self.lock().clone()
    }

    pub fn students(&self) -> Vec<StudentRecord> {
        self.lock().students.clone()
    }

    pub fn summary(&self) -> Summary {
        self.lock().summary
    }

    pub fn needs_reauth(&self) -> bool {
        self.lock().needs_reauth
    }

    pub fn find(&self, student_id: &str) -> Option<StudentRecord> {
        self.lock()
            .students
            .iter()
            .find(|s| s.student_id == student_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::{AttendanceData, ExamData, FeesData, FeesStatus};

    fn exam(subject: &str, score: f64) -> Contribution {
        let mut scores = BTreeMap::new();
        scores.insert(subject.to_string(), score);
        Contribution::Exam(ExamData {
            scores,
            exam_type: "midterm".to_string(),
        })
    }

    fn ingest(store: &RecordStore, id: &str, name: &str, contribution: Contribution) {
        store.dispatch(Action::Ingest {
            student_id: id.to_string(),
            name: name.to_string(),
            contribution,
        });
    }

    #[test]
    fn set_students_is_a_full_replace() {
        let store = RecordStore::new();
        ingest(&store, "S-1", "Avery Lee", exam("maths", 61.0));
        store.dispatch(Action::SetStudents(vec![StudentRecord::new(
            "S-2", "Jules Moreno",
        )]));

        let students = store.students();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].student_id, "S-2");
    }

    #[test]
    fn ingesting_the_same_student_twice_updates_in_place() {
        let store = RecordStore::new();
        ingest(&store, "S-1", "Avery Lee", exam("maths", 40.0));
        ingest(&store, "S-1", "Avery Lee", exam("maths", 72.0));

        let students = store.students();
        assert_eq!(students.len(), 1);
        let exam = students[0].exam.as_ref().expect("exam data");
        assert_eq!(exam.scores.get("maths"), Some(&72.0));
    }

    #[test]
    fn faculty_ingest_never_alters_exam_or_fees() {
        let store = RecordStore::new();
        ingest(&store, "S-1", "Avery Lee", exam("maths", 58.0));
        ingest(
            &store,
            "S-1",
            "Avery Lee",
            Contribution::Fees(FeesData {
                fees_status: FeesStatus::Partial,
                amount_paid: 300.0,
                amount_due: 700.0,
                due_date: None,
            }),
        );

        ingest(
            &store,
            "S-1",
            "Avery Lee",
            Contribution::Attendance(AttendanceData {
                attendance_rate: 64.0,
            }),
        );

        let record = store.find("S-1").expect("record");
        assert_eq!(
            record.exam.as_ref().and_then(|e| e.scores.get("maths")),
            Some(&58.0)
        );
        assert_eq!(
            record.fees.as_ref().map(|f| f.fees_status),
            Some(FeesStatus::Partial)
        );
        assert_eq!(
            record.attendance.as_ref().map(|a| a.attendance_rate),
            Some(64.0)
        );
    }

    #[test]
    fn first_ingest_creates_the_record() {
        let store = RecordStore::new();
        ingest(
            &store,
            "S-9",
            "Kiara Patel",
            Contribution::Attendance(AttendanceData {
                attendance_rate: 91.0,
            }),
        );

        let record = store.find("S-9").expect("created");
        assert_eq!(record.name, "Kiara Patel");
        assert!(record.completion.faculty);
        assert!(!record.completion.exam);
    }

    #[test]
    fn upsert_replaces_or_inserts_whole_records() {
        let store = RecordStore::new();
        store.dispatch(Action::UpsertStudent(StudentRecord::new("S-1", "Old Name")));
        store.dispatch(Action::UpsertStudent(StudentRecord::new("S-1", "New Name")));
        store.dispatch(Action::UpsertStudent(StudentRecord::new("S-2", "Other")));

        let students = store.students();
        assert_eq!(students.len(), 2);
        assert_eq!(students[0].name, "New Name");
    }

    #[test]
    fn unauthorized_clears_everything_and_flags_reauth() {
        let store = RecordStore::new();
        ingest(&store, "S-1", "Avery Lee", exam("maths", 50.0));
        store.dispatch(Action::SetSummary(Summary {
            total: 1,
            high: 1,
            medium: 0,
            low: 0,
        }));

        store.dispatch(Action::MarkUnauthorized);
        let state = store.snapshot();
        assert!(state.students.is_empty());
        assert_eq!(state.summary, Summary::default());
        assert!(state.needs_reauth);

        store.dispatch(Action::SetStudents(vec![StudentRecord::new("S-1", "A")]));
        assert!(!store.needs_reauth());
    }

    #[test]
    fn clear_resets_to_initial_state() {
        let store = RecordStore::new();
        ingest(&store, "S-1", "Avery Lee", exam("maths", 50.0));
        store.dispatch(Action::Clear);
        assert_eq!(store.snapshot(), StoreState::default());
    }
}
