use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeesStatus {
    Complete,
    Partial,
    Due,
    Overdue,
    Pending,
}

/// The three roles that contribute data for a student. Each owns a disjoint
/// slice of the record; nothing outside that slice is writable by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Contributor {
    ExamOffice,
    Faculty,
    Guardian,
}

impl Contributor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Contributor::ExamOffice => "exam_office",
            Contributor::Faculty => "faculty",
            Contributor::Guardian => "guardian",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamData {
    /// Subject name mapped to score, 0-100.
    pub scores: BTreeMap<String, f64>,
    pub exam_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceData {
    /// Percentage, 0-100.
    pub attendance_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeesData {
    pub fees_status: FeesStatus,
    pub amount_paid: f64,
    pub amount_due: f64,
    pub due_date: Option<NaiveDate>,
}

/// One contributor's partial upload for a single student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Contribution {
    Exam(ExamData),
    Attendance(AttendanceData),
    Fees(FeesData),
}

impl Contribution {
    pub fn contributor(&self) -> Contributor {
        match self {
            Contribution::Exam(_) => Contributor::ExamOffice,
            Contribution::Attendance(_) => Contributor::Faculty,
            Contribution::Fees(_) => Contributor::Guardian,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionFlags {
    pub exam: bool,
    pub faculty: bool,
    pub guardian: bool,
}

impl CompletionFlags {
    pub fn mark(&mut self, contributor: Contributor) {
        match contributor {
            Contributor::ExamOffice => self.exam = true,
            Contributor::Faculty => self.faculty = true,
            Contributor::Guardian => self.guardian = true,
        }
    }

    pub fn has(&self, contributor: Contributor) -> bool {
        match contributor {
            Contributor::ExamOffice => self.exam,
            Contributor::Faculty => self.faculty,
            Contributor::Guardian => self.guardian,
        }
    }

    pub fn contributed(&self) -> usize {
        [self.exam, self.faculty, self.guardian]
            .iter()
            .filter(|set| **set)
            .count()
    }

    pub fn all(&self) -> bool {
        self.exam && self.faculty && self.guardian
    }
}

/// Computed server-side by the risk engine; read-only in this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    /// 0-100.
    pub risk_score: f64,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_id: String,
    pub name: String,
    #[serde(default)]
    pub exam: Option<ExamData>,
    #[serde(default)]
    pub attendance: Option<AttendanceData>,
    #[serde(default)]
    pub fees: Option<FeesData>,
    #[serde(default)]
    pub assessment: Option<RiskAssessment>,
    #[serde(default)]
    pub data_complete: bool,
    #[serde(default)]
    pub completion: CompletionFlags,
}

impl StudentRecord {
    pub fn new(student_id: impl Into<String>, name: impl Into<String>) -> Self {
        StudentRecord {
            student_id: student_id.into(),
            name: name.into(),
            exam: None,
            attendance: None,
            fees: None,
            assessment: None,
            data_complete: false,
            completion: CompletionFlags::default(),
        }
    }

    /// Write one contributor's slice of the record. Only that slice and the
    /// shared name field change; the other partitions and the server-derived
    /// fields are untouched.
    pub fn apply_contribution(&mut self, name: &str, contribution: &Contribution) {
        if !name.is_empty() {
            self.name = name.to_string();
        }
        match contribution {
            Contribution::Exam(data) => self.exam = Some(data.clone()),
            Contribution::Attendance(data) => self.attendance = Some(data.clone()),
            Contribution::Fees(data) => self.fees = Some(data.clone()),
        }
        self.completion.mark(contribution.contributor());
    }
}

/// Aggregate counts over the server's current data, cached alongside the
/// student list and never left stale across a failed refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentFilters {
    pub risk_level: Option<RiskLevel>,
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exam_data() -> Contribution {
        let mut scores = BTreeMap::new();
        scores.insert("maths".to_string(), 42.0);
        scores.insert("physics".to_string(), 55.0);
        Contribution::Exam(ExamData {
            scores,
            exam_type: "midterm".to_string(),
        })
    }

    #[test]
    fn contribution_writes_only_its_partition() {
        let mut record = StudentRecord::new("S-100", "Avery Lee");
        record.apply_contribution("Avery Lee", &exam_data());
        record.apply_contribution(
            "Avery Lee",
            &Contribution::Fees(FeesData {
                fees_status: FeesStatus::Due,
                amount_paid: 400.0,
                amount_due: 600.0,
                due_date: NaiveDate::from_ymd_opt(2026, 9, 1),
            }),
        );

        record.apply_contribution(
            "Avery Lee",
            &Contribution::Attendance(AttendanceData {
                attendance_rate: 81.5,
            }),
        );

        let exam = record.exam.as_ref().expect("exam partition kept");
        assert_eq!(exam.exam_type, "midterm");
        assert_eq!(exam.scores.get("maths"), Some(&42.0));
        let fees = record.fees.as_ref().expect("fees partition kept");
        assert_eq!(fees.fees_status, FeesStatus::Due);
        assert_eq!(
            record.attendance.as_ref().map(|a| a.attendance_rate),
            Some(81.5)
        );
    }

    #[test]
    fn contribution_never_touches_derived_fields() {
        let mut record = StudentRecord::new("S-101", "Jules Moreno");
        record.assessment = Some(RiskAssessment {
            risk_level: RiskLevel::High,
            risk_score: 88.0,
            risk_factors: vec!["low attendance".to_string()],
            recommendations: vec!["schedule counselling".to_string()],
        });
        record.data_complete = true;

        record.apply_contribution(
            "Jules Moreno",
            &Contribution::Attendance(AttendanceData {
                attendance_rate: 40.0,
            }),
        );

        let assessment = record.assessment.as_ref().expect("assessment kept");
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(assessment.risk_score, 88.0);
        assert!(record.data_complete);
    }

    #[test]
    fn completion_flags_track_contributors() {
        let mut record = StudentRecord::new("S-102", "Kiara Patel");
        assert_eq!(record.completion.contributed(), 0);

        record.apply_contribution("Kiara Patel", &exam_data());
        assert!(record.completion.has(Contributor::ExamOffice));
        assert!(!record.completion.has(Contributor::Faculty));
        assert_eq!(record.completion.contributed(), 1);
        assert!(!record.completion.all());
    }

    #[test]
    fn empty_name_does_not_blank_identity() {
        let mut record = StudentRecord::new("S-103", "Avery Lee");
        record.apply_contribution("", &exam_data());
        assert_eq!(record.name, "Avery Lee");
    }

    #[test]
    fn partial_wire_record_deserializes_with_defaults() {
        let raw = r#"{"student_id":"S-200","name":"Sam Ode"}"#;
        let record: StudentRecord = serde_json::from_str(raw).expect("partial record");
        assert!(record.exam.is_none());
        assert!(record.assessment.is_none());
        assert!(!record.data_complete);
        assert_eq!(record.completion.contributed(), 0);
    }

    #[test]
    fn risk_level_round_trips_lowercase() {
        assert_eq!(serde_json::to_string(&RiskLevel::High).unwrap(), r#""high""#);
        let level: RiskLevel = serde_json::from_str(r#""medium""#).unwrap();
        assert_eq!(level, RiskLevel::Medium);
    }
}
