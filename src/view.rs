use serde::Serialize;

use crate::models::{FeesStatus, RiskLevel, StudentRecord};
use crate::session::Role;

/// Shown wherever the external risk engine has not produced a value yet.
pub const PENDING_LABEL: &str = "Pending";
pub const SCORE_PLACEHOLDER: &str = "--";

fn level_label(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "Low",
        RiskLevel::Medium => "Medium",
        RiskLevel::High => "High",
    }
}

fn fees_label(status: FeesStatus) -> &'static str {
    match status {
        FeesStatus::Complete => "complete",
        FeesStatus::Partial => "partial",
        FeesStatus::Due => "due",
        FeesStatus::Overdue => "overdue",
        FeesStatus::Pending => "pending",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskView {
    pub level: String,
    pub score: String,
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub data_complete: bool,
}

/// Projection of the externally computed classification. Renders a
/// placeholder while the assessment is absent; never derives a tier from the
/// raw fields.
pub fn risk_view(record: &StudentRecord) -> RiskView {
    match &record.assessment {
        Some(assessment) => RiskView {
            level: level_label(assessment.risk_level).to_string(),
            score: format!("{:.0}", assessment.risk_score),
            factors: assessment.risk_factors.clone(),
            recommendations: assessment.recommendations.clone(),
            data_complete: record.data_complete,
        },
        None => RiskView {
            level: PENDING_LABEL.to_string(),
            score: SCORE_PLACEHOLDER.to_string(),
            factors: Vec::new(),
            recommendations: Vec::new(),
            data_complete: record.data_complete,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionView {
    pub exam: bool,
    pub faculty: bool,
    pub guardian: bool,
    pub contributed: usize,
    pub expected: usize,
    pub complete: bool,
}

pub fn completion_view(record: &StudentRecord) -> CompletionView {
    CompletionView {
        exam: record.completion.exam,
        faculty: record.completion.faculty,
        guardian: record.completion.guardian,
        contributed: record.completion.contributed(),
        expected: 3,
        complete: record.completion.all(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterRow {
    pub student_id: String,
    pub name: String,
    pub risk: String,
    pub detail: String,
}

fn mean_score(record: &StudentRecord) -> Option<f64> {
    let exam = record.exam.as_ref()?;
    if exam.scores.is_empty() {
        return None;
    }
    Some(exam.scores.values().sum::<f64>() / exam.scores.len() as f64)
}

fn detail_for(record: &StudentRecord, role: Role) -> String {
    match role {
        Role::ExamOffice => match (mean_score(record), record.exam.as_ref()) {
            (Some(mean), Some(exam)) => format!("avg score {:.1} ({})", mean, exam.exam_type),
            _ => "no exam data yet".to_string(),
        },
        Role::Faculty => match record.attendance.as_ref() {
            Some(attendance) => format!("attendance {:.0}%", attendance.attendance_rate),
            None => "no attendance data yet".to_string(),
        },
        Role::Guardian => match record.fees.as_ref() {
            Some(fees) => {
                let mut detail = format!(
                    "fees {} (paid {:.2}, due {:.2})",
                    fees_label(fees.fees_status),
                    fees.amount_paid,
                    fees.amount_due
                );
                if let Some(date) = fees.due_date {
                    detail.push_str(&format!(" by {date}"));
                }
                detail
            }
            None => "no fees data yet".to_string(),
        },
        Role::Admin => format!(
            "{}/3 contributed",
            record.completion.contributed()
        ),
    }
}

fn risk_rank(record: &StudentRecord) -> u8 {
    match record.assessment.as_ref().map(|a| a.risk_level) {
        Some(RiskLevel::High) => 3,
        Some(RiskLevel::Medium) => 2,
        Some(RiskLevel::Low) => 1,
        None => 0,
    }
}

/// One row per student with the detail column the given role cares about,
/// highest risk first; students still awaiting classification sort last.
pub fn roster_view(records: &[StudentRecord], role: Role) -> Vec<RosterRow> {
    let mut rows: Vec<(&StudentRecord, RosterRow)> = records
        .iter()
        .map(|record| {
            let row = RosterRow {
                student_id: record.student_id.clone(),
                name: record.name.clone(),
                risk: risk_view(record).level,
                detail: detail_for(record, role),
            };
            (record, row)
        })
        .collect();

    rows.sort_by(|(a, row_a), (b, row_b)| {
        risk_rank(b)
            .cmp(&risk_rank(a))
            .then_with(|| row_a.name.cmp(&row_b.name))
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    rows.into_iter().map(|(_, row)| row).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::{
        AttendanceData, ExamData, FeesData, RiskAssessment,
    };
    use chrono::NaiveDate;

    fn assessed(id: &str, name: &str, level: RiskLevel) -> StudentRecord {
        let mut record = StudentRecord::new(id, name);
        record.assessment = Some(RiskAssessment {
            risk_level: level,
            risk_score: 72.4,
            risk_factors: vec!["low attendance".to_string()],
            recommendations: vec!["call guardian".to_string()],
        });
        record
    }

    #[test]
    fn risk_view_renders_the_assessment() {
        let view = risk_view(&assessed("S-1", "Avery Lee", RiskLevel::High));
        assert_eq!(view.level, "High");
        assert_eq!(view.score, "72");
        assert_eq!(view.factors, vec!["low attendance".to_string()]);
    }

    #[test]
    fn risk_view_falls_back_to_placeholders() {
        let view = risk_view(&StudentRecord::new("S-1", "Avery Lee"));
        assert_eq!(view.level, PENDING_LABEL);
        assert_eq!(view.score, SCORE_PLACEHOLDER);
        assert!(view.factors.is_empty());
        assert!(view.recommendations.is_empty());
        assert!(!view.data_complete);
    }

    #[test]
    fn completion_view_counts_contributors() {
        let mut record = StudentRecord::new("S-1", "Avery Lee");
        record.completion.exam = true;
        record.completion.guardian = true;

        let view = completion_view(&record);
        assert!(view.exam && view.guardian && !view.faculty);
        assert_eq!(view.contributed, 2);
        assert_eq!(view.expected, 3);
        assert!(!view.complete);
    }

    #[test]
    fn roster_detail_follows_the_role() {
        let mut record = StudentRecord::new("S-1", "Avery Lee");
        let mut scores = BTreeMap::new();
        scores.insert("maths".to_string(), 60.0);
        scores.insert("physics".to_string(), 70.0);
        record.exam = Some(ExamData {
            scores,
            exam_type: "midterm".to_string(),
        });
        record.attendance = Some(AttendanceData {
            attendance_rate: 81.0,
        });
        record.fees = Some(FeesData {
            fees_status: FeesStatus::Due,
            amount_paid: 400.0,
            amount_due: 600.0,
            due_date: NaiveDate::from_ymd_opt(2026, 9, 1),
        });
        record.completion.exam = true;

        let records = vec![record];
        assert_eq!(
            roster_view(&records, Role::ExamOffice)[0].detail,
            "avg score 65.0 (midterm)"
        );
        assert_eq!(
            roster_view(&records, Role::Faculty)[0].detail,
            "attendance 81%"
        );
        assert_eq!(
            roster_view(&records, Role::Guardian)[0].detail,
            "fees due (paid 400.00, due 600.00) by 2026-09-01"
        );
        assert_eq!(
            roster_view(&records, Role::Admin)[0].detail,
            "1/3 contributed"
        );
    }

    #[test]
    fn roster_detail_has_placeholders_for_missing_partitions() {
        let records = vec![StudentRecord::new("S-1", "Avery Lee")];
        assert_eq!(
            roster_view(&records, Role::ExamOffice)[0].detail,
            "no exam data yet"
        );
        assert_eq!(
            roster_view(&records, Role::Faculty)[0].detail,
            "no attendance data yet"
        );
        assert_eq!(
            roster_view(&records, Role::Guardian)[0].detail,
            "no fees data yet"
        );
    }

    #[test]
    fn roster_sorts_highest_risk_first_then_pending_last() {
        let records = vec![
            StudentRecord::new("S-4", "Dana Cole"),
            assessed("S-2", "Noor Haddad", RiskLevel::Low),
            assessed("S-1", "Avery Lee", RiskLevel::High),
            assessed("S-3", "Jules Moreno", RiskLevel::Medium),
        ];

        let rows = roster_view(&records, Role::Admin);
        let order: Vec<&str> = rows.iter().map(|r| r.student_id.as_str()).collect();
        assert_eq!(order, vec!["S-1", "S-3", "S-2", "S-4"]);
        assert_eq!(rows[3].risk, PENDING_LABEL);
    }
}
