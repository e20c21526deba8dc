//! Static syllabus reference data.
//!
//! The exam is split into three legs, each covering three subjects. Every
//! subject groups one or more question-bank categories and carries the
//! question quota and time allowance used by the mock exam.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub type CategoryId = i64;

// ==================== Legs ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Leg {
    TechnicalLegal,
    HumanEnvironment,
    PlanningNavigation,
}

impl Leg {
    pub const ALL: [Leg; 3] = [
        Leg::TechnicalLegal,
        Leg::HumanEnvironment,
        Leg::PlanningNavigation,
    ];

    pub const fn number(self) -> u8 {
        match self {
            Leg::TechnicalLegal => 1,
            Leg::HumanEnvironment => 2,
            Leg::PlanningNavigation => 3,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|leg| leg.number() == number)
    }

    pub const fn title(self) -> &'static str {
        match self {
            Leg::TechnicalLegal => "Leg 1: Technical & Legal",
            Leg::HumanEnvironment => "Leg 2: Human & Environment",
            Leg::PlanningNavigation => "Leg 3: Planning & Navigation",
        }
    }

    pub fn subject_quotas(self) -> &'static [SubjectQuota] {
        match self {
            Leg::TechnicalLegal => &SYLLABUS[0..3],
            Leg::HumanEnvironment => &SYLLABUS[3..6],
            Leg::PlanningNavigation => &SYLLABUS[6..9],
        }
    }

    pub fn subjects(self) -> impl Iterator<Item = Subject> {
        self.subject_quotas().iter().map(|quota| quota.subject)
    }

    /// Questions in a full mock exam for this leg.
    pub fn total_questions(self) -> usize {
        self.subject_quotas().iter().map(|q| q.question_count).sum()
    }

    pub fn time_limit_minutes(self) -> u32 {
        self.subject_quotas().iter().map(|q| q.time_minutes).sum()
    }

    pub fn time_limit(self) -> Duration {
        Duration::from_secs(u64::from(self.time_limit_minutes()) * 60)
    }

    /// Resolves a category to a subject, restricted to this leg.
    pub fn subject_for_category(self, category: CategoryId) -> Option<Subject> {
        self.subject_quotas()
            .iter()
            .find(|quota| quota.category_ids.contains(&category))
            .map(|quota| quota.subject)
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

// ==================== Subjects ====================

/// Declaration order matches the row order of [`SYLLABUS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Subject {
    AircraftGeneralKnowledge,
    PrinciplesOfFlight,
    AirLaw,
    Meteorology,
    HumanPerformance,
    Communications,
    Navigation,
    FlightPerformancePlanning,
    OperationalProcedures,
}

impl Subject {
    pub const ALL: [Subject; 9] = [
        Subject::AircraftGeneralKnowledge,
        Subject::PrinciplesOfFlight,
        Subject::AirLaw,
        Subject::Meteorology,
        Subject::HumanPerformance,
        Subject::Communications,
        Subject::Navigation,
        Subject::FlightPerformancePlanning,
        Subject::OperationalProcedures,
    ];

    pub fn quota(self) -> &'static SubjectQuota {
        &SYLLABUS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.quota().name
    }

    pub fn leg(self) -> Leg {
        self.quota().leg
    }

    pub fn category_ids(self) -> &'static [CategoryId] {
        self.quota().category_ids
    }

    pub fn for_category(category: CategoryId) -> Option<Subject> {
        SYLLABUS
            .iter()
            .find(|quota| quota.category_ids.contains(&category))
            .map(|quota| quota.subject)
    }

    /// Accepts the display name or the camelCase identifier, case-insensitively.
    pub fn parse(value: &str) -> Option<Subject> {
        let needle = value.trim().to_lowercase();
        Self::ALL.into_iter().find(|subject| {
            subject.name().to_lowercase() == needle
                || format!("{subject:?}").to_lowercase() == needle
        })
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ==================== Quota table ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectQuota {
    pub subject: Subject,
    pub leg: Leg,
    pub name: &'static str,
    pub category_ids: &'static [CategoryId],
    pub question_count: usize,
    pub time_minutes: u32,
}

pub static SYLLABUS: [SubjectQuota; 9] = [
    SubjectQuota {
        subject: Subject::AircraftGeneralKnowledge,
        leg: Leg::TechnicalLegal,
        name: "Aircraft General Knowledge",
        category_ids: &[560, 528],
        question_count: 20,
        time_minutes: 35,
    },
    SubjectQuota {
        subject: Subject::PrinciplesOfFlight,
        leg: Leg::TechnicalLegal,
        name: "Principles of Flight",
        category_ids: &[555],
        question_count: 20,
        time_minutes: 45,
    },
    SubjectQuota {
        subject: Subject::AirLaw,
        leg: Leg::TechnicalLegal,
        name: "Air Law",
        category_ids: &[551],
        question_count: 20,
        time_minutes: 45,
    },
    SubjectQuota {
        subject: Subject::Meteorology,
        leg: Leg::HumanEnvironment,
        name: "Meteorology",
        category_ids: &[553],
        question_count: 20,
        time_minutes: 45,
    },
    SubjectQuota {
        subject: Subject::HumanPerformance,
        leg: Leg::HumanEnvironment,
        name: "Human Performance",
        category_ids: &[552],
        question_count: 20,
        time_minutes: 30,
    },
    SubjectQuota {
        subject: Subject::Communications,
        leg: Leg::HumanEnvironment,
        name: "Communications",
        category_ids: &[554],
        question_count: 20,
        time_minutes: 30,
    },
    SubjectQuota {
        subject: Subject::Navigation,
        leg: Leg::PlanningNavigation,
        name: "Navigation",
        category_ids: &[501, 500],
        question_count: 20,
        time_minutes: 65,
    },
    SubjectQuota {
        subject: Subject::FlightPerformancePlanning,
        leg: Leg::PlanningNavigation,
        name: "Flight Performance & Planning",
        category_ids: &[557, 558, 559],
        question_count: 20,
        time_minutes: 95,
    },
    SubjectQuota {
        subject: Subject::OperationalProcedures,
        leg: Leg::PlanningNavigation,
        name: "Operational Procedures",
        category_ids: &[556],
        question_count: 20,
        time_minutes: 30,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rows_follow_subject_order() {
        for (index, subject) in Subject::ALL.into_iter().enumerate() {
            assert_eq!(SYLLABUS[index].subject, subject);
            assert_eq!(subject.quota().subject, subject);
        }
    }

    #[test]
    fn every_leg_is_sixty_questions() {
        for leg in Leg::ALL {
            assert_eq!(leg.total_questions(), 60);
            assert!(leg.subjects().all(|s| s.leg() == leg));
        }
        assert_eq!(Leg::TechnicalLegal.time_limit_minutes(), 125);
        assert_eq!(Leg::HumanEnvironment.time_limit_minutes(), 105);
        assert_eq!(Leg::PlanningNavigation.time_limit_minutes(), 190);
        assert_eq!(Leg::TechnicalLegal.time_limit(), Duration::from_secs(125 * 60));
    }

    #[test]
    fn categories_resolve_to_subjects() {
        assert_eq!(Subject::for_category(528), Some(Subject::AircraftGeneralKnowledge));
        assert_eq!(Subject::for_category(558), Some(Subject::FlightPerformancePlanning));
        assert_eq!(Subject::for_category(1), None);
        assert_eq!(Leg::TechnicalLegal.subject_for_category(553), None);
        assert_eq!(
            Leg::HumanEnvironment.subject_for_category(553),
            Some(Subject::Meteorology)
        );
    }

    #[test]
    fn parses_names_and_numbers() {
        assert_eq!(Subject::parse("air law"), Some(Subject::AirLaw));
        assert_eq!(Subject::parse("meteorology"), Some(Subject::Meteorology));
        assert_eq!(Subject::parse("humanPerformance"), Some(Subject::HumanPerformance));
        assert_eq!(Subject::parse("astrology"), None);
        assert_eq!(Leg::from_number(2), Some(Leg::HumanEnvironment));
        assert_eq!(Leg::from_number(4), None);
    }
}
