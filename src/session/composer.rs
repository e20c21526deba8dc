//! Question selection for every session kind.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::catalog::{CatalogError, CatalogQuestion, QuestionCatalog, QuestionId};
use crate::config::{SessionSizes, TrainerConfig, WeakAreaParams};
use crate::due_set::DueSet;
use crate::memory::MemoryStateStore;
use crate::session::{
    ComposedSession, PresentedQuestion, QuotaShortfall, SessionKind, SessionRequest,
};
use crate::syllabus::{Leg, Subject};

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("not enough questions for {leg}: requested {requested}, available {available}")]
    InsufficientQuestions {
        leg: Leg,
        requested: usize,
        available: usize,
    },

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone, Default)]
pub struct SessionComposer {
    sizes: SessionSizes,
    weak_area: WeakAreaParams,
}

impl SessionComposer {
    pub fn new(config: &TrainerConfig) -> Self {
        Self {
            sizes: config.sessions.clone(),
            weak_area: config.weak_area.clone(),
        }
    }

    pub fn sizes(&self) -> &SessionSizes {
        &self.sizes
    }

    /// Builds a session from a precomputed due set. Ids in `due_set` that
    /// fall outside the request's subjects are ignored.
    pub fn compose<C, R>(
        &self,
        request: &SessionRequest,
        catalog: &C,
        due_set: &DueSet,
        rng: &mut R,
    ) -> Result<ComposedSession, ComposeError>
    where
        C: QuestionCatalog + ?Sized,
        R: Rng + ?Sized,
    {
        let subjects = request.subjects();
        let questions = catalog.fetch_eligible_questions(&subjects)?;
        self.compose_from(request, &subjects, &questions, catalog, due_set, rng)
    }

    /// Same as [`compose`](Self::compose), deriving the due set from `store`.
    pub fn compose_with_store<C, R>(
        &self,
        request: &SessionRequest,
        catalog: &C,
        store: &MemoryStateStore,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<ComposedSession, ComposeError>
    where
        C: QuestionCatalog + ?Sized,
        R: Rng + ?Sized,
    {
        let subjects = request.subjects();
        let questions = catalog.fetch_eligible_questions(&subjects)?;
        let due_set = store.due_set(now, questions.iter().map(|q| q.id));
        self.compose_from(request, &subjects, &questions, catalog, &due_set, rng)
    }

    fn compose_from<C, R>(
        &self,
        request: &SessionRequest,
        subjects: &[Subject],
        questions: &[CatalogQuestion],
        catalog: &C,
        due_set: &DueSet,
        rng: &mut R,
    ) -> Result<ComposedSession, ComposeError>
    where
        C: QuestionCatalog + ?Sized,
        R: Rng + ?Sized,
    {
        let pool = QuestionPool::new(questions, subjects);
        let size = request.resolved_size(&self.sizes);

        let mut shortfalls = Vec::new();
        let selected = match request.kind {
            SessionKind::DueReview => select_due_review(&pool, due_set, size, &HashSet::new()),
            SessionKind::WeakAreaFocus => {
                self.select_weak_area(&pool, subjects, catalog, due_set, size)?
            }
            SessionKind::NewMaterial => select_new_material(&pool, due_set, size, rng),
            SessionKind::FullPractice => select_full_practice(&pool, size, rng),
            SessionKind::TimedMockExam { leg } => {
                let (ids, missing) = select_mock_exam(&pool, leg, rng);
                if ids.is_empty() {
                    return Err(ComposeError::InsufficientQuestions {
                        leg,
                        requested: leg.total_questions(),
                        available: 0,
                    });
                }
                for shortfall in &missing {
                    tracing::warn!(
                        subject = %shortfall.subject,
                        requested = shortfall.requested,
                        available = shortfall.available,
                        "mock exam quota shortfall"
                    );
                }
                shortfalls = missing;
                ids
            }
        };

        let questions: Vec<PresentedQuestion> = selected
            .into_iter()
            .filter_map(|id| pool.get(id))
            .map(|(question, subject)| {
                let subject = match request.kind {
                    SessionKind::TimedMockExam { leg } => {
                        leg.subject_for_category(question.category_id).unwrap_or(subject)
                    }
                    _ => subject,
                };
                PresentedQuestion::present(question, subject, rng)
            })
            .collect();

        tracing::info!(
            kind = request.kind.title(),
            requested = size,
            composed = questions.len(),
            pool = pool.len(),
            partial = !shortfalls.is_empty(),
            "session composed"
        );

        Ok(ComposedSession {
            request: request.clone(),
            questions,
            shortfalls,
        })
    }

    fn select_weak_area<C>(
        &self,
        pool: &QuestionPool<'_>,
        subjects: &[Subject],
        catalog: &C,
        due_set: &DueSet,
        size: usize,
    ) -> Result<Vec<QuestionId>, ComposeError>
    where
        C: QuestionCatalog + ?Sized,
    {
        let weakest = self.weak_subjects(subjects, catalog)?;
        if weakest.is_empty() {
            tracing::debug!("no subject has enough history, falling back to due review");
            return Ok(select_due_review(pool, due_set, size, &HashSet::new()));
        }

        let mut picked = Vec::with_capacity(size);
        let mut taken = HashSet::new();
        for subject in &weakest {
            let due = due_set.due.iter().chain(due_set.unseen.iter());
            for &id in due.filter(|id| pool.subject_of(**id) == Some(*subject)) {
                if picked.len() == size {
                    break;
                }
                if taken.insert(id) {
                    picked.push(id);
                }
            }
        }

        if picked.len() < size {
            let top_up = select_due_review(pool, due_set, size - picked.len(), &taken);
            picked.extend(top_up);
        }

        tracing::debug!(subjects = ?weakest, selected = picked.len(), "weak areas selected");
        Ok(picked)
    }

    /// Subjects ranked by error rate, highest first, ties in syllabus order.
    pub fn weak_subjects<C>(
        &self,
        subjects: &[Subject],
        catalog: &C,
    ) -> Result<Vec<Subject>, CatalogError>
    where
        C: QuestionCatalog + ?Sized,
    {
        let mut scored = Vec::new();
        for &subject in subjects {
            let history = catalog.fetch_answered_history(subject, self.weak_area.history_window)?;
            if history.answered <= self.weak_area.min_sample_size {
                continue;
            }
            let score = 1.0 - history.correct as f64 / history.answered as f64;
            if score > 0.0 {
                scored.push((subject, score));
            }
        }

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(scored
            .into_iter()
            .take(self.weak_area.max_subjects)
            .map(|(subject, _)| subject)
            .collect())
    }
}

// ==================== Question pool ====================

/// Catalog questions grouped by subject for one composition.
struct QuestionPool<'a> {
    by_id: HashMap<QuestionId, (&'a CatalogQuestion, Subject)>,
    /// Syllabus order; ids ascending within a subject.
    by_subject: Vec<(Subject, Vec<QuestionId>)>,
}

impl<'a> QuestionPool<'a> {
    fn new(questions: &'a [CatalogQuestion], subjects: &[Subject]) -> Self {
        let mut by_id = HashMap::with_capacity(questions.len());
        let mut grouped: HashMap<Subject, Vec<QuestionId>> = HashMap::new();

        for question in questions {
            let Some(subject) = question.subject().filter(|s| subjects.contains(s)) else {
                continue;
            };
            if by_id.insert(question.id, (question, subject)).is_none() {
                grouped.entry(subject).or_default().push(question.id);
            }
        }

        let by_subject = Subject::ALL
            .into_iter()
            .filter_map(|subject| {
                grouped.remove(&subject).map(|mut ids| {
                    ids.sort_unstable();
                    (subject, ids)
                })
            })
            .collect();

        Self { by_id, by_subject }
    }

    fn len(&self) -> usize {
        self.by_id.len()
    }

    fn get(&self, id: QuestionId) -> Option<(&'a CatalogQuestion, Subject)> {
        self.by_id.get(&id).copied()
    }

    fn subject_of(&self, id: QuestionId) -> Option<Subject> {
        self.by_id.get(&id).map(|(_, subject)| *subject)
    }

    fn subject_ids(&self, subject: Subject) -> &[QuestionId] {
        self.by_subject
            .iter()
            .find(|(s, _)| *s == subject)
            .map(|(_, ids)| ids.as_slice())
            .unwrap_or(&[])
    }
}

// ==================== Strategies ====================

/// Due questions first, then unseen ones from the least-covered subjects.
fn select_due_review(
    pool: &QuestionPool<'_>,
    due_set: &DueSet,
    size: usize,
    exclude: &HashSet<QuestionId>,
) -> Vec<QuestionId> {
    let mut picked: Vec<QuestionId> = due_set
        .due
        .iter()
        .copied()
        .filter(|id| pool.get(*id).is_some() && !exclude.contains(id))
        .take(size)
        .collect();

    if picked.len() == size {
        return picked;
    }

    let unseen = due_set.unseen_set();
    let mut coverage: Vec<(Subject, f64)> = pool
        .by_subject
        .iter()
        .map(|(subject, ids)| {
            let seen = ids.iter().filter(|id| !unseen.contains(id)).count();
            (*subject, seen as f64 / ids.len() as f64)
        })
        .collect();
    coverage.sort_by(|a, b| a.1.total_cmp(&b.1));

    for (subject, _) in coverage {
        let candidates = due_set
            .unseen
            .iter()
            .copied()
            .filter(|id| pool.subject_of(*id) == Some(subject) && !exclude.contains(id));
        for id in candidates {
            if picked.len() == size {
                return picked;
            }
            picked.push(id);
        }
    }

    picked
}

/// Unseen questions only, alternating subjects for breadth.
fn select_new_material<R: Rng + ?Sized>(
    pool: &QuestionPool<'_>,
    due_set: &DueSet,
    size: usize,
    rng: &mut R,
) -> Vec<QuestionId> {
    let per_subject: Vec<Vec<QuestionId>> = pool
        .by_subject
        .iter()
        .map(|(subject, _)| {
            let mut ids: Vec<QuestionId> = due_set
                .unseen
                .iter()
                .copied()
                .filter(|id| pool.subject_of(*id) == Some(*subject))
                .collect();
            ids.shuffle(rng);
            ids
        })
        .collect();

    let mut picked = round_robin(&per_subject);
    picked.truncate(size);
    picked
}

/// Proportional sample across subjects, shuffled.
fn select_full_practice<R: Rng + ?Sized>(
    pool: &QuestionPool<'_>,
    size: usize,
    rng: &mut R,
) -> Vec<QuestionId> {
    let total = pool.len();
    let target = size.min(total);
    if target == 0 {
        return Vec::new();
    }

    let sizes: Vec<usize> = pool.by_subject.iter().map(|(_, ids)| ids.len()).collect();
    let quotas = largest_remainder(&sizes, target);

    let mut picked = Vec::with_capacity(target);
    for ((_, ids), quota) in pool.by_subject.iter().zip(quotas) {
        picked.extend(ids.choose_multiple(rng, quota).copied());
    }
    picked.shuffle(rng);
    picked
}

/// Quota-many mock-eligible questions per subject, interleaved in quota order.
fn select_mock_exam<R: Rng + ?Sized>(
    pool: &QuestionPool<'_>,
    leg: Leg,
    rng: &mut R,
) -> (Vec<QuestionId>, Vec<QuotaShortfall>) {
    let mut shortfalls = Vec::new();
    let mut per_subject = Vec::with_capacity(3);

    for quota in leg.subject_quotas() {
        let eligible: Vec<QuestionId> = pool
            .subject_ids(quota.subject)
            .iter()
            .copied()
            .filter(|id| pool.get(*id).is_some_and(|(q, _)| q.mock_eligible))
            .collect();

        if eligible.len() < quota.question_count {
            shortfalls.push(QuotaShortfall {
                subject: quota.subject,
                requested: quota.question_count,
                available: eligible.len(),
            });
        }

        let mut sample: Vec<QuestionId> = eligible
            .choose_multiple(rng, quota.question_count)
            .copied()
            .collect();
        sample.shuffle(rng);
        per_subject.push(sample);
    }

    (round_robin(&per_subject), shortfalls)
}

/// Takes one id from each non-empty list in turn until all are drained.
fn round_robin(lists: &[Vec<QuestionId>]) -> Vec<QuestionId> {
    let total = lists.iter().map(Vec::len).sum();
    let mut merged = Vec::with_capacity(total);
    let mut cursors = vec![0usize; lists.len()];

    while merged.len() < total {
        for (list, cursor) in lists.iter().zip(cursors.iter_mut()) {
            if let Some(id) = list.get(*cursor) {
                merged.push(*id);
                *cursor += 1;
            }
        }
    }
    merged
}

/// Splits `target` across buckets in proportion to `sizes`, handing leftover
/// units to the largest remainders (earlier bucket wins a tie).
fn largest_remainder(sizes: &[usize], target: usize) -> Vec<usize> {
    let total: usize = sizes.iter().sum();
    if total == 0 {
        return vec![0; sizes.len()];
    }

    let mut quotas: Vec<usize> = sizes.iter().map(|n| target * n / total).collect();
    let mut remainders: Vec<(usize, usize)> = sizes
        .iter()
        .enumerate()
        .map(|(i, n)| (i, target * n % total))
        .collect();
    remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut leftover = target - quotas.iter().sum::<usize>();
    for (index, _) in remainders {
        if leftover == 0 {
            break;
        }
        if quotas[index] < sizes[index] {
            quotas[index] += 1;
            leftover -= 1;
        }
    }
    quotas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::config::SchedulerParams;
    use crate::storage::InMemoryStore;
    use chrono::Duration;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn question(id: QuestionId, category_id: i64) -> CatalogQuestion {
        CatalogQuestion {
            id,
            category_id,
            text: format!("Question {id}"),
            correct_answer: format!("right {id}"),
            incorrect_answers: [
                format!("wrong a {id}"),
                format!("wrong b {id}"),
                format!("wrong c {id}"),
            ],
            mock_eligible: true,
        }
    }

    /// `per_subject` questions in each of the nine subjects; ids start at
    /// `subject_index * 1000 + 1`.
    fn catalog(per_subject: usize) -> InMemoryCatalog {
        let mut questions = Vec::new();
        for (index, subject) in Subject::ALL.into_iter().enumerate() {
            let category = subject.category_ids()[0];
            for n in 0..per_subject {
                questions.push(question((index * 1000 + n + 1) as i64, category));
            }
        }
        InMemoryCatalog::new(questions)
    }

    fn composer() -> SessionComposer {
        SessionComposer::new(&TrainerConfig::default())
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn largest_remainder_distributes_exactly() {
        assert_eq!(largest_remainder(&[10, 10, 10], 30), vec![10, 10, 10]);
        assert_eq!(largest_remainder(&[10, 10, 10], 10), vec![4, 3, 3]);
        assert_eq!(largest_remainder(&[1, 5, 14], 10), vec![1, 2, 7]);
        assert_eq!(largest_remainder(&[0, 4], 3), vec![0, 3]);
    }

    #[test]
    fn round_robin_drains_uneven_lists() {
        let lists = vec![vec![1, 2, 3], vec![10], vec![20, 21]];
        assert_eq!(round_robin(&lists), vec![1, 10, 20, 2, 21, 3]);
    }

    #[test]
    fn due_review_prefers_due_then_least_covered() {
        let catalog = catalog(5);
        let persistence = InMemoryStore::new();
        let mut store = MemoryStateStore::new(SchedulerParams::default());
        let then = Utc::now() - Duration::days(10);

        // Air Law fully seen and due; Meteorology partly seen but not due.
        for id in 2001..=2005 {
            store.record_answer(&persistence, id, false, then).unwrap();
        }
        store.record_answer(&persistence, 3001, true, Utc::now()).unwrap();

        let request = SessionRequest::new(SessionKind::DueReview)
            .with_scope(crate::session::SessionScope::Subjects(vec![
                Subject::AirLaw,
                Subject::Meteorology,
                Subject::Navigation,
            ]))
            .with_size(8);
        let session = composer()
            .compose_with_store(&request, &catalog, &store, Utc::now(), &mut rng())
            .unwrap();

        let ids = session.question_ids();
        assert_eq!(&ids[..5], &[2001, 2002, 2003, 2004, 2005]);
        // Navigation is untouched (0%), so it backfills before Meteorology (20%).
        assert_eq!(&ids[5..], &[6001, 6002, 6003]);
        assert!(!session.is_partial());
    }

    #[test]
    fn weak_area_targets_the_worst_subject() {
        let catalog = catalog(6);
        let now = Utc::now();
        for correct in [false, false, false, true, false] {
            catalog.record_answer(3001, correct, now).unwrap();
        }
        // Four answers is not enough history.
        for _ in 0..4 {
            catalog.record_answer(1001, false, now).unwrap();
        }

        let composer = composer();
        assert_eq!(
            composer.weak_subjects(&Subject::ALL, &catalog).unwrap(),
            vec![Subject::Meteorology]
        );

        let request = SessionRequest::new(SessionKind::WeakAreaFocus).with_size(8);
        let store = MemoryStateStore::new(SchedulerParams::default());
        let session = composer
            .compose_with_store(&request, &catalog, &store, now, &mut rng())
            .unwrap();

        assert_eq!(session.len(), 8);
        let meteorology = session
            .questions
            .iter()
            .take(6)
            .all(|q| q.subject == Subject::Meteorology);
        assert!(meteorology, "weak subject fills the session first");
    }

    #[test]
    fn weak_area_without_history_falls_back_to_due_review() {
        let catalog = catalog(3);
        let store = MemoryStateStore::new(SchedulerParams::default());
        let request = SessionRequest::new(SessionKind::WeakAreaFocus);

        let weak = composer()
            .compose_with_store(&request, &catalog, &store, Utc::now(), &mut rng())
            .unwrap();
        let due = composer()
            .compose_with_store(
                &SessionRequest::new(SessionKind::DueReview).with_size(15),
                &catalog,
                &store,
                Utc::now(),
                &mut rng(),
            )
            .unwrap();
        assert_eq!(weak.question_ids(), due.question_ids());
    }

    #[test]
    fn new_material_only_serves_unseen_across_subjects() {
        let catalog = catalog(4);
        let persistence = InMemoryStore::new();
        let mut store = MemoryStateStore::new(SchedulerParams::default());
        store.record_answer(&persistence, 1, true, Utc::now()).unwrap();

        let request = SessionRequest::new(SessionKind::NewMaterial).with_size(9);
        let session = composer()
            .compose_with_store(&request, &catalog, &store, Utc::now(), &mut rng())
            .unwrap();

        assert_eq!(session.len(), 9);
        assert!(!session.question_ids().contains(&1));
        let subjects: HashSet<Subject> = session.questions.iter().map(|q| q.subject).collect();
        assert_eq!(subjects.len(), 9, "one question from every subject first");
    }

    #[test]
    fn full_practice_is_proportional_and_distinct() {
        let mut questions = Vec::new();
        for n in 1..=10 {
            questions.push(question(n, 551));
        }
        for n in 11..=40 {
            questions.push(question(n, 553));
        }
        let catalog = InMemoryCatalog::new(questions);

        let request = SessionRequest::new(SessionKind::FullPractice).with_size(8);
        let session = composer()
            .compose(&request, &catalog, &DueSet::default(), &mut rng())
            .unwrap();

        let ids: HashSet<QuestionId> = session.question_ids().into_iter().collect();
        assert_eq!(ids.len(), 8);
        let law = session
            .questions
            .iter()
            .filter(|q| q.subject == Subject::AirLaw)
            .count();
        assert_eq!(law, 2);
    }

    #[test]
    fn mock_exam_fills_quotas_in_table_order() {
        let catalog = catalog(25);
        let leg = Leg::HumanEnvironment;
        let request = SessionRequest::new(SessionKind::TimedMockExam { leg });
        let session = composer()
            .compose(&request, &catalog, &DueSet::default(), &mut rng())
            .unwrap();

        assert_eq!(session.len(), 60);
        assert!(!session.is_partial());
        let first: Vec<Subject> = session.questions.iter().take(3).map(|q| q.subject).collect();
        assert_eq!(first, leg.subjects().collect::<Vec<_>>());
    }

    #[test]
    fn mock_exam_records_shortfall_and_skips_ineligible() {
        let mut questions: Vec<CatalogQuestion> = (1..=20).map(|n| question(n, 553)).collect();
        questions.extend((21..=32).map(|n| question(n, 552)));
        questions.extend((33..=52).map(|n| question(n, 554)));
        questions[0].mock_eligible = false;
        let catalog = InMemoryCatalog::new(questions);

        let request = SessionRequest::new(SessionKind::TimedMockExam {
            leg: Leg::HumanEnvironment,
        });
        let session = composer()
            .compose(&request, &catalog, &DueSet::default(), &mut rng())
            .unwrap();

        assert_eq!(session.len(), 19 + 12 + 20);
        assert!(!session.question_ids().contains(&1));
        assert_eq!(
            session.shortfalls,
            vec![
                QuotaShortfall {
                    subject: Subject::Meteorology,
                    requested: 20,
                    available: 19
                },
                QuotaShortfall {
                    subject: Subject::HumanPerformance,
                    requested: 20,
                    available: 12
                },
            ]
        );
    }

    #[test]
    fn mock_exam_without_questions_is_an_error() {
        let catalog = catalog(2);
        let empty = InMemoryCatalog::new(Vec::new());
        let request = SessionRequest::new(SessionKind::TimedMockExam {
            leg: Leg::PlanningNavigation,
        });

        assert!(composer()
            .compose(&request, &catalog, &DueSet::default(), &mut rng())
            .is_ok());
        assert!(matches!(
            composer().compose(&request, &empty, &DueSet::default(), &mut rng()),
            Err(ComposeError::InsufficientQuestions {
                leg: Leg::PlanningNavigation,
                requested: 60,
                available: 0
            })
        ));
    }

    #[test]
    fn seeded_rng_reproduces_the_session() {
        let catalog = catalog(10);
        let request = SessionRequest::new(SessionKind::FullPractice);
        let a = composer()
            .compose(&request, &catalog, &DueSet::default(), &mut rng())
            .unwrap();
        let b = composer()
            .compose(&request, &catalog, &DueSet::default(), &mut rng())
            .unwrap();
        assert_eq!(a, b);
    }
}
