use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogQuestion, QuestionId};
use crate::syllabus::{CategoryId, Subject};

/// A question as shown to the learner: choices in presentation order plus
/// the position of the correct one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedQuestion {
    pub question_id: QuestionId,
    pub subject: Subject,
    pub category_id: CategoryId,
    pub text: String,
    pub choices: Vec<String>,
    pub correct_index: usize,
    pub correct_answer: String,
}

impl PresentedQuestion {
    pub fn present<R: Rng + ?Sized>(
        question: &CatalogQuestion,
        subject: Subject,
        rng: &mut R,
    ) -> Self {
        let mut choices = Vec::with_capacity(4);
        choices.push(question.correct_answer.clone());
        choices.extend(question.incorrect_answers.iter().cloned());
        choices.shuffle(rng);

        let correct_index = choices
            .iter()
            .position(|choice| *choice == question.correct_answer)
            .unwrap_or(0);

        Self {
            question_id: question.id,
            subject,
            category_id: question.category_id,
            text: question.text.clone(),
            choices,
            correct_index,
            correct_answer: question.correct_answer.clone(),
        }
    }

    pub fn choice(&self, index: usize) -> Option<&str> {
        self.choices.get(index).map(String::as_str)
    }

    /// Grades by answer text, not position.
    pub fn is_correct(&self, index: usize) -> bool {
        self.choice(index) == Some(self.correct_answer.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn question() -> CatalogQuestion {
        CatalogQuestion {
            id: 1,
            category_id: 551,
            text: "Minimum VMC visibility in class G below FL100?".into(),
            correct_answer: "1500 m".into(),
            incorrect_answers: ["5 km".into(), "8 km".into(), "3 km".into()],
            mock_eligible: true,
        }
    }

    #[test]
    fn correct_index_follows_the_shuffle() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..20 {
            let presented = PresentedQuestion::present(&question(), Subject::AirLaw, &mut rng);
            assert_eq!(presented.choices.len(), 4);
            assert_eq!(presented.choices[presented.correct_index], "1500 m");
            assert!(presented.is_correct(presented.correct_index));
            assert!(!presented.is_correct((presented.correct_index + 1) % 4));
            assert!(!presented.is_correct(9));
        }
    }

    #[test]
    fn same_seed_same_order() {
        let a = PresentedQuestion::present(
            &question(),
            Subject::AirLaw,
            &mut ChaCha8Rng::seed_from_u64(11),
        );
        let b = PresentedQuestion::present(
            &question(),
            Subject::AirLaw,
            &mut ChaCha8Rng::seed_from_u64(11),
        );
        assert_eq!(a, b);
    }
}
