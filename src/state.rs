use crate::rules::PostureAnalysisResult;
use serde::{Deserialize, Serialize};

/// Tri-state feedback classification driving UI color and urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Correct,
    Warning,
    Incorrect,
}

impl FeedbackType {
    /// Pure derivation from a verdict: correct forms are `Correct`;
    /// incorrect forms are `Warning` above score 70, `Incorrect` otherwise.
    pub fn derive(is_correct: bool, score: u8) -> Self {
        if is_correct {
            FeedbackType::Correct
        } else if score > 70 {
            FeedbackType::Warning
        } else {
            FeedbackType::Incorrect
        }
    }
}

/// Live feedback state owned by the analysis loop.
///
/// Created with neutral defaults at loop start, overwritten whole every
/// analysis cycle (single writer, never partially visible), discarded at
/// loop stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisState {
    pub feedback: Option<String>,
    pub feedback_type: FeedbackType,
    pub score: u8,
}

impl Default for AnalysisState {
    fn default() -> Self {
        Self {
            feedback: None,
            feedback_type: FeedbackType::Correct,
            score: 0,
        }
    }
}

impl AnalysisState {
    /// Project a rule-engine verdict into the renderable state. The main
    /// issue is preferred as the headline; secondary detail stays in the
    /// result's feedback list.
    pub fn from_result(result: &PostureAnalysisResult) -> Self {
        let feedback = if result.is_correct {
            Some("Good form!".to_string())
        } else {
            result
                .main_issue
                .clone()
                .or_else(|| result.feedback.first().cloned())
        };

        Self {
            feedback,
            feedback_type: FeedbackType::derive(result.is_correct, result.score),
            score: result.score,
        }
    }

    /// Terminal state for an unrecoverable device failure: the error
    /// message becomes the feedback and the loop halts.
    pub fn from_device_error(message: &str) -> Self {
        Self {
            feedback: Some(message.to_string()),
            feedback_type: FeedbackType::Incorrect,
            score: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_type_table_exhaustive() {
        // Full (is_correct, score) domain, not a random sample
        for score in 0u8..=100 {
            assert_eq!(FeedbackType::derive(true, score), FeedbackType::Correct);

            let expected = if score > 70 {
                FeedbackType::Warning
            } else {
                FeedbackType::Incorrect
            };
            assert_eq!(FeedbackType::derive(false, score), expected);
        }
    }

    #[test]
    fn test_state_from_correct_result() {
        let result = PostureAnalysisResult {
            is_correct: true,
            score: 85,
            feedback: vec!["Your form looks good!".to_string()],
            main_issue: None,
        };
        let state = AnalysisState::from_result(&result);
        assert_eq!(state.feedback.as_deref(), Some("Good form!"));
        assert_eq!(state.feedback_type, FeedbackType::Correct);
        assert_eq!(state.score, 85);
    }

    #[test]
    fn test_state_prefers_main_issue_as_headline() {
        let result = PostureAnalysisResult {
            is_correct: false,
            score: 65,
            feedback: vec!["Knees caving inward".to_string()],
            main_issue: Some("Knee valgus detected".to_string()),
        };
        let state = AnalysisState::from_result(&result);
        assert_eq!(state.feedback.as_deref(), Some("Knee valgus detected"));
        assert_eq!(state.feedback_type, FeedbackType::Incorrect);

        let warning = PostureAnalysisResult {
            score: 75,
            ..result
        };
        assert_eq!(
            AnalysisState::from_result(&warning).feedback_type,
            FeedbackType::Warning
        );
    }

    #[test]
    fn test_default_state_is_neutral() {
        let state = AnalysisState::default();
        assert!(state.feedback.is_none());
        assert_eq!(state.feedback_type, FeedbackType::Correct);
        assert_eq!(state.score, 0);
    }
}
