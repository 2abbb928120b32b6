//! Call-quality self-assessment produced by the AI agent
//!
//! The bundle is opaque to the bridge: it is carried unchanged from the
//! tool invocation into the audit records for transfers and hangups.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Scores are integers 1-4; any of them may be absent. Values the agent
/// mistypes are dropped rather than failing the whole tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentBundle {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_text")]
    pub intent_from: Option<String>,
    #[serde(rename = "ResponseAccuracy", default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_score")]
    pub response_accuracy: Option<u8>,
    #[serde(rename = "KnowledgeLimitationHandling", default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_score")]
    pub knowledge_limitation_handling: Option<u8>,
    #[serde(rename = "ConfidenceandClarity", default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_score")]
    pub confidence_and_clarity: Option<u8>,
    #[serde(rename = "ToneandEmpathy", default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_score")]
    pub tone_and_empathy: Option<u8>,
    #[serde(rename = "EscalationHandling", default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_score")]
    pub escalation_handling: Option<u8>,
    #[serde(rename = "CustomerSatisfactionOutcome", default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_score")]
    pub customer_satisfaction_outcome: Option<u8>,
    #[serde(rename = "CustomerBehavior", default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_score")]
    pub customer_behavior: Option<u8>,
    #[serde(rename = "CustomerEffortLevel", default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_score")]
    pub customer_effort_level: Option<u8>,
    #[serde(rename = "ConversationCompletion", default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_score")]
    pub conversation_completion: Option<u8>,
    #[serde(rename = "EmotionalShiftDuringConversation", default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_score")]
    pub emotional_shift_during_conversation: Option<u8>,
    #[serde(rename = "BackgroundNoiseLevelCustomer", default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_score")]
    pub background_noise_level_customer: Option<u8>,
    #[serde(rename = "BackgroundNoiseLevelAI", default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_score")]
    pub background_noise_level_ai: Option<u8>,
    #[serde(rename = "CallDisruptionDueToNoiseOrAudioQuality", default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_score")]
    pub call_disruption_due_to_noise_or_audio_quality: Option<u8>,
    #[serde(rename = "OverallConversationQuality", default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_score")]
    pub overall_conversation_quality: Option<u8>,
    #[serde(rename = "callIntent", default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_text")]
    pub call_intent: Option<String>,
    #[serde(rename = "CallerToneandEmpathy", default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_score")]
    pub caller_tone_and_empathy: Option<u8>,
}

impl AssessmentBundle {
    /// Number of scores the agent actually filled in
    pub fn score_count(&self) -> usize {
        [
            self.response_accuracy,
            self.knowledge_limitation_handling,
            self.confidence_and_clarity,
            self.tone_and_empathy,
            self.escalation_handling,
            self.customer_satisfaction_outcome,
            self.customer_behavior,
            self.customer_effort_level,
            self.conversation_completion,
            self.emotional_shift_during_conversation,
            self.background_noise_level_customer,
            self.background_noise_level_ai,
            self.call_disruption_due_to_noise_or_audio_quality,
            self.overall_conversation_quality,
            self.caller_tone_and_empathy,
        ]
        .iter()
        .filter(|score| score.is_some())
        .count()
    }
}

/// Accepts integers, integral floats (`3.0`) and numeric strings (`"3"`).
/// Anything else, including out-of-range numbers, reads as absent.
pub fn deserialize_score<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(score_value))
}

fn score_value(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if number.fract() != 0.0 || !(0.0..=f64::from(u8::MAX)).contains(&number) {
        return None;
    }
    Some(number as u8)
}

/// Free-text fields; scalars are kept in their textual form
pub fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}
