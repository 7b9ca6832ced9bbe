use crate::cycle::CyclePhaseResult;

/// Fixed preamble placed before every user message.
pub const LUNA_PERSONA: &str = "\
You are Luna, a compassionate AI health companion specializing in menstrual health and hormonal science.

Your role:
- Validate the user's experience emotionally
- Explain how symptoms may relate to hormonal cycles
- Be scientifically grounded but non-diagnostic
- Warm, supportive, and concise";

/// Assembles the single user-role prompt sent to the completion service:
/// persona, then context sections, then the raw user message.
pub struct PersonaPromptBuilder {
    base: String,
    sections: Vec<String>,
}

impl PersonaPromptBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            sections: Vec::new(),
        }
    }

    pub fn with_cycle_context(mut self, phase: &CyclePhaseResult, cycle_length: u32) -> Self {
        let day = phase
            .cycle_day
            .map(|d| d.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let name = phase.phase.as_deref().unwrap_or("unknown");
        // The service says "Menstrual Phase"; other callers may send "menstrual".
        let label = if name.to_lowercase().ends_with("phase") {
            name.to_string()
        } else {
            format!("{name} phase")
        };
        let mut context = format!(
            "Cycle context: The user is currently on cycle day {day} of a {cycle_length}-day cycle, in the {label}."
        );
        if let Some(desc) = phase.phase_description.as_deref().filter(|d| !d.is_empty()) {
            context.push_str("\nWhat this phase typically involves: ");
            context.push_str(desc);
        }
        self.sections.push(context);
        self
    }

    pub fn build_for(self, user_message: &str) -> String {
        let mut parts = Vec::with_capacity(self.sections.len() + 2);
        parts.push(self.base);
        parts.extend(self.sections);
        parts.push(format!("User message:\n{}", user_message));
        parts.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(day: i64, name: &str) -> CyclePhaseResult {
        CyclePhaseResult {
            success: true,
            cycle_day: Some(day),
            phase: Some(name.to_string()),
            ..CyclePhaseResult::default()
        }
    }

    #[test]
    fn embeds_day_phase_and_raw_message() {
        let prompt = PersonaPromptBuilder::new(LUNA_PERSONA)
            .with_cycle_context(&phase(5, "menstrual"), 28)
            .build_for("I feel crampy today");

        assert!(prompt.starts_with("You are Luna"));
        assert!(prompt.contains("cycle day 5"));
        assert!(prompt.contains("menstrual"));
        assert!(prompt.contains("28-day cycle"));
        assert!(prompt.ends_with("User message:\nI feel crampy today"));
    }

    #[test]
    fn description_is_included_when_present() {
        let mut result = phase(20, "Luteal Phase");
        result.phase_description = Some("PMS symptoms as hormones drop.".into());

        let prompt = PersonaPromptBuilder::new("base")
            .with_cycle_context(&result, 30)
            .build_for("hi");

        assert!(prompt.contains("in the Luteal Phase."));
        assert!(prompt.contains("PMS symptoms as hormones drop."));
    }

    #[test]
    fn missing_fields_read_as_unknown() {
        let result = CyclePhaseResult {
            success: true,
            ..CyclePhaseResult::default()
        };
        let prompt = PersonaPromptBuilder::new("base")
            .with_cycle_context(&result, 28)
            .build_for("hi");
        assert!(prompt.contains("cycle day unknown"));
    }

    #[test]
    fn persona_then_context_then_message() {
        let prompt = PersonaPromptBuilder::new("base")
            .with_cycle_context(&phase(9, "Follicular Phase"), 28)
            .build_for("msg");
        assert_eq!(
            prompt,
            "base\n\nCycle context: The user is currently on cycle day 9 of a 28-day cycle, \
             in the Follicular Phase.\n\nUser message:\nmsg"
        );
    }
}
