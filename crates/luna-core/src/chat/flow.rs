use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{info, warn};

use super::reply::{extract_api_error, sanitize_reply};
use super::session::{ChatSession, Reply, SendOutcome};
use crate::cycle::{CyclePhaseFetcher, CycleSetup};
use crate::prompts::{PersonaPromptBuilder, LUNA_PERSONA};
use crate::providers::{CompletionProvider, Message};

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// One user message in, one assistant message out: cycle phase lookup,
/// persona prompt, completion call. Never returns an error; failures become
/// `Error: …` replies.
pub struct MessageFlow {
    fetcher: Arc<dyn CyclePhaseFetcher>,
    provider: Arc<dyn CompletionProvider>,
    persona: String,
    today: Clock,
}

impl MessageFlow {
    pub fn new(fetcher: Arc<dyn CyclePhaseFetcher>, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            fetcher,
            provider,
            persona: LUNA_PERSONA.to_string(),
            today: Arc::new(|| chrono::Local::now().date_naive()),
        }
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn with_clock(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub async fn respond(&self, setup: Option<&CycleSetup>, text: &str) -> Reply {
        let Some(setup) = setup else {
            info!("message held back until cycle setup is complete");
            return Reply::needs_setup();
        };

        match self.converse(setup, text).await {
            Ok(content) => Reply::replied(sanitize_reply(content)),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "turn failed");
                Reply::failed(extract_api_error(&e.to_string()))
            }
        }
    }

    async fn converse(&self, setup: &CycleSetup, text: &str) -> Result<Option<String>> {
        let today = (self.today)();
        let phase = self.fetcher.fetch(setup, today).await?;
        let prompt = PersonaPromptBuilder::new(self.persona.as_str())
            .with_cycle_context(&phase, setup.cycle_length)
            .build_for(text);
        let content = self.provider.complete(&[Message::user(prompt)]).await?;
        info!(
            cycle_day = ?phase.cycle_day,
            phase = ?phase.phase,
            has_content = content.is_some(),
            "turn completed"
        );
        Ok(content)
    }

    /// Run a whole turn against `session`: `None` when the input was not
    /// accepted (blank, or a turn is already in flight).
    pub async fn send(&self, session: &mut ChatSession, input: &str) -> Option<SendOutcome> {
        let turn = session.begin(input)?;
        let reply = self.respond(turn.setup.as_ref(), &turn.text).await;
        Some(session.finish(reply))
    }
}
