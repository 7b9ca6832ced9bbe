use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::phase::DEFAULT_CYCLE_LENGTH;
use crate::chat::session::ChatSession;
use crate::storage::KeyValueStore;

pub const LAST_PERIOD_DATE_KEY: &str = "lastPeriodDate";
pub const CYCLE_LENGTH_KEY: &str = "cycleLength";

/// What the user told us about their cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSetup {
    /// Calendar date as typed. Only checked for presence here; the
    /// calculation service parses it.
    pub last_period_date: String,
    pub cycle_length: u32,
}

/// Raw field contents of the setup form.
#[derive(Debug, Clone, Default)]
pub struct SetupForm {
    pub last_period_date: String,
    pub cycle_length: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Please enter the date of your last period.")]
    MissingLastPeriodDate,
    #[error("Cycle length must be a whole number of days greater than zero (got \"{0}\").")]
    InvalidCycleLength(String),
    #[error("Could not save your setup: {0}")]
    Storage(#[source] anyhow::Error),
}

impl SetupError {
    /// Validation errors leave the form open for correction.
    pub fn is_validation(&self) -> bool {
        !matches!(self, SetupError::Storage(_))
    }
}

impl SetupForm {
    pub fn parse(&self) -> Result<CycleSetup, SetupError> {
        let last_period_date = self.last_period_date.trim();
        if last_period_date.is_empty() {
            return Err(SetupError::MissingLastPeriodDate);
        }

        let raw_length = self.cycle_length.trim();
        let cycle_length = if raw_length.is_empty() {
            DEFAULT_CYCLE_LENGTH
        } else {
            match raw_length.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(SetupError::InvalidCycleLength(raw_length.to_string())),
            }
        };

        Ok(CycleSetup {
            last_period_date: last_period_date.to_string(),
            cycle_length,
        })
    }
}

impl From<&CycleSetup> for SetupForm {
    fn from(setup: &CycleSetup) -> Self {
        Self {
            last_period_date: setup.last_period_date.clone(),
            cycle_length: setup.cycle_length.to_string(),
        }
    }
}

/// Validates the setup form and mirrors the result into durable storage and
/// the chat session.
pub struct SetupHandler {
    store: Arc<dyn KeyValueStore>,
}

impl SetupHandler {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Nothing is written and the session is left untouched unless the form
    /// is valid and both keys are stored together. A later call overwrites
    /// both stored keys.
    pub async fn complete(
        &self,
        form: &SetupForm,
        session: &mut ChatSession,
    ) -> Result<CycleSetup, SetupError> {
        let setup = form.parse()?;

        let cycle_length = setup.cycle_length.to_string();
        self.store
            .set_many(&[
                (LAST_PERIOD_DATE_KEY, setup.last_period_date.as_str()),
                (CYCLE_LENGTH_KEY, cycle_length.as_str()),
            ])
            .await
            .map_err(SetupError::Storage)?;

        info!(
            last_period_date = %setup.last_period_date,
            cycle_length = setup.cycle_length,
            "cycle setup saved"
        );
        session.install_setup(setup.clone());
        Ok(setup)
    }

    /// Setup saved by an earlier run, if any.
    pub async fn restore(&self) -> Result<Option<CycleSetup>> {
        let Some(last_period_date) = self
            .store
            .get(LAST_PERIOD_DATE_KEY)
            .await?
            .filter(|d| !d.trim().is_empty())
        else {
            return Ok(None);
        };

        let stored_length = self.store.get(CYCLE_LENGTH_KEY).await?;
        let cycle_length = match stored_length.as_deref().map(|v| v.trim().parse::<u32>()) {
            Some(Ok(n)) if n > 0 => n,
            None => DEFAULT_CYCLE_LENGTH,
            Some(_) => {
                warn!(value = ?stored_length, "unreadable stored cycle length, using default");
                DEFAULT_CYCLE_LENGTH
            }
        };

        Ok(Some(CycleSetup {
            last_period_date,
            cycle_length,
        }))
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.delete(LAST_PERIOD_DATE_KEY).await?;
        self.store.delete(CYCLE_LENGTH_KEY).await?;
        Ok(())
    }
}
