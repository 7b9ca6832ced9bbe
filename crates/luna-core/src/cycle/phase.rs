use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CYCLE_LENGTH: u32 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Menstrual,
    Follicular,
    Ovulatory,
    Luteal,
}

impl Phase {
    /// Phase for a 1-based cycle day. Anything past day 15 is luteal.
    pub fn for_day(cycle_day: u32) -> Self {
        match cycle_day {
            0..=7 => Phase::Menstrual,
            8..=13 => Phase::Follicular,
            14..=15 => Phase::Ovulatory,
            _ => Phase::Luteal,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Menstrual => "Menstrual Phase",
            Phase::Follicular => "Follicular Phase",
            Phase::Ovulatory => "Ovulatory Phase",
            Phase::Luteal => "Luteal Phase",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Phase::Menstrual => {
                "The start of your cycle, when you bleed. Low energy, potential cramps, need for rest/gentle exercise (yoga, walking)."
            }
            Phase::Follicular => {
                "Hormones build, follicles (eggs) mature, uterine lining thickens. Rising energy, focus, confidence; good for goal-setting."
            }
            Phase::Ovulatory => {
                "An ovary releases an egg (ovulation). Energy peaks, libido increases, potential for mild pain, increased cervical fluid (egg-white consistency)."
            }
            Phase::Luteal => {
                "Body prepares for pregnancy; progesterone rises, then drops if no pregnancy. PMS symptoms (bloating, mood swings, cravings, fatigue) as hormones drop."
            }
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyclePosition {
    /// 1-based day within the current cycle.
    pub cycle_day: u32,
    pub phase: Phase,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalculationError {
    #[error("Current date is before last period date")]
    BeforeLastPeriod,
    #[error("Cycle length must be a positive number of days")]
    ZeroCycleLength,
}

/// Day and phase of `current_date` in a cycle that started on
/// `last_period_date` and repeats every `cycle_length` days.
pub fn calculate_cycle_day_and_phase(
    last_period_date: NaiveDate,
    cycle_length: u32,
    current_date: NaiveDate,
) -> Result<CyclePosition, CalculationError> {
    if cycle_length == 0 {
        return Err(CalculationError::ZeroCycleLength);
    }
    let days_since = (current_date - last_period_date).num_days();
    if days_since < 0 {
        return Err(CalculationError::BeforeLastPeriod);
    }
    let cycle_day = (days_since % i64::from(cycle_length)) as u32 + 1;
    Ok(CyclePosition {
        cycle_day,
        phase: Phase::for_day(cycle_day),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn period_start_is_day_one() {
        let pos = calculate_cycle_day_and_phase(date("2025-01-01"), 28, date("2025-01-01")).unwrap();
        assert_eq!(pos.cycle_day, 1);
        assert_eq!(pos.phase, Phase::Menstrual);
    }

    #[test]
    fn fifth_day_is_menstrual() {
        let pos = calculate_cycle_day_and_phase(date("2025-01-01"), 28, date("2025-01-05")).unwrap();
        assert_eq!(pos.cycle_day, 5);
        assert_eq!(pos.phase, Phase::Menstrual);
    }

    #[test]
    fn wraps_into_next_cycle() {
        let pos = calculate_cycle_day_and_phase(date("2025-01-01"), 28, date("2025-01-29")).unwrap();
        assert_eq!(pos.cycle_day, 1);

        let pos = calculate_cycle_day_and_phase(date("2025-01-01"), 30, date("2025-03-05")).unwrap();
        // 63 days elapsed, 63 % 30 = 3
        assert_eq!(pos.cycle_day, 4);
    }

    #[test]
    fn phase_boundaries() {
        assert_eq!(Phase::for_day(7), Phase::Menstrual);
        assert_eq!(Phase::for_day(8), Phase::Follicular);
        assert_eq!(Phase::for_day(13), Phase::Follicular);
        assert_eq!(Phase::for_day(14), Phase::Ovulatory);
        assert_eq!(Phase::for_day(15), Phase::Ovulatory);
        assert_eq!(Phase::for_day(16), Phase::Luteal);
        assert_eq!(Phase::for_day(35), Phase::Luteal);
    }

    #[test]
    fn future_period_date_is_rejected() {
        let err = calculate_cycle_day_and_phase(date("2025-02-01"), 28, date("2025-01-01")).unwrap_err();
        assert_eq!(err, CalculationError::BeforeLastPeriod);
        assert_eq!(err.to_string(), "Current date is before last period date");
    }

    #[test]
    fn zero_length_is_rejected() {
        let err = calculate_cycle_day_and_phase(date("2025-01-01"), 0, date("2025-01-03")).unwrap_err();
        assert_eq!(err, CalculationError::ZeroCycleLength);
    }

    #[test]
    fn display_uses_phase_name() {
        assert_eq!(Phase::Luteal.to_string(), "Luteal Phase");
        assert!(Phase::Ovulatory.description().contains("ovulation"));
    }
}
