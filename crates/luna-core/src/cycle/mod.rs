pub mod fetcher;
pub mod phase;
pub mod setup;

pub use fetcher::{
    CalculateCycleRequest, CyclePhaseFetcher, CyclePhaseResult, CycleServiceError,
    HttpCycleFetcher,
};
pub use phase::{calculate_cycle_day_and_phase, CalculationError, CyclePosition, Phase};
pub use setup::{CycleSetup, SetupError, SetupForm, SetupHandler};
