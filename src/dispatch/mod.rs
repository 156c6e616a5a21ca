pub mod dispatcher;
pub mod strategy;

pub use dispatcher::{
    CONTAINMENT_GEOFENCE_CEILING, DispatchOutcome, PROTECTIVE_GEOFENCE_CEILING,
    StrategyDispatcher,
};
pub use strategy::{
    ACTIVATE_FTS_TEXT, EMERGENCY_LANDING_TEXT, HAZARD_WARNING_TEXT, LAND_IN_GEOFENCE_TEXT,
    MANUAL_CONTROL_TEXT, RETURN_TO_PLAN_TEXT, Strategy, StrategyTable,
};
