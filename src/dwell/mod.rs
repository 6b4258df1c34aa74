pub mod state;

pub use state::{
    CommitEvent, CommitTrigger, DwellMachine, DwellState, DwellStatus, DwellUpdate, Transition,
    DEFAULT_DWELL_THRESHOLD,
};
