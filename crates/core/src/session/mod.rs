//! Cashier session lifecycle.
//!
//! A session opens with a declared float and closes with a count. The close
//! count is a closing reconciliation that either posts immediately or holds
//! the session in `Closing` until approval.

pub mod error;
pub mod state;
pub mod types;

pub use error::SessionError;
pub use state::SessionStateMachine;
pub use types::{
    CashierSession, CloseSessionInput, CloseSessionOutcome, MAX_TILL_ID_LEN, OpenSessionInput,
    OpenSessionOutcome, SessionStatus,
};
