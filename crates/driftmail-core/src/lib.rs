//! Driftmail Core - Campaign scheduling core and send worker
//!
//! This crate covers the campaign scheduling and assignment core
//! together with its background send worker: the Calendar, Slot
//! Generator, and Assignment Planner that turn a validated campaign
//! description into a time-ordered send plan, the Scheduler that
//! persists that plan atomically, and the Dispatcher that drains it
//! through an SMTP transport.

pub mod dispatcher;
pub mod events;
pub mod scheduled;
pub mod transport;

pub use dispatcher::{DispatchError, Dispatcher};
pub use events::EventLog;
pub use scheduled::{CampaignScheduler, ScheduleRequest, SchedulerError};
pub use transport::{DispatchCallback, DispatchEntry, LettreTransport, Transport};
