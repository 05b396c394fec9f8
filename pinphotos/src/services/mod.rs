//! Services module
//!
//! Business logic that coordinates the repository, blob store and search client.

pub mod inflight;
pub mod pins;
pub mod reconcile;
pub mod settings;
pub mod sync;

pub use inflight::{InFlight, InFlightGuard};
pub use pins::PinsService;
pub use reconcile::plan_reconciliation;
pub use settings::{ApiSettings, AppSettings, SettingsService};
pub use sync::{CollectionState, DownloadBatch, DownloadOutcome, SyncEngine, SyncOutcome, SyncReport};
