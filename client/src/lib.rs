mod app;
mod dom;
pub mod geometry;
mod net;
pub mod presence;
pub mod reconciler;
mod render;
mod util;
mod ws;

pub use app::run;
pub use reconciler::{ReconcileError, Reconciler, Renderer, SyncStatus};
