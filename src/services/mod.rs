pub mod scm;
pub mod tracking;

pub use scm::{ScmProvider, ScmProviders};
pub use tracking::{EntityScope, TrackingToolService};
