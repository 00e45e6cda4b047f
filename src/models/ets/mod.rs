//! Exponential smoothing (ETS) models.
//!
//! The taxonomy combines an error component (additive or multiplicative), a
//! trend component (none, additive, or damped), and a season component
//! (none, additive, or multiplicative) into 15 valid specifications. One
//! state-space filter serves all of them; see [`EtsSpec`] for the
//! combination rules and [`Ets`] for estimation. [`AutoEts`] searches the
//! taxonomy by information criterion.

mod filter;
mod model;
mod search;
mod spec;

pub use filter::{EtsState, SmoothingParams};
pub use model::Ets;
pub use search::{AutoEts, AutoEtsConfig};
pub use spec::{ErrorComponent, EtsSpec, SeasonComponent, TrendComponent};
