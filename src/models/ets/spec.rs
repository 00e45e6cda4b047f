//! The ETS error/trend/season taxonomy.
//!
//! A specification tags one of the 15 valid combinations of error
//! {additive, multiplicative}, trend {none, additive, damped}, and season
//! {none, additive, multiplicative}. The three additive-error combinations
//! with a multiplicative season are excluded: their innovation variance is
//! not level-independent and the likelihood degenerates near zero seasonal
//! indices. Multiplicative trend is excluded from the taxonomy entirely.

use std::fmt;

use crate::error::{ForecastError, Result};

/// Error component: how innovations enter the measurement equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorComponent {
    /// `y_t = mu_t + e_t`
    Additive,
    /// `y_t = mu_t (1 + e_t)`; requires strictly positive data.
    Multiplicative,
}

impl ErrorComponent {
    fn code(&self) -> &'static str {
        match self {
            ErrorComponent::Additive => "A",
            ErrorComponent::Multiplicative => "M",
        }
    }
}

/// Trend component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrendComponent {
    /// No trend state.
    #[default]
    None,
    /// Additive (linear) trend.
    Additive,
    /// Additive trend damped by a factor phi estimated in (0.8, 0.998].
    Damped,
}

impl TrendComponent {
    fn code(&self) -> &'static str {
        match self {
            TrendComponent::None => "N",
            TrendComponent::Additive => "A",
            TrendComponent::Damped => "Ad",
        }
    }
}

/// Season component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SeasonComponent {
    /// No seasonal state.
    #[default]
    None,
    /// Additive seasonal indices (sum-to-zero over one cycle).
    Additive,
    /// Multiplicative seasonal indices (mean-one over one cycle);
    /// requires strictly positive data.
    Multiplicative,
}

impl SeasonComponent {
    fn code(&self) -> &'static str {
        match self {
            SeasonComponent::None => "N",
            SeasonComponent::Additive => "A",
            SeasonComponent::Multiplicative => "M",
        }
    }
}

/// A validated ETS model specification.
///
/// `period` is the seasonal cycle length; it is normalized to 1 when the
/// season component is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EtsSpec {
    pub error: ErrorComponent,
    pub trend: TrendComponent,
    pub season: SeasonComponent,
    pub period: usize,
}

impl EtsSpec {
    /// Build a specification, rejecting invalid combinations.
    pub fn new(
        error: ErrorComponent,
        trend: TrendComponent,
        season: SeasonComponent,
        period: usize,
    ) -> Result<Self> {
        let period = if season == SeasonComponent::None {
            1
        } else {
            period
        };
        if season != SeasonComponent::None && period < 2 {
            return Err(ForecastError::InvalidSpec(format!(
                "seasonal component requires period > 1, got {period}"
            )));
        }
        if error == ErrorComponent::Additive && season == SeasonComponent::Multiplicative {
            return Err(ForecastError::InvalidSpec(
                "additive error with multiplicative season is excluded from the taxonomy"
                    .to_string(),
            ));
        }
        Ok(Self {
            error,
            trend,
            season,
            period,
        })
    }

    /// A non-seasonal specification; always valid.
    pub fn non_seasonal(error: ErrorComponent, trend: TrendComponent) -> Self {
        Self {
            error,
            trend,
            season: SeasonComponent::None,
            period: 1,
        }
    }

    /// Whether the model carries a trend state.
    pub fn has_trend(&self) -> bool {
        self.trend != TrendComponent::None
    }

    /// Whether the trend is damped.
    pub fn damped(&self) -> bool {
        self.trend == TrendComponent::Damped
    }

    /// Whether the model carries a seasonal state.
    pub fn has_season(&self) -> bool {
        self.season != SeasonComponent::None
    }

    /// Whether fitting requires strictly positive observations.
    pub fn requires_positive(&self) -> bool {
        self.error == ErrorComponent::Multiplicative
            || self.season == SeasonComponent::Multiplicative
    }

    /// Standard label, e.g. "ETS(A,Ad,N)".
    pub fn label(&self) -> String {
        format!(
            "ETS({},{},{})",
            self.error.code(),
            self.trend.code(),
            self.season.code()
        )
    }

    /// Smallest series length the fit accepts.
    pub fn min_observations(&self) -> usize {
        if self.has_season() {
            2 * self.period
        } else if self.has_trend() {
            3
        } else {
            2
        }
    }

    /// Number of free smoothing parameters (alpha, plus beta/gamma/phi where
    /// the corresponding component is present).
    pub fn num_smoothing_params(&self) -> usize {
        let mut count = 1;
        if self.has_trend() {
            count += 1;
        }
        if self.damped() {
            count += 1;
        }
        if self.has_season() {
            count += 1;
        }
        count
    }

    /// Number of estimated initial states (level, plus trend, plus one
    /// seasonal index per cycle position).
    pub fn num_states(&self) -> usize {
        let mut count = 1;
        if self.has_trend() {
            count += 1;
        }
        if self.has_season() {
            count += self.period;
        }
        count
    }

    /// Total free parameters excluding the error variance.
    pub fn num_params(&self) -> usize {
        self.num_smoothing_params() + self.num_states()
    }

    /// Every valid specification for a given period, in a fixed enumeration
    /// order (15 combinations when `period > 1`, 6 otherwise).
    pub fn all_valid(period: usize) -> Vec<EtsSpec> {
        let errors = [ErrorComponent::Additive, ErrorComponent::Multiplicative];
        let trends = [
            TrendComponent::None,
            TrendComponent::Additive,
            TrendComponent::Damped,
        ];
        let seasons = [
            SeasonComponent::None,
            SeasonComponent::Additive,
            SeasonComponent::Multiplicative,
        ];

        let mut specs = Vec::new();
        for error in errors {
            for trend in trends {
                for season in seasons {
                    if let Ok(spec) = EtsSpec::new(error, trend, season, period) {
                        specs.push(spec);
                    }
                }
            }
        }
        specs
    }
}

impl fmt::Display for EtsSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
