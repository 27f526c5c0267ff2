//! Analysis modules.
//!
//! Plateau estimation, derived quantities, aggregation across the run tree
//! and the per-configuration field sweeps built from it.

pub mod aggregator;
pub mod cosort;
pub mod derive;
pub mod plateau;
pub mod sweep;

pub use aggregator::*;

use crate::config::{Config, QuantitySpec};

/// Settings the analysis stage needs, extracted from [`Config`].
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub n_param: f64,
    pub magnetization_file: String,
    pub quantities: Vec<QuantitySpec>,
    pub m_first_pair: usize,
    pub m_second_pair: usize,
    pub critical_label: String,
    pub mr_quantity: String,
    pub polarization_quantity: String,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for AnalysisSettings {
    fn from(config: &Config) -> Self {
        Self {
            n_param: config.plateau.n_param,
            magnetization_file: config.layout.magnetization_file.clone(),
            quantities: config.layout.quantities.clone(),
            m_first_pair: config.layout.m_first_pair,
            m_second_pair: config.layout.m_second_pair,
            critical_label: config.layout.critical_label.clone(),
            mr_quantity: config.layout.mr_quantity.clone(),
            polarization_quantity: config.layout.polarization_quantity.clone(),
        }
    }
}

/// Quantity name under which the magnetization averages are recorded.
pub const MAGNETIZATION: &str = "m";
