use serde::Serialize;

use crate::error::StoreError;
use crate::model::ImportBatch;
use crate::store::ReportSource;

/// Percent thresholds for KPI coloring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KpiBands {
    pub green_at: f64,
    pub yellow_at: f64,
}

impl Default for KpiBands {
    fn default() -> Self {
        Self {
            green_at: 80.0,
            yellow_at: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiBand {
    Green,
    Yellow,
    Red,
}

impl KpiBands {
    pub fn band(&self, percent: f64) -> KpiBand {
        if percent >= self.green_at {
            KpiBand::Green
        } else if percent >= self.yellow_at {
            KpiBand::Yellow
        } else {
            KpiBand::Red
        }
    }
}

impl std::fmt::Display for KpiBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Green => write!(f, "green"),
            Self::Yellow => write!(f, "yellow"),
            Self::Red => write!(f, "red"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Kpi {
    pub label: String,
    pub incorporated: usize,
    pub total: usize,
    pub percent: f64,
    pub band: KpiBand,
}

impl Kpi {
    pub fn new(label: impl Into<String>, incorporated: usize, total: usize, bands: &KpiBands) -> Self {
        let percent = if total == 0 {
            0.0
        } else {
            incorporated as f64 * 100.0 / total as f64
        };
        Self {
            label: label.into(),
            incorporated,
            total,
            percent,
            band: bands.band(percent),
        }
    }

    pub fn percent_label(&self) -> String {
        format!("{:.1}%", self.percent)
    }

    pub fn detail(&self) -> String {
        format!("{} of {} incorporated", self.incorporated, self.total)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub total: Kpi,
    pub sellers: Vec<Kpi>,
    pub products: Vec<Kpi>,
    pub last_batch: Option<ImportBatch>,
}

impl Dashboard {
    /// `last update: <file> · dd/mm`, if any import has run.
    pub fn last_update_line(&self) -> Option<String> {
        self.last_batch.as_ref().map(|b| {
            format!(
                "last update: {} · {}",
                b.filename,
                b.imported_at.with_timezone(&chrono::Local).format("%d/%m")
            )
        })
    }
}

pub fn build_dashboard<R: ReportSource + ?Sized>(
    source: &R,
    bands: &KpiBands,
) -> Result<Dashboard, StoreError> {
    let total = Kpi::new("Total", source.total_incorporated()?, source.total_pairs()?, bands);
    let sellers = source
        .per_seller()?
        .into_iter()
        .map(|s| Kpi::new(s.seller, s.incorporated, s.incorporated + s.pending, bands))
        .collect();
    let products = source
        .per_product()?
        .into_iter()
        .map(|p| {
            let label = if p.name == p.code {
                p.code
            } else {
                format!("{} - {}", p.code, p.name)
            };
            Kpi::new(label, p.incorporated, p.incorporated + p.pending, bands)
        })
        .collect();

    Ok(Dashboard {
        total,
        sellers,
        products,
        last_batch: source.last_batch()?,
    })
}
