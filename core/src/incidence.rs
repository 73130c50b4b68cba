//! CVD incidence and person-time bookkeeping, and the calibration score.
//!
//! Both grids are bucketed by sex × twelve five-year age bands (25–29 to
//! 80–84). Agents outside that range are never counted. A bucket with no
//! person-time has an undefined rate (`None`); such buckets are left out of
//! the fit score and counted in `FitScore::undefined_buckets`.

use crate::types::{AgeBand, Sex, AGE_BAND_COUNT};
use serde::{Deserialize, Serialize};

/// Indexed `[sex.index()][band.index()]`.
pub type SexBandGrid<T> = [[T; AGE_BAND_COUNT]; 2];

/// Published CVD incidence per 1000 person-years (Hippisley-Cox et al., 2017).
pub const REFERENCE_INCIDENCE: SexBandGrid<f64> = [
    // Male
    [4.0, 9.9, 21.2, 39.9, 66.5, 98.6, 141.8, 196.9, 265.5, 354.8, 451.6, 582.9],
    // Female
    [2.4, 4.9, 10.2, 19.0, 32.0, 48.3, 74.7, 113.6, 171.3, 250.8, 351.1, 480.2],
];

/// Events per 1000 person-years; undefined without person-time.
pub fn rate_per_thousand(incidents: u64, person_years: u64) -> Option<f64> {
    if person_years == 0 {
        None
    } else {
        Some(incidents as f64 / person_years as f64 * 1000.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidenceTracker {
    cvd_count:    SexBandGrid<u64>,
    person_years: SexBandGrid<u64>,
    reference:    SexBandGrid<f64>,
}

impl Default for IncidenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl IncidenceTracker {
    pub fn new() -> Self {
        Self::with_reference(REFERENCE_INCIDENCE)
    }

    pub fn with_reference(reference: SexBandGrid<f64>) -> Self {
        Self {
            cvd_count: [[0; AGE_BAND_COUNT]; 2],
            person_years: [[0; AGE_BAND_COUNT]; 2],
            reference,
        }
    }

    pub fn add_person_year(&mut self, sex: Sex, band: AgeBand) {
        self.person_years[sex.index()][band.index()] += 1;
    }

    pub fn record_event(&mut self, sex: Sex, band: AgeBand) {
        self.cvd_count[sex.index()][band.index()] += 1;
    }

    pub fn cvd_count(&self, sex: Sex, band: AgeBand) -> u64 {
        self.cvd_count[sex.index()][band.index()]
    }

    pub fn person_years(&self, sex: Sex, band: AgeBand) -> u64 {
        self.person_years[sex.index()][band.index()]
    }

    pub fn reference(&self, sex: Sex, band: AgeBand) -> f64 {
        self.reference[sex.index()][band.index()]
    }

    pub fn rate(&self, sex: Sex, band: AgeBand) -> Option<f64> {
        rate_per_thousand(self.cvd_count(sex, band), self.person_years(sex, band))
    }

    pub fn total_events(&self, sex: Sex) -> u64 {
        self.cvd_count[sex.index()].iter().sum()
    }

    pub fn total_person_years(&self, sex: Sex) -> u64 {
        self.person_years[sex.index()].iter().sum()
    }

    /// Deviation of the modelled rates from the reference grid.
    pub fn fit_score(&self) -> FitScore {
        let mut score = FitScore::default();
        for sex in Sex::ALL {
            for band in AgeBand::all() {
                let Some(rate) = self.rate(sex, band) else {
                    score.undefined_buckets += 1;
                    continue;
                };
                let diff = rate - self.reference(sex, band);
                score.absolute += diff.abs();
                if diff < 0.0 {
                    score.under += diff;
                } else {
                    score.over += diff;
                }
            }
        }
        if score.undefined_buckets > 0 {
            log::warn!(
                "{} sex/age buckets have no person-time; left out of the fit score",
                score.undefined_buckets
            );
        }
        score
    }

    pub fn report(&self) -> IncidenceReport {
        let rows = AgeBand::all()
            .map(|band| IncidenceRow {
                age_group:   band.label(),
                f_incidents: self.cvd_count(Sex::Female, band),
                f_years:     self.person_years(Sex::Female, band),
                f_rate:      self.rate(Sex::Female, band),
                m_incidents: self.cvd_count(Sex::Male, band),
                m_years:     self.person_years(Sex::Male, band),
                m_rate:      self.rate(Sex::Male, band),
            })
            .collect();

        let (f_incidents, f_years) = (self.total_events(Sex::Female), self.total_person_years(Sex::Female));
        let (m_incidents, m_years) = (self.total_events(Sex::Male), self.total_person_years(Sex::Male));
        IncidenceReport {
            rows,
            total: IncidenceRow {
                age_group: "total".into(),
                f_incidents,
                f_years,
                f_rate: rate_per_thousand(f_incidents, f_years),
                m_incidents,
                m_years,
                m_rate: rate_per_thousand(m_incidents, m_years),
            },
        }
    }
}

/// Calibration fit: the sum of absolute deviations, split into the
/// signed under- and over-estimation sums.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FitScore {
    pub absolute:          f64,
    /// Sum of negative deviations (model below reference). Always <= 0.
    pub under:             f64,
    /// Sum of non-negative deviations (model at or above reference).
    pub over:              f64,
    pub undefined_buckets: usize,
}

impl FitScore {
    /// True when every bucket is defined and matches the reference.
    pub fn is_exact(&self) -> bool {
        self.absolute == 0.0 && self.undefined_buckets == 0
    }
}

/// One line of the per-run incidence table. Column names follow the
/// published table layout; `None` rates are written as empty cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidenceRow {
    #[serde(rename = "age group")]
    pub age_group:   String,
    #[serde(rename = "incidents (w)")]
    pub f_incidents: u64,
    #[serde(rename = "person years (w)")]
    pub f_years:     u64,
    #[serde(rename = "rate per 1000 person years (w)")]
    pub f_rate:      Option<f64>,
    #[serde(rename = "incidents (m)")]
    pub m_incidents: u64,
    #[serde(rename = "person years (m)")]
    pub m_years:     u64,
    #[serde(rename = "rate per 1000 person years (m)")]
    pub m_rate:      Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidenceReport {
    pub rows:  Vec<IncidenceRow>,
    pub total: IncidenceRow,
}

impl IncidenceReport {
    /// Band rows followed by the totals row.
    pub fn all_rows(&self) -> impl Iterator<Item = &IncidenceRow> {
        self.rows.iter().chain(std::iter::once(&self.total))
    }
}
