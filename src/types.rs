use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// One row of the RV032 table: a county and year, split by sex.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatRecord {
    #[serde(rename = "Aasta")]
    pub year: i32,
    #[serde(rename = "Maakond")]
    pub region: String,
    #[serde(rename = "Mehed Elussünnid")]
    pub male_births: i64,
    #[serde(rename = "Naised Elussünnid")]
    pub female_births: i64,
    #[serde(rename = "Mehed Surmad")]
    pub male_deaths: i64,
    #[serde(rename = "Naised Surmad")]
    pub female_deaths: i64,
    #[serde(rename = "Mehed Loomulik iive")]
    pub male_natural_change: i64,
    #[serde(rename = "Naised Loomulik iive")]
    pub female_natural_change: i64,
}

/// A [`StatRecord`] with both sexes summed.
///
/// The totals are only ever produced by [`DerivedStatRecord::derive`], so they
/// always equal the pairwise sums of the source columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedStatRecord {
    record: StatRecord,
    births: i64,
    deaths: i64,
    natural_change: i64,
}

impl DerivedStatRecord {
    pub fn derive(record: &StatRecord) -> Self {
        Self {
            births: record.male_births + record.female_births,
            deaths: record.male_deaths + record.female_deaths,
            natural_change: record.male_natural_change + record.female_natural_change,
            record: record.clone(),
        }
    }

    pub fn record(&self) -> &StatRecord {
        &self.record
    }

    pub fn year(&self) -> i32 {
        self.record.year
    }

    pub fn region(&self) -> &str {
        &self.record.region
    }

    pub fn births(&self) -> i64 {
        self.births
    }

    pub fn deaths(&self) -> i64 {
        self.deaths
    }

    pub fn natural_change(&self) -> i64 {
        self.natural_change
    }
}

#[derive(Debug, Clone)]
pub struct RegionGeometry {
    pub name: String,
    pub boundary: MultiPolygon<f64>,
}

/// A county's statistics for the selected year, with its boundary attached.
#[derive(Debug, Clone)]
pub struct MergedRow {
    pub stats: DerivedStatRecord,
    pub geometry: MultiPolygon<f64>,
}

impl MergedRow {
    pub fn region(&self) -> &str {
        self.stats.region()
    }

    pub fn table_row(&self) -> TableRow {
        TableRow {
            region: self.stats.region().to_string(),
            births: self.stats.births(),
            deaths: self.stats.deaths(),
            natural_change: self.stats.natural_change(),
        }
    }
}

/// The four columns shown in the dashboard table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub region: String,
    pub births: i64,
    pub deaths: i64,
    pub natural_change: i64,
}

/// Natural-change extent over every year and county, so colours stay
/// comparable when the year changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorScaleBounds {
    pub min: i64,
    pub max: i64,
}

impl ColorScaleBounds {
    /// Position of `value` on the scale, clamped to `0.0..=1.0`.
    /// A degenerate scale (min == max) maps everything to the middle.
    pub fn normalize(&self, value: i64) -> f64 {
        if self.max <= self.min {
            return 0.5;
        }
        let t = (value - self.min) as f64 / (self.max - self.min) as f64;
        t.clamp(0.0, 1.0)
    }
}
