use crate::types::{ColorScaleBounds, DerivedStatRecord, MergedRow, RegionGeometry, StatRecord};
use std::collections::HashMap;

pub fn derive_all(records: &[StatRecord]) -> Vec<DerivedStatRecord> {
    records.iter().map(DerivedStatRecord::derive).collect()
}

/// Natural-change extent over the whole dataset, or `None` when there is
/// nothing to scale.
pub fn color_scale_bounds(records: &[StatRecord]) -> Option<ColorScaleBounds> {
    let mut values = derive_all(records).into_iter().map(|r| r.natural_change());
    let first = values.next()?;

    let (min, max) = values.fold((first, first), |(min, max), v| (min.min(v), max.max(v)));
    Some(ColorScaleBounds { min, max })
}

pub fn filter_year(records: &[StatRecord], year: i32) -> Vec<DerivedStatRecord> {
    records.iter()
        .filter(|r| r.year == year)
        .map(DerivedStatRecord::derive)
        .collect()
}

pub fn normalize_region_name(name: &str) -> &str {
    name.trim()
}

/// Inner join anchored on the geometry table: output follows geometry order,
/// and a county missing on either side is dropped.
pub fn join_geometry(year_rows: Vec<DerivedStatRecord>, geometry: &[RegionGeometry]) -> Vec<MergedRow> {
    let mut by_region: HashMap<String, DerivedStatRecord> = HashMap::with_capacity(year_rows.len());
    for row in year_rows {
        by_region.insert(normalize_region_name(row.region()).to_string(), row);
    }

    let mut merged = Vec::with_capacity(by_region.len());

    for region in geometry {
        if let Some(stats) = by_region.remove(normalize_region_name(&region.name)) {
            merged.push(MergedRow {
                stats,
                geometry: region.boundary.clone(),
            });
        }
    }

    for unmatched in by_region.keys() {
        tracing::debug!("No geometry for region {:?}, dropped from join", unmatched);
    }

    merged
}

pub fn filter_join(records: &[StatRecord], geometry: &[RegionGeometry], year: i32) -> Vec<MergedRow> {
    join_geometry(filter_year(records, year), geometry)
}
