// ============================================================
// SUMMARY AGGREGATOR
// ============================================================
// Per-field descriptive statistics and type distribution

use std::collections::BTreeMap;

use crate::domain::equipment::{
    DatasetSummary, EquipmentRecord, FieldStatistics, FieldStats, NumericField,
};
use crate::domain::error::{AppError, Result};

/// Summarize a non-empty record set.
///
/// Reductions are sequential in input order, so the same input always gives
/// bit-identical output.
pub fn aggregate(records: &[EquipmentRecord]) -> Result<DatasetSummary> {
    if records.is_empty() {
        return Err(AppError::NoValidRows { dropped: 0 });
    }

    let stats = FieldStatistics {
        flowrate: field_stats(records, NumericField::Flowrate),
        pressure: field_stats(records, NumericField::Pressure),
        temperature: field_stats(records, NumericField::Temperature),
    };

    let mut type_distribution: BTreeMap<String, i64> = BTreeMap::new();
    for record in records {
        *type_distribution
            .entry(record.equipment_type.clone())
            .or_insert(0) += 1;
    }

    Ok(DatasetSummary {
        record_count: records.len(),
        stats,
        type_distribution,
    })
}

fn field_stats(records: &[EquipmentRecord], field: NumericField) -> FieldStats {
    let n = records.len() as f64;

    // Running mean rather than sum / n: a sum of values near f64::MAX
    // overflows to infinity.
    let mut mean = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for (k, value) in records.iter().map(|r| r.value(field)).enumerate() {
        mean += (value - mean) / (k + 1) as f64;
        min = min.min(value);
        max = max.max(value);
    }

    // Rounding in the update can push the mean a hair outside [min, max].
    if min <= max {
        mean = mean.clamp(min, max);
    }

    let std_dev = if records.len() > 1 {
        // Deviations are scaled to the largest magnitude so squaring stays finite.
        let scale = min.abs().max(max.abs());
        let scale = if scale > 0.0 { scale } else { 1.0 };
        let squared: f64 = records
            .iter()
            .map(|r| {
                let d = (r.value(field) - mean) / scale;
                d * d
            })
            .sum();
        Some((squared / (n - 1.0)).sqrt() * scale)
    } else {
        None
    };

    FieldStats {
        mean,
        min,
        max,
        std_dev,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(name: &str, ty: &str, flow: f64, pressure: f64, temp: f64) -> EquipmentRecord {
        EquipmentRecord {
            name: name.to_string(),
            equipment_type: ty.to_string(),
            flowrate: flow,
            pressure,
            temperature: temp,
        }
    }

    #[test]
    fn test_two_record_summary() {
        let records = vec![
            record("Pump-1", "Pump", 45.2, 12.5, 298.15),
            record("Valve-1", "Valve", 0.0, 15.2, 295.0),
        ];

        let summary = aggregate(&records).unwrap();
        assert_eq!(summary.record_count, 2);
        assert_eq!(summary.stats.flowrate.mean, 22.6);
        assert_eq!(summary.stats.flowrate.min, 0.0);
        assert_eq!(summary.stats.flowrate.max, 45.2);
        assert_eq!(summary.type_distribution.get("Pump"), Some(&1));
        assert_eq!(summary.type_distribution.get("Valve"), Some(&1));

        let std = summary.stats.pressure.std_dev.unwrap();
        assert!((std - 1.909188309203678).abs() < 1e-12);
    }

    #[test]
    fn test_single_record_has_no_std_dev() {
        let summary = aggregate(&[record("P", "Pump", 1.0, 2.0, 3.0)]).unwrap();
        assert_eq!(summary.stats.flowrate.std_dev, None);
        assert_eq!(summary.stats.temperature.mean, 3.0);
    }

    #[test]
    fn test_type_keys_are_verbatim() {
        let records = vec![
            record("a", "Pump", 1.0, 1.0, 1.0),
            record("b", "pump", 1.0, 1.0, 1.0),
            record("c", "Pump ", 1.0, 1.0, 1.0),
            record("d", "Pump", 1.0, 1.0, 1.0),
        ];

        let summary = aggregate(&records).unwrap();
        assert_eq!(summary.type_distribution.len(), 3);
        assert_eq!(summary.type_distribution["Pump"], 2);
        assert_eq!(summary.type_distribution["pump"], 1);
        assert_eq!(summary.type_distribution["Pump "], 1);
    }

    #[test]
    fn test_mean_stays_within_bounds_for_repeated_values() {
        let records: Vec<_> = (0..3).map(|i| record(&i.to_string(), "X", 0.1, 0.1, 0.1)).collect();
        let summary = aggregate(&records).unwrap();
        assert!(summary.stats.flowrate.mean <= summary.stats.flowrate.max);
        assert_eq!(summary.stats.flowrate.mean, 0.1);
    }

    #[test]
    fn test_values_near_f64_max_stay_finite() {
        let records = vec![
            record("a", "Pump", 1.7e308, 1.0, 1.0),
            record("b", "Pump", 1.0e308, 1.0, 1.0),
        ];

        let flow = aggregate(&records).unwrap().stats.flowrate;
        assert!(flow.mean.is_finite());
        assert!((flow.mean - 1.35e308).abs() / 1.35e308 < 1e-12);
        assert!(flow.mean < flow.max);

        let std = flow.std_dev.unwrap();
        assert!(std.is_finite());
        assert!((std - 0.7e308 / 2f64.sqrt()).abs() / std < 1e-12);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert_eq!(aggregate(&[]), Err(AppError::NoValidRows { dropped: 0 }));
    }

    proptest! {
        #[test]
        fn prop_summary_invariants(
            rows in prop::collection::vec(
                (0.0f64..1.0e6, 0.0f64..1.0e4, -273.15f64..5000.0, 0usize..4),
                1..60,
            )
        ) {
            let types = ["Pump", "Valve", "Reactor", "Compressor"];
            let records: Vec<_> = rows
                .iter()
                .enumerate()
                .map(|(i, (f, p, t, k))| record(&i.to_string(), types[*k], *f, *p, *t))
                .collect();

            let summary = aggregate(&records).unwrap();
            prop_assert_eq!(summary.record_count, records.len());
            prop_assert_eq!(
                summary.type_distribution.values().sum::<i64>(),
                records.len() as i64
            );
            for field in NumericField::ALL {
                let s = summary.stats.get(field);
                prop_assert!(s.min <= s.mean && s.mean <= s.max);
            }
            prop_assert_eq!(aggregate(&records).unwrap(), summary);
        }
    }
}
