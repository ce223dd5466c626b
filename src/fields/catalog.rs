//! Built-in field catalogs for the supported device types

use super::{
    CompositeSpec, DeviceType, FieldEntry, FieldPattern, FieldSpec, FloatSpec, NumericSpec, Repair,
    SplitFields, TextSpec,
};
use crate::error::{CleanError, Result};

/// Blood pressure reading: two numbers separated by `/`, which OCR often sees as `1` or `7`
const BLOOD_PRESSURE_PATTERN: &str = r".*?([1-2]{0,1}[0-9]{1,2}) *([/17]) *([1-2]{0,1}[0-9]{1,2}).*";
const BLOOD_PRESSURE_REWRITE: &str = "${1}/${3}";

/// Temperatures read without their decimal point land in this open interval
const TEMPERATURE_REPAIR: Repair = Repair::ImpliedDecimal { low: 350, high: 420 };

fn integer(spec: NumericSpec) -> FieldSpec {
    FieldSpec::Integer(spec)
}

fn float(spec: NumericSpec, decimal_digits: u32) -> FieldSpec {
    FieldSpec::Float(FloatSpec {
        numeric: spec,
        decimal_digits,
    })
}

fn text(max_length: usize) -> FieldSpec {
    FieldSpec::Text(TextSpec { max_length })
}

fn blood_pressure(field: &str) -> Result<FieldSpec> {
    let pattern = FieldPattern::new(BLOOD_PRESSURE_PATTERN).map_err(|source| CleanError::InvalidPattern {
        field: field.to_string(),
        source,
    })?;
    Ok(FieldSpec::Composite(CompositeSpec {
        max_length: 7,
        pattern,
        rewrite: Some(BLOOD_PRESSURE_REWRITE.to_string()),
        split_into: Some(SplitFields {
            systolic: format!("{}-Systole", field),
            diastolic: format!("{}-Diastole", field),
        }),
    }))
}

/// Catalog entries for one device type, in display order
pub fn device_fields(device: DeviceType) -> Result<Vec<FieldEntry>> {
    let fields: Vec<(&str, FieldSpec)> = match device {
        DeviceType::Ivac => vec![
            ("Medication Name", text(10)),
            ("Volume Left to Infuse", integer(NumericSpec::new(3).display(Some(10.0), None))),
            ("Volume to Insert", integer(NumericSpec::new(3).display(Some(10.0), None))),
            ("Infusion Rate", float(NumericSpec::new(4).display(Some(0.0), None), 1)),
        ],
        DeviceType::Respirator => vec![
            ("Ventilation Mode", text(10)),
            (
                "Tidal Volume",
                integer(NumericSpec::new(3).display(Some(350.0), Some(600.0)).valid(200.0, 1000.0)),
            ),
            ("Expiratory Tidal Volume", integer(NumericSpec::new(3))),
            ("Rate", integer(NumericSpec::new(2).display(Some(10.0), Some(40.0)).valid(0.0, 99.0))),
            ("Total Rate", integer(NumericSpec::new(2).display(Some(10.0), Some(40.0)).valid(0.0, 99.0))),
            ("Peep", integer(NumericSpec::new(2).valid(0.0, 99.0).repair(Repair::MergeDecimal))),
            ("Ppeak", integer(NumericSpec::new(2).display(None, Some(40.0)))),
            ("FIO2", integer(NumericSpec::new(3))),
            // Operators select only the X.X part of the ratio, without the leading 1
            ("I:E Ratio", float(NumericSpec::new(2), 1)),
            ("Inspiratory time", float(NumericSpec::new(2), 1)),
        ],
        DeviceType::Monitor => vec![
            ("HR", integer(NumericSpec::new(3).display(Some(45.0), Some(120.0)).valid(10.0, 200.0))),
            ("SpO2", integer(NumericSpec::new(3).display(Some(90.0), None).valid(20.0, 100.0))),
            ("RR", integer(NumericSpec::new(2).display(Some(8.0), Some(26.0)).valid(0.0, 99.0))),
            ("IBP", blood_pressure("IBP")?),
            ("NIBP", blood_pressure("NIBP")?),
            ("IBP-Mean", integer(NumericSpec::new(3).valid(10.0, 500.0))),
            ("NIBP-Mean", integer(NumericSpec::new(3).valid(10.0, 500.0))),
            ("IBP-Systole", integer(NumericSpec::new(3).display(Some(80.0), Some(180.0)).valid(40.0, 299.0))),
            ("IBP-Diastole", integer(NumericSpec::new(3).display(Some(40.0), Some(100.0)).valid(40.0, 299.0))),
            ("NIBP-Systole", integer(NumericSpec::new(3).display(Some(80.0), Some(180.0)).valid(40.0, 299.0))),
            ("NIBP-Diastole", integer(NumericSpec::new(3).display(Some(40.0), Some(100.0)).valid(40.0, 299.0))),
            (
                "Temp",
                float(
                    NumericSpec::new(3)
                        .min_length(2)
                        .display(Some(35.0), Some(38.0))
                        .valid(33.0, 45.0)
                        .repair(TEMPERATURE_REPAIR),
                    1,
                ),
            ),
            ("etCO2", integer(NumericSpec::new(2).display(Some(24.0), Some(44.0)).valid(0.0, 999.0))),
        ],
    };

    Ok(fields
        .into_iter()
        .map(|(name, spec)| FieldEntry {
            name: name.to_string(),
            device: Some(device),
            spec,
        })
        .collect())
}
