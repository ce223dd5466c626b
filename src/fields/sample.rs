//! Synthetic display values, used to exercise the cleaner without a camera

use rand::seq::SliceRandom;
use rand::Rng;

use super::{FieldSpec, NumericSpec};

const TEXT_VALUES: [&str; 5] = ["wine", "beer", "coffee", "soda", "water"];

/// Generate a plausible reading for `spec`.
///
/// With `current`, the new value drifts a few units away from it and stays
/// inside the display range; without, it is drawn uniformly from that range.
/// The result is truncated to what the display can show.
pub fn sample_value<R: Rng + ?Sized>(spec: &FieldSpec, current: Option<&str>, rng: &mut R) -> String {
    let (value, max_length) = match spec {
        FieldSpec::Integer(numeric) => (sample_number(numeric, 0, current, rng), numeric.max_length),
        FieldSpec::Float(float) => (
            sample_number(&float.numeric, float.decimal_digits, current, rng),
            float.numeric.max_length,
        ),
        FieldSpec::Text(text) => (
            TEXT_VALUES.choose(rng).copied().unwrap_or("water").to_string(),
            text.max_length,
        ),
        FieldSpec::Composite(composite) => ("100/100".to_string(), composite.max_length),
    };

    let max_length = if value.contains('.') { max_length + 1 } else { max_length };
    value.chars().take(max_length).collect()
}

fn sample_number<R: Rng + ?Sized>(
    spec: &NumericSpec,
    decimal_digits: u32,
    current: Option<&str>,
    rng: &mut R,
) -> String {
    let min = spec.display.min.unwrap_or(0.0);
    let max = spec
        .display
        .max
        .unwrap_or_else(|| 10f64.powi(spec.max_length as i32) - 1.0)
        .max(min);

    let value = match current.and_then(|c| c.parse::<f64>().ok()) {
        Some(current) => {
            let mut value = current + rng.gen_range(-3i64..=3) as f64;
            if decimal_digits > 0 && rng.gen_bool(0.5) {
                value += 0.1;
            }
            value.clamp(min, max)
        }
        None => {
            let base = rng.gen_range(min.floor() as i64..=max.floor() as i64) as f64;
            if decimal_digits > 0 {
                let divisor = 10i64.pow(decimal_digits);
                base + rng.gen_range(0..=divisor) as f64 / divisor as f64
            } else {
                base
            }
        }
    };

    if decimal_digits == 0 {
        format!("{}", value.trunc() as i64)
    } else {
        format!("{:.*}", decimal_digits as usize, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldRegistry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sample_within_display_range() {
        let registry = FieldRegistry::builtin().unwrap();
        let hr = registry.lookup("HR").unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let value: i64 = sample_value(hr, None, &mut rng).parse().unwrap();
            assert!((45..=120).contains(&value), "HR sample out of range: {}", value);
        }
    }

    #[test]
    fn test_sample_drifts_from_current() {
        let registry = FieldRegistry::builtin().unwrap();
        let rr = registry.lookup("RR").unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let value: i64 = sample_value(rr, Some("15"), &mut rng).parse().unwrap();
            assert!((12..=18).contains(&value));
        }
    }

    #[test]
    fn test_sample_float_has_decimals() {
        let registry = FieldRegistry::builtin().unwrap();
        let temp = registry.lookup("Temp").unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let value = sample_value(temp, None, &mut rng);
        assert!(value.contains('.'));
        assert!(value.len() <= 4);
        let parsed: f64 = value.parse().unwrap();
        // the fractional part is drawn on top of the integer range
        assert!((35.0..=39.0).contains(&parsed));
    }

    #[test]
    fn test_sample_text_and_composite() {
        let registry = FieldRegistry::builtin().unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let name = sample_value(registry.lookup("Medication Name").unwrap(), None, &mut rng);
        assert!(TEXT_VALUES.contains(&name.as_str()));
        assert_eq!(sample_value(registry.lookup("NIBP").unwrap(), None, &mut rng), "100/100");
    }
}
