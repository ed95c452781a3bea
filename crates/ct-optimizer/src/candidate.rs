//! Candidate value generation for single-option perturbations.

use ct_types::{
    validation_error, CatalogError, ConfigOption, OptionCatalog, OptionType, TuneResult,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Describes how a new value for one option is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SamplingDomain {
    /// `true` or `false` with equal probability.
    Boolean,
    /// Integer range [low, high). `high` itself is never produced.
    IntRange { low: i64, high: i64 },
    /// Continuous range [low, high].
    FloatRange { low: f64, high: f64 },
}

impl SamplingDomain {
    /// Derive the domain of an option.
    ///
    /// Integral bounds always sample integers, even for options declared as
    /// `float`. Degenerate ranges are rejected here rather than at sampling
    /// time.
    pub fn for_option(option: &ConfigOption) -> TuneResult<Self> {
        option.validate()?;
        if option.option_type == OptionType::Bool {
            return Ok(Self::Boolean);
        }
        if option.has_integral_bounds() {
            Ok(Self::IntRange {
                low: option.min as i64,
                high: option.max as i64,
            })
        } else {
            Ok(Self::FloatRange {
                low: option.min,
                high: option.max,
            })
        }
    }

    /// Draw one value from the domain.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> CandidateValue {
        match *self {
            Self::Boolean => CandidateValue::Bool(rng.random_bool(0.5)),
            Self::IntRange { low, high } => CandidateValue::Int(rng.random_range(low..high)),
            Self::FloatRange { low, high } => {
                let u: f64 = rng.random();
                CandidateValue::Float((low + u * (high - low)).min(high))
            }
        }
    }

    pub fn contains(&self, value: &CandidateValue) -> bool {
        match (self, value) {
            (Self::Boolean, CandidateValue::Bool(_)) => true,
            (Self::IntRange { low, high }, CandidateValue::Int(v)) => v >= low && v < high,
            (Self::FloatRange { low, high }, CandidateValue::Float(v)) => v >= low && v <= high,
            _ => false,
        }
    }
}

/// A concrete candidate produced for an option.
///
/// Values cross the control surface as text; `Display` gives that form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CandidateValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl fmt::Display for CandidateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Produce a new legal value for `option`.
pub fn generate<R: Rng>(option: &ConfigOption, rng: &mut R) -> TuneResult<CandidateValue> {
    Ok(SamplingDomain::for_option(option)?.sample(rng))
}

/// Parse a textual value according to the option's declared type.
pub fn parse_value(option: &ConfigOption, text: &str) -> TuneResult<CandidateValue> {
    let text = text.trim();
    match option.option_type {
        OptionType::Bool => match text {
            "true" => Ok(CandidateValue::Bool(true)),
            "false" => Ok(CandidateValue::Bool(false)),
            _ => Err(validation_error!(
                "{}: '{}' is not a boolean",
                option.name,
                text
            )),
        },
        OptionType::Int => text.parse::<i64>().map(CandidateValue::Int).map_err(|e| {
            validation_error!("{}: '{}' is not an integer: {}", option.name, text, e)
        }),
        OptionType::Float => text.parse::<f64>().map(CandidateValue::Float).map_err(|e| {
            validation_error!("{}: '{}' is not a number: {}", option.name, text, e)
        }),
    }
}

/// Pick an option uniformly at random, with replacement.
pub fn select_option<'a, R: Rng>(
    catalog: &'a OptionCatalog,
    rng: &mut R,
) -> TuneResult<&'a ConfigOption> {
    if catalog.is_empty() {
        return Err(CatalogError::Empty.into());
    }
    let index = rng.random_range(0..catalog.len());
    catalog.get(index).ok_or_else(|| CatalogError::Empty.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_types::TuneError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn boolean_values_are_balanced() {
        let option = ConfigOption::boolean("bluestore_compression_enabled");
        let mut rng = rng();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..10_000 {
            let value = generate(&option, &mut rng).unwrap().to_string();
            *counts.entry(value).or_default() += 1;
        }
        assert_eq!(counts.len(), 2);
        let trues = counts["true"] as f64 / 10_000.0;
        assert!((trues - 0.5).abs() < 0.03, "true frequency {trues}");
        assert!(counts.contains_key("false"));
    }

    #[test]
    fn integer_upper_bound_is_exclusive() {
        let option = ConfigOption::int("cache_size", 100.0, 200.0);
        let mut rng = rng();
        let mut saw_min = false;
        for _ in 0..10_000 {
            match generate(&option, &mut rng).unwrap() {
                CandidateValue::Int(v) => {
                    assert!((100..200).contains(&v), "out of range: {v}");
                    saw_min |= v == 100;
                }
                other => panic!("unexpected candidate {other:?}"),
            }
        }
        assert!(saw_min);
    }

    #[test]
    fn single_value_integer_range_always_yields_min() {
        let option = ConfigOption::int("osd_max_backfills", 3.0, 4.0);
        let mut rng = rng();
        for _ in 0..100 {
            assert_eq!(generate(&option, &mut rng).unwrap(), CandidateValue::Int(3));
        }
    }

    #[test]
    fn float_type_with_integral_bounds_samples_integers() {
        let option = ConfigOption::float("osd_recovery_max_active", 1.0, 5.0);
        assert_eq!(
            SamplingDomain::for_option(&option).unwrap(),
            SamplingDomain::IntRange { low: 1, high: 5 }
        );
    }

    #[test]
    fn fractional_bounds_stay_inclusive() {
        let option = ConfigOption::float("osd_recovery_sleep", 0.1, 0.3);
        let domain = SamplingDomain::for_option(&option).unwrap();
        let mut rng = rng();
        for _ in 0..10_000 {
            let value = domain.sample(&mut rng);
            assert!(domain.contains(&value), "out of range: {value}");
        }
    }

    #[test]
    fn collapsed_fractional_range_yields_the_bound() {
        let option = ConfigOption::float("ratio", 0.5, 0.5);
        let mut rng = rng();
        assert_eq!(generate(&option, &mut rng).unwrap(), CandidateValue::Float(0.5));
    }

    #[test]
    fn degenerate_integer_range_is_an_error() {
        let option = ConfigOption::int("cache_size", 200.0, 100.0);
        let err = generate(&option, &mut rng()).unwrap_err();
        assert!(matches!(err, TuneError::Validation(_)));
    }

    #[test]
    fn seeded_generation_is_deterministic() {
        let option = ConfigOption::float("osd_recovery_sleep", 0.0, 1.5);
        let a: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..20).map(|_| generate(&option, &mut rng).unwrap()).collect()
        };
        let b: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..20).map(|_| generate(&option, &mut rng).unwrap()).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn display_matches_cluster_text() {
        assert_eq!(CandidateValue::Bool(true).to_string(), "true");
        assert_eq!(CandidateValue::Int(-4).to_string(), "-4");
        assert_eq!(CandidateValue::Float(0.25).to_string(), "0.25");
    }

    #[test]
    fn parse_value_checks_declared_type() {
        let flag = ConfigOption::boolean("flag");
        assert_eq!(parse_value(&flag, "true").unwrap(), CandidateValue::Bool(true));
        assert!(parse_value(&flag, "yes").is_err());

        let threads = ConfigOption::int("threads", 1.0, 8.0);
        assert_eq!(parse_value(&threads, " 4\n").unwrap(), CandidateValue::Int(4));
        assert!(parse_value(&threads, "4.5").is_err());

        let sleep = ConfigOption::float("sleep", 0.0, 1.0);
        assert_eq!(parse_value(&sleep, "0.5").unwrap(), CandidateValue::Float(0.5));
    }

    #[test]
    fn selection_is_with_replacement() {
        let catalog = OptionCatalog::new(vec![
            ConfigOption::boolean("a"),
            ConfigOption::boolean("b"),
        ])
        .unwrap();
        let mut rng = rng();
        let picks: Vec<&str> = (0..200)
            .map(|_| select_option(&catalog, &mut rng).unwrap().name.as_str())
            .collect();
        assert!(picks.contains(&"a"));
        assert!(picks.contains(&"b"));
        assert!(picks.windows(2).any(|w| w[0] == w[1]));
    }

    #[test]
    fn selecting_from_empty_catalog_fails() {
        let catalog = OptionCatalog::default();
        assert!(select_option(&catalog, &mut rng()).is_err());
    }
}
