//! TSV Serializing helpers, functionality, etc.

use crate::{traits::TsvSerialize, Position};
use lazy_static::lazy_static;

lazy_static! {
    /// The UTR extension table configuration: missing values are empty fields.
    pub static ref UTR_TSV: TsvConfig = TsvConfig {
        no_value_string: "".to_string(),
        float_precision: 6,
    };
}

/// This is an extensible type to handle common
/// TSV output configurations, e.g. what to print
/// for `None`, or how many decimals to write.
pub struct TsvConfig {
    pub no_value_string: String,
    pub float_precision: usize,
}

impl TsvSerialize for &str {
    #![allow(unused_variables)]
    fn to_tsv(&self, config: &TsvConfig) -> String {
        self.to_string()
    }
}

impl TsvSerialize for String {
    #![allow(unused_variables)]
    fn to_tsv(&self, config: &TsvConfig) -> String {
        self.to_string()
    }
}

impl TsvSerialize for Position {
    #![allow(unused_variables)]
    fn to_tsv(&self, config: &TsvConfig) -> String {
        self.to_string()
    }
}

impl TsvSerialize for usize {
    #![allow(unused_variables)]
    fn to_tsv(&self, config: &TsvConfig) -> String {
        self.to_string()
    }
}

impl TsvSerialize for f64 {
    fn to_tsv(&self, config: &TsvConfig) -> String {
        format!("{:.*}", config.float_precision, self)
    }
}

impl<U: TsvSerialize> TsvSerialize for Option<U> {
    fn to_tsv(&self, config: &TsvConfig) -> String {
        self.as_ref()
            .map_or(config.no_value_string.clone(), |x| x.to_tsv(config))
    }
}

impl<U: TsvSerialize> TsvSerialize for Vec<U> {
    fn to_tsv(&self, config: &TsvConfig) -> String {
        self.iter()
            .map(|x| x.to_tsv(config))
            .collect::<Vec<_>>()
            .join("\t")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_values_are_empty() {
        let values: Vec<Option<Position>> = vec![Some(10), None, Some(0)];
        assert_eq!(values.to_tsv(&UTR_TSV), "10\t\t0");
    }

    #[test]
    fn test_float_precision() {
        assert_eq!(0.5_f64.to_tsv(&UTR_TSV), "0.500000");
    }
}
