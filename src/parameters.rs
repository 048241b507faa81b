//! Tunable parameters used throughout cluster confirmation
//!
//! Parameters are resolved in three layers: built-in defaults, an optional JSON configuration file,
//! and finally any explicit command-line value. Each layer is a partial record where a field left
//! unset falls through to the layer below. After merging, the resulting [ConfirmParameters] is
//! never modified again during the run.
//!

use std::fs::File;
use std::io::BufReader;

use camino::Utf8Path;
use clap::Args;
use log::info;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail, try_with};

/// Define the full parameter record together with its partial-override counterpart
///
/// Every parameter is given once here so that the defaults, the config file keys and the
/// command-line options cannot drift apart.
///
macro_rules! confirm_parameters {
    ($($(#[doc = $doc:expr])* $name:ident : $ty:ty = $default:expr,)+) => {
        #[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
        pub struct ConfirmParameters {
            $(
                $(#[doc = $doc])*
                pub $name: $ty,
            )+
        }

        impl Default for ConfirmParameters {
            fn default() -> Self {
                Self {
                    $($name: $default,)+
                }
            }
        }

        /// Partial parameter record, any value given here replaces the corresponding value
        /// of the layer below it
        ///
        #[derive(Args, Clone, Debug, Default, Deserialize)]
        #[serde(deny_unknown_fields)]
        pub struct ParameterOverrides {
            $(
                $(#[doc = $doc])*
                #[arg(long)]
                pub $name: Option<$ty>,
            )+
        }

        impl ConfirmParameters {
            /// Replace every parameter value which is present in `overrides`
            ///
            pub fn with_overrides(self, overrides: &ParameterOverrides) -> Self {
                Self {
                    $($name: overrides.$name.unwrap_or(self.$name),)+
                }
            }
        }
    };
}

confirm_parameters! {
    /// Length of the read prefix and suffix extracted as read tails
    tail_span: usize = 1000,

    /// Minimum MAPQ of a read tail alignment used to anchor a read around a cluster
    tail_min_mapq: u8 = 30,

    /// Lower bound of the relative deviation between tail anchor span and expected read span
    tail_min_deviation: f64 = -0.02,

    /// Upper bound of the relative deviation between tail anchor span and expected read span
    tail_max_deviation: f64 = 0.1,

    /// Size of the read windows used for k-mer counting
    count_win_size: usize = 100,

    /// K-mer size used for counting
    count_k: usize = 13,

    /// Band width for k-mer hits, as a fraction of the counting window size
    count_band: f64 = 0.5,

    /// Minimum number of banded k-mer hits for a read window to match
    stretch_threshold: usize = 4,

    /// Number of non-matching windows tolerated inside one stretch
    stretch_tolerance: usize = 2,

    /// Minimum number of matching windows in a stretch
    stretch_min_length: usize = 3,

    /// Constant term of the path gap cost
    path_constant_gap_cost: f64 = 0.0,

    /// Linear term of the path gap cost
    path_linear_gap_cost: f64 = 0.01,

    /// Quadratic term of the path gap cost
    path_convex_gap_cost: f64 = 0.0,

    /// Square root term of the path gap cost
    path_root_gap_cost: f64 = 1.0,

    /// Overlap allowed between consecutive path segments, in counting windows
    path_tolerance: usize = 2,

    /// Score of one matched base in a path segment
    align_costs_match: i32 = 3,

    /// Score of one unexplained counting window between two path segments
    align_costs_mismatch: i32 = -12,

    /// Score for opening a gap between two path segments
    align_costs_gap: i32 = -12,

    /// Minimum size of an alignment gap reported as an SV signature
    min_length: i64 = 50,

    /// Maximum read gap between two split alignment segments of one read
    max_segment_gap_tolerance: i64 = 10,

    /// Maximum size of a deletion signature taken from a single alignment
    max_deletion_size: i64 = 10_000,

    /// Maximum read overlap between two split alignment segments of one read
    segment_overlap_tolerance: i64 = 5,

    /// Inversion clusters spanning more than this are not confirmed
    max_sv_size: i64 = 100_000,

    /// Confirm deletion evidence clusters with this score or larger
    confirm_del_min: f64 = 0.0,

    /// Confirm insertion evidence clusters with this score or larger
    confirm_ins_min: f64 = 0.0,

    /// Confirm inversion evidence clusters with this score or larger
    confirm_inv_min: f64 = 0.0,
}

impl ConfirmParameters {
    /// Check parameter values which would make the evidence extractors ill-defined
    ///
    pub fn validate(&self) -> SimpleResult<()> {
        if self.tail_span == 0 {
            bail!("tail_span must be greater than 0");
        }
        if self.count_win_size == 0 {
            bail!("count_win_size must be greater than 0");
        }
        if self.count_k == 0 || self.count_k > self.count_win_size {
            bail!(
                "count_k must be in the range [1,count_win_size], observed: {}",
                self.count_k
            );
        }
        if self.count_band < 0.0 {
            bail!("count_band must not be negative");
        }
        if self.tail_min_deviation > self.tail_max_deviation {
            bail!(
                "tail_min_deviation ({}) exceeds tail_max_deviation ({})",
                self.tail_min_deviation,
                self.tail_max_deviation
            );
        }
        if self.stretch_min_length == 0 {
            bail!("stretch_min_length must be greater than 0");
        }
        for (label, value) in [
            ("min_length", self.min_length),
            ("max_segment_gap_tolerance", self.max_segment_gap_tolerance),
            ("max_deletion_size", self.max_deletion_size),
            ("segment_overlap_tolerance", self.segment_overlap_tolerance),
            ("max_sv_size", self.max_sv_size),
        ] {
            if value < 0 {
                bail!("{label} must not be negative, observed: {value}");
            }
        }
        Ok(())
    }

    /// Band width for k-mer diagonals, in bases
    pub fn band_width(&self) -> i64 {
        (self.count_band * self.count_win_size as f64).round() as i64
    }
}

/// Read parameter overrides from a flat JSON object of parameter names to values
///
pub fn read_parameter_overrides(filename: &Utf8Path) -> SimpleResult<ParameterOverrides> {
    info!("Reading parameter configuration from file: '{filename}'");
    let file = try_with!(
        File::open(filename),
        "Unable to open parameter configuration file: '{filename}'"
    );
    let reader = BufReader::new(file);
    let overrides = try_with!(
        serde_json::from_reader(reader),
        "Unable to parse parameter configuration file: '{filename}'"
    );
    Ok(overrides)
}

/// Merge default, config file and command-line parameter layers, last present value wins
///
pub fn resolve_parameters(
    config_file: Option<&ParameterOverrides>,
    cmdline: &ParameterOverrides,
) -> SimpleResult<ConfirmParameters> {
    let mut parameters = ConfirmParameters::default();
    if let Some(config_file) = config_file {
        parameters = parameters.with_overrides(config_file);
    }
    let parameters = parameters.with_overrides(cmdline);
    parameters.validate()?;
    Ok(parameters)
}

/// Write the resolved parameters out in json format
pub fn write_parameters(filename: &Utf8Path, parameters: &ConfirmParameters) -> SimpleResult<()> {
    info!("Writing confirmation parameters to file: '{filename}'");

    let f = try_with!(
        File::create(filename),
        "Unable to create parameter json file: '{filename}'"
    );
    try_with!(
        serde_json::to_writer_pretty(&f, parameters),
        "Unable to write parameter json file: '{filename}'"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layered_overrides() {
        let config_file: ParameterOverrides =
            serde_json::from_str(r#"{"tail_span": 500, "count_k": 11, "confirm_del_min": 5.0}"#)
                .unwrap();
        let cmdline = ParameterOverrides {
            count_k: Some(15),
            ..Default::default()
        };

        let parameters = resolve_parameters(Some(&config_file), &cmdline).unwrap();

        // File value wins over default:
        assert_eq!(parameters.tail_span, 500);
        assert_eq!(parameters.confirm_del_min, 5.0);

        // Cmdline value wins over file:
        assert_eq!(parameters.count_k, 15);

        // Absent everywhere keeps the default:
        assert_eq!(parameters.tail_min_mapq, 30);
        assert_eq!(parameters.max_deletion_size, 10_000);
    }

    #[test]
    fn test_unknown_config_key() {
        let result = serde_json::from_str::<ParameterOverrides>(r#"{"tail_spam": 500}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        assert!(ConfirmParameters::default().validate().is_ok());

        let parameters = ConfirmParameters {
            tail_min_deviation: 0.5,
            ..Default::default()
        };
        assert!(parameters.validate().is_err());

        let parameters = ConfirmParameters {
            count_k: 0,
            ..Default::default()
        };
        assert!(parameters.validate().is_err());
    }

    #[test]
    fn test_write_parameters() {
        let tmp = tempfile::tempdir().unwrap();
        let filename = camino::Utf8PathBuf::from_path_buf(tmp.path().join("p.json")).unwrap();
        let parameters = ConfirmParameters::default();
        write_parameters(&filename, &parameters).unwrap();

        // The written record is itself a complete, valid override layer
        let reread = read_parameter_overrides(&filename).unwrap();
        assert_eq!(
            ConfirmParameters {
                tail_span: 1,
                ..Default::default()
            }
            .with_overrides(&reread),
            parameters
        );
    }
}
