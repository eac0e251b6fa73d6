//! Catalog vocabulary: archive tables, discovery methods, solution types and
//! response formats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExoError;

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// The literal the archive uses for this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Every value, in declaration order.
            pub fn all() -> &'static [$name] {
                &[$($name::$variant),+]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ExoError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::all()
                    .iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .copied()
                    .ok_or_else(|| {
                        ExoError::InvalidInput(format!(
                            "Unknown {}: '{}'",
                            stringify!($name),
                            s
                        ))
                    })
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.as_str().to_string()
            }
        }
    };
}

string_enum! {
    /// Tables served by the Exoplanet Archive TAP service.
    TableName {
        PlanetarySystems => "ps",
        PlanetarySystemsComposite => "pscomppars",
        TessToi => "toi",
        Microlensing => "ml",
        StellarHosts => "stellarhosts",
        KeplerNames => "keplernames",
        KeplerStellar => "keplerstellar",
        KeplerTimeSeries => "keplertimeseries",
        K2Names => "k2names",
        K2PlanetsCandidates => "k2pandc",
        K2Targets => "k2targets",
        UkirtTimeSeries => "ukirttimeseries",
        KeltTimeSeries => "kelttimeseries",
        SuperwaspTimeSeries => "superwasptimeseries",
        AtmosphericSpectroscopy => "spectra",
        HwoExepStars => "di_stars_exep",
        TransitingPlanets => "TD",
        KoiCumulative => "cumulative",
        KoiQ1Q17Dr25 => "q1_q17_dr25_koi",
        TceQ1Q17Dr25 => "q1_q17_dr25_tce",
        KeplerStellarQ1Q17Dr25 => "q1_q17_dr25_ks",
    }
}

string_enum! {
    /// Discovery methods as spelled in the `discoverymethod` column.
    DiscoveryMethod {
        RadialVelocity => "Radial Velocity",
        Transit => "Transit",
        Imaging => "Imaging",
        Microlensing => "Microlensing",
        EclipseTimingVariations => "Eclipse Timing Variations",
        OrbitalBrightnessModulation => "Orbital Brightness Modulation",
        PulsarTiming => "Pulsar Timing",
        PulsationTimingVariations => "Pulsation Timing Variations",
        Astrometry => "Astrometry",
    }
}

string_enum! {
    /// Solution types for planetary system rows.
    SolutionType {
        Confirmed => "CONFIRMED",
        Candidate => "CANDIDATE",
        FalsePositive => "FALSE POSITIVE",
    }
}

/// Response formats the TAP service can produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Votable,
    Csv,
    Tsv,
    #[default]
    Json,
}

impl OutputFormat {
    /// Value of the `format` request parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Votable => "votable",
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
