//! Categorical experiment metadata encoded in the test name.
//!
//! Test names look like `SW-H2-A3`: structure family, impoundment height and
//! structure angle, optionally followed by a free-form suffix (`SW-H2-A3-R2`).

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InfoError {
    #[error("Test name '{0}' does not match <structure>-<height>-<angle>")]
    InvalidTestName(String),

    #[error("Unknown {kind} code '{code}'")]
    UnknownCode { kind: &'static str, code: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructureCode {
    SingleColumn,
    ShortWall,
    LongWall,
}

impl StructureCode {
    pub fn code(self) -> &'static str {
        match self {
            StructureCode::SingleColumn => "SC",
            StructureCode::ShortWall => "SW",
            StructureCode::LongWall => "LW",
        }
    }

    pub fn full_name(self) -> &'static str {
        match self {
            StructureCode::SingleColumn => "Single Column",
            StructureCode::ShortWall => "Short Wall",
            StructureCode::LongWall => "Long Wall",
        }
    }
}

impl FromStr for StructureCode {
    type Err = InfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SC" => Ok(StructureCode::SingleColumn),
            "SW" => Ok(StructureCode::ShortWall),
            "LW" => Ok(StructureCode::LongWall),
            other => Err(InfoError::UnknownCode {
                kind: "structure",
                code: other.to_string(),
            }),
        }
    }
}

/// Impoundment (upstream reservoir) height class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImpoundmentCode {
    H1,
    H2,
    H3,
}

impl ImpoundmentCode {
    pub fn code(self) -> &'static str {
        match self {
            ImpoundmentCode::H1 => "H1",
            ImpoundmentCode::H2 => "H2",
            ImpoundmentCode::H3 => "H3",
        }
    }

    /// Impoundment height in meters.
    pub fn height(self) -> f64 {
        match self {
            ImpoundmentCode::H1 => 0.7,
            ImpoundmentCode::H2 => 0.6,
            ImpoundmentCode::H3 => 0.5,
        }
    }

    pub fn full_name(self) -> &'static str {
        match self {
            ImpoundmentCode::H1 => "70 cm",
            ImpoundmentCode::H2 => "60 cm",
            ImpoundmentCode::H3 => "50 cm",
        }
    }
}

impl FromStr for ImpoundmentCode {
    type Err = InfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "H1" => Ok(ImpoundmentCode::H1),
            "H2" => Ok(ImpoundmentCode::H2),
            "H3" => Ok(ImpoundmentCode::H3),
            other => Err(InfoError::UnknownCode {
                kind: "impoundment",
                code: other.to_string(),
            }),
        }
    }
}

/// Structure angle class. The numeric rotation lives in the structure config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AngleCode {
    /// Not applicable (symmetric structure)
    A0,
    A1,
    A2,
    A3,
}

impl AngleCode {
    pub fn code(self) -> &'static str {
        match self {
            AngleCode::A0 => "A0",
            AngleCode::A1 => "A1",
            AngleCode::A2 => "A2",
            AngleCode::A3 => "A3",
        }
    }

    pub fn full_name(self) -> &'static str {
        match self {
            AngleCode::A0 => "Not Applicable",
            AngleCode::A1 => "0 Degrees",
            AngleCode::A2 => "45 Degrees",
            AngleCode::A3 => "90 Degrees",
        }
    }

    /// Nominal rotation in degrees; `None` for "not applicable".
    pub fn degrees(self) -> Option<f64> {
        match self {
            AngleCode::A0 => None,
            AngleCode::A1 => Some(0.0),
            AngleCode::A2 => Some(-45.0),
            AngleCode::A3 => Some(90.0),
        }
    }
}

impl FromStr for AngleCode {
    type Err = InfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A0" => Ok(AngleCode::A0),
            "A1" => Ok(AngleCode::A1),
            "A2" => Ok(AngleCode::A2),
            "A3" => Ok(AngleCode::A3),
            other => Err(InfoError::UnknownCode {
                kind: "angle",
                code: other.to_string(),
            }),
        }
    }
}

/// The three codes of a test name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExperimentInfo {
    pub structure: StructureCode,
    pub impoundment: ImpoundmentCode,
    pub angle: AngleCode,
}

impl ExperimentInfo {
    pub fn parse(test_name: &str) -> Result<Self, InfoError> {
        let pattern = Regex::new(r"^([A-Z]{2})-(H\d)-(A\d)(?:-.*)?$")
            .map_err(|_| InfoError::InvalidTestName(test_name.to_string()))?;
        let captures = pattern
            .captures(test_name.trim())
            .ok_or_else(|| InfoError::InvalidTestName(test_name.to_string()))?;

        Ok(Self {
            structure: captures[1].parse()?,
            impoundment: captures[2].parse()?,
            angle: captures[3].parse()?,
        })
    }
}

impl fmt::Display for ExperimentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {} impoundment, {}",
            self.structure.full_name(),
            self.impoundment.full_name(),
            self.angle.full_name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_test_name() {
        let info = ExperimentInfo::parse("SW-H2-A3").unwrap();
        assert_eq!(info.structure, StructureCode::ShortWall);
        assert_eq!(info.impoundment, ImpoundmentCode::H2);
        assert_eq!(info.angle, AngleCode::A3);
        assert_eq!(info.impoundment.height(), 0.6);
    }

    #[test]
    fn test_parse_with_suffix() {
        let info = ExperimentInfo::parse("LW-H1-A0-R2").unwrap();
        assert_eq!(info.structure, StructureCode::LongWall);
        assert_eq!(info.angle, AngleCode::A0);
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(
            ExperimentInfo::parse("XX-H1-A1").unwrap_err(),
            InfoError::UnknownCode {
                kind: "structure",
                code: "XX".to_string()
            }
        );
        assert!(matches!(
            ExperimentInfo::parse("SC-H9-A1"),
            Err(InfoError::UnknownCode { kind: "impoundment", .. })
        ));
        assert!(matches!(
            ExperimentInfo::parse("SC_H1_A1"),
            Err(InfoError::InvalidTestName(_))
        ));
    }

    #[test]
    fn test_angle_degrees() {
        assert_eq!(AngleCode::A0.degrees(), None);
        assert_eq!(AngleCode::A2.degrees(), Some(-45.0));
    }

    #[test]
    fn test_display() {
        let info = ExperimentInfo::parse("SC-H3-A2").unwrap();
        assert_eq!(
            info.to_string(),
            "Single Column, 50 cm impoundment, 45 Degrees"
        );
    }
}
