//! Core domain types shared by the plate reader, the metric engine and the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fluorescence channel index (0 = FAM, 1 = VIC/HEX).
pub type Channel = usize;

pub const FAM: Channel = 0;
pub const VIC: Channel = 1;

/// Well position on a plate (A01-H12).
///
/// Ordering is row-major: every well of row A sorts before any well of row B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WellName {
    pub row: char,
    pub column: u8,
}

impl WellName {
    pub fn new(row: char, column: u8) -> Option<Self> {
        let row = row.to_ascii_uppercase();
        if ('A'..='P').contains(&row) && (1..=24).contains(&column) {
            Some(Self { row, column })
        } else {
            None
        }
    }

    /// Well names in the `a..=b` column range, used for titration layouts.
    pub fn column_in(&self, first: u8, last: u8) -> bool {
        (first..=last).contains(&self.column)
    }
}

impl fmt::Display for WellName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.row, self.column)
    }
}

impl FromStr for WellName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let row = chars
            .next()
            .ok_or_else(|| format!("Invalid well name: {:?}", s))?;
        let column: u8 = chars
            .as_str()
            .parse()
            .map_err(|_| format!("Invalid well name: {:?}", s))?;
        Self::new(row, column).ok_or_else(|| format!("Invalid well name: {:?}", s))
    }
}

impl TryFrom<String> for WellName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WellName> for String {
    fn from(value: WellName) -> Self {
        value.to_string()
    }
}

/// Plate type codes. Each code names a layout with its own expected samples
/// and its own calculator set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlateTypeCode {
    Bcarry,
    Bcc,
    Betaec,
    Mfgco,
    Mfgcc,
    Scc,
    Probeec,
    Evaec,
    Bsplex,
    Bdplex,
    Bdnr,
    Gdnr,
    Egdnr,
    Bred,
    Bcnv,
    Gcnv,
    Bfpfn,
    Bdye,
    Bdye2,
    Fam350,
    Fm350l,
    Fvtitr,
    Cnv200,
    Dnr200,
    Dplex200,
    Eg200,
    Tq200,
    #[serde(rename = "2x10")]
    Staph2x10,
    /// Auto-validation plate: several logical layouts share one physical plate.
    Av,
    #[serde(other)]
    Other,
}

impl PlateTypeCode {
    pub const ALL: [PlateTypeCode; 29] = [
        PlateTypeCode::Bcarry,
        PlateTypeCode::Bcc,
        PlateTypeCode::Betaec,
        PlateTypeCode::Mfgco,
        PlateTypeCode::Mfgcc,
        PlateTypeCode::Scc,
        PlateTypeCode::Probeec,
        PlateTypeCode::Evaec,
        PlateTypeCode::Bsplex,
        PlateTypeCode::Bdplex,
        PlateTypeCode::Bdnr,
        PlateTypeCode::Gdnr,
        PlateTypeCode::Egdnr,
        PlateTypeCode::Bred,
        PlateTypeCode::Bcnv,
        PlateTypeCode::Gcnv,
        PlateTypeCode::Bfpfn,
        PlateTypeCode::Bdye,
        PlateTypeCode::Bdye2,
        PlateTypeCode::Fam350,
        PlateTypeCode::Fm350l,
        PlateTypeCode::Fvtitr,
        PlateTypeCode::Cnv200,
        PlateTypeCode::Dnr200,
        PlateTypeCode::Dplex200,
        PlateTypeCode::Eg200,
        PlateTypeCode::Tq200,
        PlateTypeCode::Staph2x10,
        PlateTypeCode::Av,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlateTypeCode::Bcarry => "bcarry",
            PlateTypeCode::Bcc => "bcc",
            PlateTypeCode::Betaec => "betaec",
            PlateTypeCode::Mfgco => "mfgco",
            PlateTypeCode::Mfgcc => "mfgcc",
            PlateTypeCode::Scc => "scc",
            PlateTypeCode::Probeec => "probeec",
            PlateTypeCode::Evaec => "evaec",
            PlateTypeCode::Bsplex => "bsplex",
            PlateTypeCode::Bdplex => "bdplex",
            PlateTypeCode::Bdnr => "bdnr",
            PlateTypeCode::Gdnr => "gdnr",
            PlateTypeCode::Egdnr => "egdnr",
            PlateTypeCode::Bred => "bred",
            PlateTypeCode::Bcnv => "bcnv",
            PlateTypeCode::Gcnv => "gcnv",
            PlateTypeCode::Bfpfn => "bfpfn",
            PlateTypeCode::Bdye => "bdye",
            PlateTypeCode::Bdye2 => "bdye2",
            PlateTypeCode::Fam350 => "fam350",
            PlateTypeCode::Fm350l => "fm350l",
            PlateTypeCode::Fvtitr => "fvtitr",
            PlateTypeCode::Cnv200 => "cnv200",
            PlateTypeCode::Dnr200 => "dnr200",
            PlateTypeCode::Dplex200 => "dplex200",
            PlateTypeCode::Eg200 => "eg200",
            PlateTypeCode::Tq200 => "tq200",
            PlateTypeCode::Staph2x10 => "2x10",
            PlateTypeCode::Av => "av",
            PlateTypeCode::Other => "other",
        }
    }

    /// Multi-well colorcomp layouts (FAM/VIC HI/LO dye wells).
    pub fn is_colorcomp(&self) -> bool {
        matches!(self, PlateTypeCode::Bcc | PlateTypeCode::Mfgcc)
    }

    /// Carryover layouts (eventful wells followed by stealth wells).
    pub fn is_carryover(&self) -> bool {
        matches!(self, PlateTypeCode::Bcarry | PlateTypeCode::Mfgco)
    }

    /// Plate types whose layouts are mixed per well.
    pub fn is_mixed(&self) -> bool {
        matches!(self, PlateTypeCode::Av)
    }

    /// Logical layout of one well on an auto-validation plate, from the
    /// well's experiment name.
    pub fn of_auto_validation_well(experiment_name: Option<&str>) -> Option<PlateTypeCode> {
        match experiment_name? {
            "Validation-Carryover" => Some(PlateTypeCode::Mfgco),
            "Validation-CNV" => Some(PlateTypeCode::Bcnv),
            "Validation-DNR" => Some(PlateTypeCode::Bdnr),
            "Validation-Duplex" => Some(PlateTypeCode::Bdplex),
            "Validation-Dye" => Some(PlateTypeCode::Bdye2),
            "Validation-RED" => Some(PlateTypeCode::Bred),
            "Validation-Singleplex" => Some(PlateTypeCode::Bsplex),
            _ => None,
        }
    }
}

impl fmt::Display for PlateTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlateTypeCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        PlateTypeCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == lower)
            .ok_or_else(|| format!("Unknown plate type: {}", s))
    }
}

/// Single-well colorcomp dye sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dyeset {
    #[serde(rename = "FAM/VIC")]
    FamVic,
    #[serde(rename = "FAM/HEX")]
    FamHex,
}

impl Dyeset {
    /// Sample name carried by the calibration well.
    pub fn sample_name(&self) -> &'static str {
        match self {
            Dyeset::FamVic => "FAM/VIC",
            Dyeset::FamHex => "FAM/HEX",
        }
    }
}

impl fmt::Display for Dyeset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sample_name())
    }
}

impl FromStr for Dyeset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FAM/VIC" => Ok(Dyeset::FamVic),
            "FAM/HEX" => Ok(Dyeset::FamHex),
            _ => Err(format!("Unknown dyeset: {}", s)),
        }
    }
}
