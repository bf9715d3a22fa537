use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ABSOLUTE_ZERO, COL_FLOWRATE, COL_PRESSURE, COL_TEMPERATURE};

/// The three numeric telemetry columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericField {
    Flowrate,
    Pressure,
    Temperature,
}

impl NumericField {
    pub const ALL: [NumericField; 3] = [
        NumericField::Flowrate,
        NumericField::Pressure,
        NumericField::Temperature,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Self::Flowrate => COL_FLOWRATE,
            Self::Pressure => COL_PRESSURE,
            Self::Temperature => COL_TEMPERATURE,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::Flowrate => "L/min",
            Self::Pressure => "bar",
            Self::Temperature => "K",
        }
    }

    /// Smallest physically plausible value.
    pub fn lower_bound(self) -> f64 {
        match self {
            Self::Flowrate | Self::Pressure => 0.0,
            Self::Temperature => ABSOLUTE_ZERO,
        }
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One normalized row of equipment telemetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

impl EquipmentRecord {
    pub fn value(&self, field: NumericField) -> f64 {
        match field {
            NumericField::Flowrate => self.flowrate,
            NumericField::Pressure => self.pressure,
            NumericField::Temperature => self.temperature,
        }
    }
}
