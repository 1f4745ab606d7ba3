use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub i64);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    Personnel,
    Freight,
}

impl VehicleType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Personnel => "Personnel",
            Self::Freight => "Freight",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Personnel" => Some(Self::Personnel),
            "Freight" => Some(Self::Freight),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ownership {
    Company,
    Rental,
}

impl Ownership {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Company => "Company",
            Self::Rental => "Rental",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Company" => Some(Self::Company),
            "Rental" => Some(Self::Rental),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: VehicleId,
    pub model_name: String,
    pub plate_number: String,
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
    pub ownership: Ownership,
    pub location: String,
    /// Litres per 100 km.
    pub fuel_consumption: f64,
    pub last_service: Option<DateTime<Utc>>,
    pub current_fuel: f64,
}
