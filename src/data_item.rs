// src/data_item.rs - Catalog view of a monitored data source
//
// The device catalog owns data items; observations only keep a shared
// reference to one. This module defines the slice of the catalog the core
// consumes: identity, category, payload shape and unit conversion.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category reported by the catalog for a data item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Continuously varying measurement
    Sample,
    /// Discrete state or message
    Event,
    /// Health condition of a component
    Condition,
}

impl Category {
    /// Catalog spelling of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sample => "SAMPLE",
            Category::Event => "EVENT",
            Category::Condition => "CONDITION",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layout of an observation value for a given data item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Plain sample or event value
    Scalar,
    /// `CODE|NATIVE_CODE|SEVERITY|STATE`
    Alarm,
    /// `SEVERITY|NATIVE_CODE|[SUB_TYPE]`
    Condition,
}

/// Linear conversion from native units to agent units
///
/// The converted value is `(value + offset) * factor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    /// Multiplier applied after the offset
    #[serde(default = "default_factor")]
    pub factor: f64,

    /// Offset added before scaling
    #[serde(default)]
    pub offset: f64,
}

impl Conversion {
    /// Build a conversion from factor and offset
    pub fn new(factor: f64, offset: f64) -> Self {
        Self { factor, offset }
    }

    /// True when applying the conversion would not change any value
    pub fn is_identity(&self) -> bool {
        self.factor == 1.0 && self.offset == 0.0
    }

    /// Convert a native value into agent units
    pub fn apply(&self, value: f64) -> f64 {
        (value + self.offset) * self.factor
    }
}

impl Default for Conversion {
    fn default() -> Self {
        Self {
            factor: default_factor(),
            offset: 0.0,
        }
    }
}

/// Catalog entry for a monitored data source
///
/// Observations hold this through an `Arc`; the catalog keeps it alive for
/// as long as any observation refers to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataItem {
    /// Stable identifier, unique within an agent
    pub id: String,

    /// Human readable name
    #[serde(default)]
    pub name: Option<String>,

    /// Catalog category
    pub category: Category,

    /// Catalog type, e.g. `TEMPERATURE`, `EXECUTION`, `ALARM`
    #[serde(default, rename = "type")]
    pub kind: String,

    /// Catalog sub-type
    #[serde(default)]
    pub sub_type: Option<String>,

    /// Units reported by the device
    #[serde(default)]
    pub native_units: Option<String>,

    /// Units the agent publishes in
    #[serde(default)]
    pub units: Option<String>,

    /// Native to agent unit conversion for samples
    #[serde(default)]
    pub conversion: Option<Conversion>,
}

impl DataItem {
    /// Create a data item with the given id and category
    pub fn new(id: impl Into<String>, category: Category, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            category,
            kind: kind.into(),
            sub_type: None,
            native_units: None,
            units: None,
            conversion: None,
        }
    }

    /// Sample data item
    pub fn sample(id: impl Into<String>) -> Self {
        Self::new(id, Category::Sample, "")
    }

    /// Event data item
    pub fn event(id: impl Into<String>) -> Self {
        Self::new(id, Category::Event, "")
    }

    /// Alarm data item (an event of type `ALARM`)
    pub fn alarm(id: impl Into<String>) -> Self {
        Self::new(id, Category::Event, "ALARM")
    }

    /// Condition data item
    pub fn condition(id: impl Into<String>) -> Self {
        Self::new(id, Category::Condition, "")
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the catalog type
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the catalog sub-type
    pub fn with_sub_type(mut self, sub_type: impl Into<String>) -> Self {
        self.sub_type = Some(sub_type.into());
        self
    }

    /// Set native and published units
    pub fn with_units(mut self, native: impl Into<String>, units: impl Into<String>) -> Self {
        self.native_units = Some(native.into());
        self.units = Some(units.into());
        self
    }

    /// Set the unit conversion
    pub fn with_conversion(mut self, conversion: Conversion) -> Self {
        self.conversion = Some(conversion);
        self
    }

    /// Payload layout of this item's observations
    pub fn shape(&self) -> Shape {
        match self.category {
            Category::Condition => Shape::Condition,
            Category::Event if self.kind.eq_ignore_ascii_case("ALARM") => Shape::Alarm,
            _ => Shape::Scalar,
        }
    }

    /// Alarms and conditions both accumulate in a condition chain
    pub fn is_condition(&self) -> bool {
        !matches!(self.shape(), Shape::Scalar)
    }

    /// True when sample values must be converted before publication
    pub fn conversion_required(&self) -> bool {
        self.category == Category::Sample
            && self.conversion.map_or(false, |c| !c.is_identity())
    }

    /// Normalize a decoded value into agent units
    ///
    /// Only numeric sample values are converted; everything else passes
    /// through unchanged.
    pub fn normalize(&self, value: Value) -> Value {
        match self.conversion {
            Some(conversion) if self.conversion_required() => {
                value.map_numeric(|v| conversion.apply(v))
            }
            _ => value,
        }
    }
}

fn default_factor() -> f64 {
    1.0
}
