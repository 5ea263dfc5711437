//! Instrument taxonomy shared by every pipeline stage.
//!
//! Index position in [`CLASS_CODES`] is the binding contract between a
//! prediction vector entry and the instrument it scores. The list mirrors
//! the output layer of the classifier and must never be reordered.

use serde::{Deserialize, Serialize};

/// Number of instrument classes scored by the classifier
pub const NUM_CLASSES: usize = 11;

/// Class codes in model output order
pub const CLASS_CODES: [&str; NUM_CLASSES] = [
    "cel", "cla", "flu", "gac", "gel", "org", "pia", "sax", "tru", "vio", "voi",
];

/// Instrument recognised by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentClass {
    #[serde(rename = "cel")]
    Cello,
    #[serde(rename = "cla")]
    Clarinet,
    #[serde(rename = "flu")]
    Flute,
    #[serde(rename = "gac")]
    AcousticGuitar,
    #[serde(rename = "gel")]
    ElectricGuitar,
    #[serde(rename = "org")]
    Organ,
    #[serde(rename = "pia")]
    Piano,
    #[serde(rename = "sax")]
    Saxophone,
    #[serde(rename = "tru")]
    Trumpet,
    #[serde(rename = "vio")]
    Violin,
    #[serde(rename = "voi")]
    Voice,
}

impl InstrumentClass {
    /// All classes, in model output order
    pub const ALL: [InstrumentClass; NUM_CLASSES] = [
        InstrumentClass::Cello,
        InstrumentClass::Clarinet,
        InstrumentClass::Flute,
        InstrumentClass::AcousticGuitar,
        InstrumentClass::ElectricGuitar,
        InstrumentClass::Organ,
        InstrumentClass::Piano,
        InstrumentClass::Saxophone,
        InstrumentClass::Trumpet,
        InstrumentClass::Violin,
        InstrumentClass::Voice,
    ];

    /// Position of this class in every prediction vector
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short code used in reports
    pub fn code(self) -> &'static str {
        CLASS_CODES[self.index()]
    }

    pub fn display_name(self) -> &'static str {
        match self {
            InstrumentClass::Cello => "Cello",
            InstrumentClass::Clarinet => "Clarinet",
            InstrumentClass::Flute => "Flute",
            InstrumentClass::AcousticGuitar => "Acoustic Guitar",
            InstrumentClass::ElectricGuitar => "Electric Guitar",
            InstrumentClass::Organ => "Organ",
            InstrumentClass::Piano => "Piano",
            InstrumentClass::Saxophone => "Saxophone",
            InstrumentClass::Trumpet => "Trumpet",
            InstrumentClass::Violin => "Violin",
            InstrumentClass::Voice => "Voice",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        CLASS_CODES
            .iter()
            .position(|&c| c == code)
            .map(|idx| Self::ALL[idx])
    }
}

/// Default class name list for a pipeline configuration
pub fn default_class_names() -> Vec<String> {
    CLASS_CODES.iter().map(|code| code.to_string()).collect()
}

/// Human-readable name for a class code, falling back to the code itself
/// for taxonomies that extend the built-in list.
pub fn display_name_for(code: &str) -> &str {
    InstrumentClass::from_code(code)
        .map(InstrumentClass::display_name)
        .unwrap_or(code)
}
