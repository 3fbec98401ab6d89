use serde::Deserialize;
use strum::{Display, EnumCount, EnumString, IntoStaticStr, VariantNames};

/// Class vocabulary, index-aligned with the classifier's output layer.
pub const CLASS_NAMES: [&str; NUM_CLASSES] = ["glioma", "meningioma", "notumor", "pituitary"];

pub const NUM_CLASSES: usize = 4;

/// Fixed network input resolution (width, height).
pub const INPUT_SIZE: (u32, u32) = (200, 200);

pub const CHANNELS: usize = 3;

/// Allowed deviation of the probability sum from 1.0.
pub const PROBABILITY_TOLERANCE: f32 = 1e-3;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumCount,
    IntoStaticStr,
    VariantNames,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TumorClass {
    Glioma,
    Meningioma,
    #[strum(serialize = "notumor")]
    #[serde(rename = "notumor")]
    NoTumor,
    Pituitary,
}

impl TumorClass {
    pub const ALL: [TumorClass; NUM_CLASSES] = [
        TumorClass::Glioma,
        TumorClass::Meningioma,
        TumorClass::NoTumor,
        TumorClass::Pituitary,
    ];

    /// Class for an output-layer index.
    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Name with the first letter upper-cased, e.g. `Meningioma`.
    pub fn display_name(self) -> String {
        let name = self.name();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub const fn is_tumor(self) -> bool {
        !matches!(self, TumorClass::NoTumor)
    }
}

/// Check an externally supplied class ordering against [`CLASS_NAMES`].
pub fn matches_class_order<S: AsRef<str>>(names: &[S]) -> bool {
    names.len() == NUM_CLASSES
        && names
            .iter()
            .zip(CLASS_NAMES.iter())
            .all(|(a, b)| a.as_ref().trim() == *b)
}
