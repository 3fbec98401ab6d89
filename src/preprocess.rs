use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use ndarray::{Array3, Array4, ArrayView3, Axis};
use serde::Deserialize;
use std::str::FromStr;
use strum::{Display, EnumString, VariantNames};

use crate::classes::{CHANNELS, INPUT_SIZE};
use crate::error::{AppError, Result};

const IMAGENET_MEAN: [f32; CHANNELS] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; CHANNELS] = [0.229, 0.224, 0.225];

/// Pixel normalization expected by the network's first layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, VariantNames)]
pub enum Normalization {
    /// `x / 127.5 - 1`, range [-1, 1] (Keras MobileNetV2 `preprocess_input`)
    #[default]
    #[strum(serialize = "mobilenet_v2")]
    MobileNetV2,

    /// `x / 255`, range [0, 1]
    #[strum(serialize = "unit")]
    Unit,

    /// `x / 255` followed by per-channel ImageNet mean/std
    #[strum(serialize = "imagenet")]
    ImageNet,
}

impl Normalization {
    #[inline]
    fn apply(self, value: u8, channel: usize) -> f32 {
        let v = f32::from(value);
        match self {
            Normalization::MobileNetV2 => v / 127.5 - 1.0,
            Normalization::Unit => v / 255.0,
            Normalization::ImageNet => (v / 255.0 - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel],
        }
    }

    /// Inclusive (min, max) of values this transform can produce.
    pub fn value_range(self) -> (f32, f32) {
        match self {
            Normalization::MobileNetV2 => (-1.0, 1.0),
            Normalization::Unit => (0.0, 1.0),
            Normalization::ImageNet => {
                let lo = (0..CHANNELS)
                    .map(|c| Self::ImageNet.apply(0, c))
                    .fold(f32::INFINITY, f32::min);
                let hi = (0..CHANNELS)
                    .map(|c| Self::ImageNet.apply(u8::MAX, c))
                    .fold(f32::NEG_INFINITY, f32::max);
                (lo, hi)
            }
        }
    }
}

/// Custom deserializer with helpful error message
pub fn deserialize_normalization<'de, D>(deserializer: D) -> Result<Normalization, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Normalization::from_str(&value).map_err(|_| {
        serde::de::Error::invalid_value(
            serde::de::Unexpected::Str(&value),
            &format!("one of {}", Normalization::VARIANTS.join(", ")).as_str(),
        )
    })
}

/// Network input of fixed shape `[height, width, channels]` (HWC, RGB).
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    data: Array3<f32>,
}

impl NormalizedTensor {
    pub const SHAPE: [usize; 3] = [INPUT_SIZE.1 as usize, INPUT_SIZE.0 as usize, CHANNELS];

    /// Wrap an existing array, rejecting any other shape.
    pub fn from_array(data: Array3<f32>) -> Result<Self> {
        if data.shape() != Self::SHAPE {
            return Err(AppError::InferenceFailure(format!(
                "tensor shape {:?} does not match network input {:?}",
                data.shape(),
                Self::SHAPE
            )));
        }
        Ok(Self { data })
    }

    /// All-zero input, used to probe a freshly loaded model.
    pub fn zeros() -> Self {
        Self {
            data: Array3::zeros(Self::SHAPE),
        }
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// Batch of one in NHWC layout, `[1, H, W, C]`.
    pub fn to_nhwc(&self) -> Array4<f32> {
        self.data.view().insert_axis(Axis(0)).to_owned()
    }

    /// Batch of one in NCHW layout, `[1, C, H, W]`.
    pub fn to_nchw(&self) -> Array4<f32> {
        self.data
            .view()
            .permuted_axes([2, 0, 1])
            .insert_axis(Axis(0))
            .as_standard_layout()
            .into_owned()
    }
}

/// Turn an arbitrary decoded image into the network input.
///
/// The image is resized straight to [`INPUT_SIZE`] (aspect ratio is not
/// kept), then coerced to RGB, then normalized.
pub fn preprocess(image: &DynamicImage, normalization: Normalization) -> Result<NormalizedTensor> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(AppError::InferenceFailure(format!(
            "image has empty dimensions {w}x{h}"
        )));
    }

    let (target_w, target_h) = INPUT_SIZE;
    let resized = if (w, h) == INPUT_SIZE {
        image.clone()
    } else {
        image.resize_exact(target_w, target_h, FilterType::CatmullRom)
    };
    let rgb = resized.to_rgb8();

    let data = Array3::from_shape_fn(NormalizedTensor::SHAPE, |(y, x, c)| {
        normalization.apply(rgb.get_pixel(x as u32, y as u32)[c], c)
    });

    NormalizedTensor::from_array(data)
}
