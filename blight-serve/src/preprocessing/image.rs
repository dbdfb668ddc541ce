use crate::config::{InputConfig, PixelScaling, TensorLayout};
use crate::error::InferenceError;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use ndarray::Array4;

// ImageNet Standards
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Decodes raw upload bytes (format guessed from content) and adapts them to
/// the model input described by `input`.
pub fn process_bytes(buffer: &[u8], input: &InputConfig) -> Result<Array4<f32>, InferenceError> {
    let img = image::load_from_memory(buffer)?;
    to_tensor(&img, input)
}

/// Converts a decoded image into a batch-of-one tensor.
///
/// Alpha is dropped and grayscale expanded to RGB before resizing, so the
/// channel count is always 3.
pub fn to_tensor(img: &DynamicImage, input: &InputConfig) -> Result<Array4<f32>, InferenceError> {
    if input.width == 0 || input.height == 0 {
        return Err(InferenceError::PreprocessingError(format!(
            "model input size must be non-zero, got {}x{}",
            input.width, input.height
        )));
    }

    let rgb = resize_rgb(img, input.width, input.height);
    let (w, h) = (input.width as usize, input.height as usize);
    let value = |x: usize, y: usize, c: usize| {
        scale(rgb.get_pixel(x as u32, y as u32)[c], c, input.scaling)
    };

    let array = match input.layout {
        TensorLayout::Nhwc => Array4::from_shape_fn((1, h, w, 3), |(_, y, x, c)| value(x, y, c)),
        TensorLayout::Nchw => Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| value(x, y, c)),
    };

    Ok(array)
}

fn resize_rgb(img: &DynamicImage, width: u32, height: u32) -> RgbImage {
    if img.width() == width && img.height() == height {
        img.to_rgb8()
    } else {
        img.resize_exact(width, height, FilterType::Triangle)
            .to_rgb8()
    }
}

fn scale(value: u8, channel: usize, scaling: PixelScaling) -> f32 {
    let v = value as f32;
    match scaling {
        PixelScaling::Raw => v,
        PixelScaling::Unit => v / 255.0,
        PixelScaling::Imagenet => ((v / 255.0) - MEAN[channel]) / STD[channel],
    }
}
