use crate::config::ScaleMethod;
use fast_image_resize::images::Image;
use fast_image_resize::{self as fr, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::RgbaImage;
use image::imageops::{self, FilterType};
use tracing::warn;

/// A resampling strategy used to scale sprites before trimming and canvases on export.
pub trait Resampler {
    fn resize(&self, src: &RgbaImage, width: u32, height: u32) -> RgbaImage;
}

/// Delegates to `image::imageops::resize` for the kernels the image crate ships.
pub struct FilterResampler(pub FilterType);

impl Resampler for FilterResampler {
    fn resize(&self, src: &RgbaImage, width: u32, height: u32) -> RgbaImage {
        imageops::resize(src, width, height, self.0)
    }
}

/// Convolution resizing through `fast_image_resize`, for the kernels the image crate lacks.
pub struct FastResampler(pub fr::FilterType);

impl FastResampler {
    pub fn mitchell() -> Self {
        Self(fr::FilterType::Mitchell)
    }

    /// Two-lobe Lanczos. Falls back to the three-lobe filter if the kernel is rejected.
    pub fn lanczos2() -> Self {
        match fr::Filter::new("lanczos2", lanczos2_kernel, 2.0) {
            Ok(filter) => Self(fr::FilterType::Custom(filter)),
            Err(_) => Self(fr::FilterType::Lanczos3),
        }
    }

    fn try_resize(&self, src: &RgbaImage, width: u32, height: u32) -> Option<RgbaImage> {
        let (sw, sh) = src.dimensions();
        let src_image = Image::from_vec_u8(sw, sh, src.as_raw().clone(), PixelType::U8x4).ok()?;
        let mut dst_image = Image::new(width, height, PixelType::U8x4);
        let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(self.0));
        Resizer::new()
            .resize(&src_image, &mut dst_image, &options)
            .ok()?;
        RgbaImage::from_raw(width, height, dst_image.into_vec())
    }
}

impl Resampler for FastResampler {
    fn resize(&self, src: &RgbaImage, width: u32, height: u32) -> RgbaImage {
        if width == 0 || height == 0 || src.width() == 0 || src.height() == 0 {
            return RgbaImage::new(width, height);
        }
        match self.try_resize(src, width, height) {
            Some(out) => out,
            None => {
                warn!(width, height, "convolution resize failed, using lanczos3");
                imageops::resize(src, width, height, FilterType::Lanczos3)
            }
        }
    }
}

fn lanczos2_kernel(x: f64) -> f64 {
    let sinc = |v: f64| {
        if v == 0.0 {
            1.0
        } else {
            let pv = std::f64::consts::PI * v;
            pv.sin() / pv
        }
    };
    if x.abs() < 2.0 { sinc(x) * sinc(x / 2.0) } else { 0.0 }
}

/// Picks the resampler matching a configured scale method.
pub fn resampler_for(method: ScaleMethod) -> Box<dyn Resampler + Send + Sync> {
    match method {
        ScaleMethod::Nearest => Box::new(FilterResampler(FilterType::Nearest)),
        ScaleMethod::Cubic => Box::new(FilterResampler(FilterType::CatmullRom)),
        ScaleMethod::Lanczos3 => Box::new(FilterResampler(FilterType::Lanczos3)),
        ScaleMethod::Mitchell => Box::new(FastResampler::mitchell()),
        ScaleMethod::Lanczos2 => Box::new(FastResampler::lanczos2()),
    }
}

/// Scales `src` by `scale`, rounding each dimension and keeping at least one pixel.
pub fn scale_image(src: &RgbaImage, scale: f32, method: ScaleMethod) -> RgbaImage {
    let (w, h) = src.dimensions();
    let nw = ((w as f32 * scale).round() as u32).max(1);
    let nh = ((h as f32 * scale).round() as u32).max(1);
    if (nw, nh) == (w, h) {
        return src.clone();
    }
    resampler_for(method).resize(src, nw, nh)
}
