// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// Letterbox 预处理: 等比缩放 + 居中填充到方形输入
// 输出 NCHW f32 张量 (归一化到 [0,1]) 和还原坐标所需的仿射参数

use image::{DynamicImage, GenericImageView};
use ndarray::{Array, IxDyn};

use crate::error::DetectError;

/// Letterbox 仿射参数, 每次调用产生一份, 只被紧随其后的后处理消费
///
/// 不变量: `r > 0`, `left >= 0`, `top >= 0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxParams {
    /// 等比缩放比例 min(target/h, target/w)
    pub r: f32,
    /// 左侧填充像素数
    pub left: f32,
    /// 顶部填充像素数
    pub top: f32,
}

/// Letterbox 变换
///
/// 1. r = min(target/h, target/w), 等比缩放到 (round(h*r), round(w*r))
/// 2. 居中放入 target×target 黑色画布, 余数由右/下侧吸收
/// 3. 输出 [1, 3, target, target] 张量, 像素归一化到 [0,1]
pub fn letterbox(
    img: &DynamicImage,
    target_size: u32,
) -> Result<(Array<f32, IxDyn>, LetterboxParams), DetectError> {
    let (w0, h0) = img.dimensions();
    if w0 == 0 || h0 == 0 {
        return Err(DetectError::invalid_image(format!(
            "图像尺寸非法: {}x{}",
            w0, h0
        )));
    }
    if target_size == 0 {
        return Err(DetectError::invalid_image("目标尺寸必须为正"));
    }

    let target = target_size as f32;
    let r = (target / h0 as f32).min(target / w0 as f32);
    let new_w = ((w0 as f32 * r).round() as u32).max(1);
    let new_h = ((h0 as f32 * r).round() as u32).max(1);
    let left = (target_size - new_w) / 2;
    let top = (target_size - new_h) / 2;

    let resized = img.resize_exact(new_w, new_h, image::imageops::FilterType::Triangle);

    // 黑色画布 (边界填充值 0)
    let mut ys = Array::zeros((1, 3, target_size as usize, target_size as usize)).into_dyn();
    for (x, y, rgb) in resized.pixels() {
        let x = (x + left) as usize;
        let y = (y + top) as usize;
        let [r_, g, b, _] = rgb.0;
        ys[[0, 0, y, x]] = (r_ as f32) / 255.0;
        ys[[0, 1, y, x]] = (g as f32) / 255.0;
        ys[[0, 2, y, x]] = (b as f32) / 255.0;
    }

    Ok((
        ys,
        LetterboxParams {
            r,
            left: left as f32,
            top: top as f32,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letterbox_output_shape() {
        let img = DynamicImage::new_rgb8(100, 50);
        let (tensor, _) = letterbox(&img, 320).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 320, 320]);
    }

    #[test]
    fn test_letterbox_1280x720_at_640() {
        // 1280x720 → r=0.5, 缩放为 640x360, top=(640-360)/2=140, left=0
        let img = DynamicImage::new_rgb8(1280, 720);
        let (_, params) = letterbox(&img, 640).unwrap();
        assert!((params.r - 0.5).abs() < 1e-6);
        assert_eq!(params.left, 0.0);
        assert_eq!(params.top, 140.0);
    }

    #[test]
    fn test_letterbox_square_image_no_padding() {
        let img = DynamicImage::new_rgb8(320, 320);
        let (_, params) = letterbox(&img, 320).unwrap();
        assert!((params.r - 1.0).abs() < 1e-6);
        assert_eq!(params.left, 0.0);
        assert_eq!(params.top, 0.0);
    }

    #[test]
    fn test_letterbox_scale_formula() {
        // r 恒等于 min(target/h, target/w)
        let img = DynamicImage::new_rgb8(200, 800);
        let (_, params) = letterbox(&img, 320).unwrap();
        assert!((params.r - 320.0 / 800.0).abs() < 1e-6);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let mut rgb = image::RgbImage::new(10, 10);
        for p in rgb.pixels_mut() {
            *p = image::Rgb([255, 128, 0]);
        }
        let img = DynamicImage::ImageRgb8(rgb);
        let (tensor, _) = letterbox(&img, 32).unwrap();
        for v in tensor.iter() {
            assert!(*v >= 0.0 && *v <= 1.0);
        }
    }

    #[test]
    fn test_letterbox_rejects_zero_dims() {
        let img = DynamicImage::new_rgb8(0, 10);
        assert!(matches!(
            letterbox(&img, 320),
            Err(DetectError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_letterbox_rejects_zero_target() {
        let img = DynamicImage::new_rgb8(10, 10);
        assert!(matches!(
            letterbox(&img, 0),
            Err(DetectError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_padding_pixels_are_black() {
        let mut rgb = image::RgbImage::new(100, 50);
        for p in rgb.pixels_mut() {
            *p = image::Rgb([255, 255, 255]);
        }
        let img = DynamicImage::ImageRgb8(rgb);
        let (tensor, params) = letterbox(&img, 100).unwrap();
        assert!(params.top > 0.0);
        // 顶部填充行保持 0
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
        assert_eq!(tensor[[0, 1, 0, 50]], 0.0);
    }
}
