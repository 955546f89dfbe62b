// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 车牌检测命令行工具
// 读取单张图片 → 检测 → 打印结果并保存标注图

use anyhow::{Context, Result};
use clap::Parser;
use image::{DynamicImage, Rgb};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use platedet_rs::{gen_time_string, Args, Detection, DetectorConfig, PlateDetector, PlateType};

fn main() -> Result<()> {
    let args = Args::parse();

    println!("🚗 车牌检测: {} (后端: {:?})", args.model, args.backend);

    let config = DetectorConfig::from(&args);
    let mut detector = PlateDetector::new(config).context("检测器构造失败")?;

    let img = image::open(&args.source).with_context(|| format!("无法读取图片: {}", args.source))?;
    println!("📷 图片尺寸: {}x{}", img.width(), img.height());

    let t = std::time::Instant::now();
    let detections = detector.detect(&img).context("检测失败")?;
    println!(
        "✅ 检测完成: {} 个车牌, 耗时 {:?}",
        detections.len(),
        t.elapsed()
    );

    for (i, det) in detections.iter().enumerate() {
        let b = det.bbox();
        let kind = match det.plate_type() {
            PlateType::SingleRow => "单层",
            PlateType::DoubleRow => "双层",
        };
        println!(
            "  [{}] {} score={:.3} box=({:.1}, {:.1}, {:.1}, {:.1})",
            i,
            kind,
            det.score(),
            b.x1(),
            b.y1(),
            b.x2(),
            b.y2()
        );
    }

    if !detections.is_empty() {
        let annotated = draw_detections(&img, &detections);
        let save_name = format!("platedet_{}.png", gen_time_string("-"));
        annotated
            .save(&save_name)
            .with_context(|| format!("保存失败: {}", save_name))?;
        println!("💾 标注图已保存: {}", save_name);
    }

    Ok(())
}

/// 绘制检测框与四个角点 (单层绿框, 双层黄框)
fn draw_detections(img: &DynamicImage, detections: &[Detection]) -> image::RgbImage {
    let mut canvas = img.to_rgb8();
    let (img_w, img_h) = (canvas.width() as f32, canvas.height() as f32);

    for det in detections {
        let b = det.bbox();
        let color = match det.plate_type() {
            PlateType::SingleRow => Rgb([0u8, 255, 0]),
            PlateType::DoubleRow => Rgb([255u8, 255, 0]),
        };

        let x1 = b.x1().clamp(0., img_w - 1.);
        let y1 = b.y1().clamp(0., img_h - 1.);
        let w = (b.x2().clamp(0., img_w) - x1).max(1.);
        let h = (b.y2().clamp(0., img_h) - y1).max(1.);
        let rect = Rect::at(x1 as i32, y1 as i32).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(&mut canvas, rect, color);

        for kpt in det.keypoints() {
            let kx = kpt.x().clamp(0., img_w - 1.) as i32;
            let ky = kpt.y().clamp(0., img_h - 1.) as i32;
            draw_filled_circle_mut(&mut canvas, (kx, ky), 3, Rgb([255u8, 0, 0]));
        }
    }

    canvas
}
