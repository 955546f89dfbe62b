// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod backend; // 推理后端 (嵌入式/OpenCV-DNN/ONNXRuntime)
pub mod config; // 检测器配置参数
pub mod error; // 错误类型
pub mod letterbox; // Letterbox 预处理
pub mod pipeline; // 检测流水线编排
pub mod postprocess; // 解码 + NMS + 坐标还原

pub use crate::backend::{build_backend, BackendKind, InferenceBackend};
pub use crate::config::{Args, DetectorConfig};
pub use crate::error::DetectError;
pub use crate::letterbox::{letterbox, LetterboxParams};
pub use crate::pipeline::PlateDetector;
pub use crate::postprocess::postprocess;

/// 贪心 NMS: 按融合分数降序遍历, 剔除与已保留框 IoU 超阈值的候选
///
/// `sort_by` 是稳定排序, 分数相同的候选保持出现顺序
pub fn non_max_suppression(xs: &mut Vec<Detection>, iou_threshold: f32) {
    xs.sort_by(|d1, d2| d2.score().partial_cmp(&d1.score()).unwrap());

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            let iou = xs[prev_index].bbox().iou(xs[index].bbox());
            if iou > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}

pub fn gen_time_string(delimiter: &str) -> String {
    let offset = chrono::FixedOffset::east_opt(8 * 60 * 60).unwrap(); // Beijing
    let t_now = chrono::Utc::now().with_timezone(&offset);
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S{}%f",
        delimiter, delimiter, delimiter, delimiter, delimiter, delimiter
    );
    t_now.format(&fmt).to_string()
}

/// 车牌类型 (模型第 13/14 列对应的两个类别)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateType {
    /// 单层牌
    SingleRow,
    /// 双层牌 (如黄牌货车后牌)
    DoubleRow,
}

impl PlateType {
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => PlateType::SingleRow,
            _ => PlateType::DoubleRow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    x: f32,
    y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    /// 反向 letterbox 仿射: 去 padding 后除以缩放比
    pub fn restore(&mut self, r: f32, left: f32, top: f32) {
        self.x = (self.x - left) / r;
        self.y = (self.y - top) / r;
    }
}

/// 角点坐标形式的检测框
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bbox {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl Bbox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// 由中心点+宽高解码, 两个角点都从原始 cx/cy 计算
    pub fn from_cxcywh(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x1: cx - w / 2.,
            y1: cy - h / 2.,
            x2: cx + w / 2.,
            y2: cy + h / 2.,
        }
    }

    pub fn x1(&self) -> f32 {
        self.x1
    }

    pub fn y1(&self) -> f32 {
        self.y1
    }

    pub fn x2(&self) -> f32 {
        self.x2
    }

    pub fn y2(&self) -> f32 {
        self.y2
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn intersection_area(&self, another: &Bbox) -> f32 {
        let l = self.x1.max(another.x1);
        let r = self.x2.min(another.x2);
        let t = self.y1.max(another.y1);
        let b = self.y2.min(another.y2);
        (r - l).max(0.) * (b - t).max(0.)
    }

    /// IoU, 并集面积非正时返回 0 (退化框不参与抑制)
    pub fn iou(&self, another: &Bbox) -> f32 {
        let inter = self.intersection_area(another);
        let union = self.area() + another.area() - inter;
        if union <= 0. {
            return 0.;
        }
        inter / union
    }

    pub fn restore(&mut self, r: f32, left: f32, top: f32) {
        self.x1 = (self.x1 - left) / r;
        self.y1 = (self.y1 - top) / r;
        self.x2 = (self.x2 - left) / r;
        self.y2 = (self.y2 - top) / r;
    }
}

/// 单个车牌检测结果, 坐标位于原图像素空间
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    bbox: Bbox,
    score: f32,
    keypoints: [Point2; 4],
    plate_type: PlateType,
}

impl Detection {
    pub fn new(bbox: Bbox, score: f32, keypoints: [Point2; 4], plate_type: PlateType) -> Self {
        Self {
            bbox,
            score,
            keypoints,
            plate_type,
        }
    }

    pub fn bbox(&self) -> &Bbox {
        &self.bbox
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn keypoints(&self) -> &[Point2; 4] {
        &self.keypoints
    }

    pub fn plate_type(&self) -> PlateType {
        self.plate_type
    }

    /// 对框和全部四个角点应用同一仿射逆变换
    pub fn restore(&mut self, r: f32, left: f32, top: f32) {
        self.bbox.restore(r, left, top);
        for kpt in self.keypoints.iter_mut() {
            kpt.restore(r, left, top);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Detection {
        Detection::new(
            Bbox::new(x1, y1, x2, y2),
            score,
            [Point2::default(); 4],
            PlateType::SingleRow,
        )
    }

    #[test]
    fn test_iou_identical() {
        let a = Bbox::new(0., 0., 10., 10.);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = Bbox::new(0., 0., 10., 10.);
        let b = Bbox::new(20., 20., 30., 30.);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_zero_area() {
        // 退化框: 并集非正时 IoU 定义为 0
        let a = Bbox::new(5., 5., 5., 5.);
        let b = Bbox::new(5., 5., 5., 5.);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_nms_suppresses_overlap() {
        let mut xs = vec![det(0., 0., 10., 10., 0.6), det(1., 1., 11., 11., 0.9)];
        non_max_suppression(&mut xs, 0.5);
        assert_eq!(xs.len(), 1);
        assert!((xs[0].score() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_nms_keeps_disjoint() {
        let mut xs = vec![det(0., 0., 10., 10., 0.9), det(100., 100., 110., 110., 0.6)];
        non_max_suppression(&mut xs, 0.5);
        assert_eq!(xs.len(), 2);
        // 按分数降序返回
        assert!(xs[0].score() >= xs[1].score());
    }

    #[test]
    fn test_nms_stable_on_equal_scores() {
        let first = det(0., 0., 10., 10., 0.5);
        let second = det(100., 0., 110., 10., 0.5);
        let mut xs = vec![first.clone(), second.clone()];
        non_max_suppression(&mut xs, 0.5);
        assert_eq!(xs[0], first);
        assert_eq!(xs[1], second);
    }

    #[test]
    fn test_restore_box_and_keypoints_together() {
        let mut d = Detection::new(
            Bbox::new(100., 140., 200., 240.),
            0.8,
            [
                Point2::new(100., 140.),
                Point2::new(200., 140.),
                Point2::new(200., 240.),
                Point2::new(100., 240.),
            ],
            PlateType::SingleRow,
        );
        d.restore(0.5, 0., 140.);
        assert!((d.bbox().x1() - 200.).abs() < 1e-4);
        assert!((d.bbox().y1() - 0.).abs() < 1e-4);
        assert!((d.keypoints()[2].x() - 400.).abs() < 1e-4);
        assert!((d.keypoints()[2].y() - 200.).abs() < 1e-4);
    }
}
