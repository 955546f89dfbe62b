// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 检测后处理: 置信度过滤 → 分数融合 → 框解码 → NMS → 坐标还原
//
// 模型输出行布局 (15 列):
//   [0..4)   cx, cy, w, h
//   [4]      objectness
//   [5..13)  4 个角点 (x, y) × 4
//   [13..15) 两类分数 (单层牌 / 双层牌)

use ndarray::{s, Array, Axis, IxDyn};

use crate::error::DetectError;
use crate::letterbox::LetterboxParams;
use crate::{non_max_suppression, Bbox, Detection, PlateType, Point2};

const CXYWH_OFFSET: usize = 4;
const OBJ_INDEX: usize = 4;
const KPT_OFFSET: usize = 5;
const KPT_COUNT: usize = 4;
const CLS_OFFSET: usize = 13;
const NUM_CLASSES: usize = 2;
const ROW_LEN: usize = CLS_OFFSET + NUM_CLASSES;

/// 后处理主函数
///
/// # 参数
/// - `raw`: 模型原始输出 [1, rows, 15]
/// - `conf_threshold`: objectness 硬阈值, 不高于该值的行直接丢弃
/// - `iou_threshold`: NMS 阈值
/// - `params`: 本次 detect 调用的 letterbox 参数, 用于还原到原图坐标
///
/// 返回按融合分数降序排列的检测结果
pub fn postprocess(
    raw: &Array<f32, IxDyn>,
    conf_threshold: f32,
    iou_threshold: f32,
    params: &LetterboxParams,
) -> Result<Vec<Detection>, DetectError> {
    let shape = raw.shape();
    if shape.len() != 3 || shape[0] != 1 || shape[2] != ROW_LEN {
        return Err(DetectError::inference(format!(
            "模型输出形状不符合预期: {:?}, 期望 [1, rows, {}]",
            shape, ROW_LEN
        )));
    }

    let preds = raw.slice(s![0usize, .., ..]);
    let mut candidates: Vec<Detection> = Vec::new();
    for row in preds.axis_iter(Axis(0)) {
        let objectness = row[OBJ_INDEX];
        if objectness <= conf_threshold {
            continue;
        }

        // 类别分数与 objectness 融合后取最大值作为排序分数
        let clss = row.slice(s![CLS_OFFSET..CLS_OFFSET + NUM_CLASSES]);
        let (class_id, score) = clss
            .iter()
            .map(|&c| c * objectness)
            .enumerate()
            .reduce(|max, x| if x.1 > max.1 { x } else { max })
            .unwrap();

        let bbox = Bbox::from_cxcywh(row[0], row[1], row[2], row[3]);

        let mut keypoints = [Point2::default(); KPT_COUNT];
        for (i, kpt) in keypoints.iter_mut().enumerate() {
            *kpt = Point2::new(row[KPT_OFFSET + 2 * i], row[KPT_OFFSET + 2 * i + 1]);
        }

        candidates.push(Detection::new(
            bbox,
            score,
            keypoints,
            PlateType::from_index(class_id),
        ));
    }

    non_max_suppression(&mut candidates, iou_threshold);

    for det in candidates.iter_mut() {
        det.restore(params.r, params.left, params.top);
    }

    Ok(candidates)
}
