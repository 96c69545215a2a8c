/// A candidate box from a YOLO head, in frame pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub score: f64,
    pub class_id: usize,
}

impl ScoredBox {
    fn corners(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// Greedy per-class NMS: sort by score descending, suppress overlapping
/// boxes of the same class.
///
/// Overlapping boxes of different classes both survive. The survivors come
/// back in descending score order.
pub fn nms(dets: &mut [ScoredBox], iou_thresh: f64) -> Vec<ScoredBox> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if suppressed[j] || dets[j].class_id != dets[i].class_id {
                continue;
            }
            if bbox_iou(&dets[i].corners(), &dets[j].corners()) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

pub fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scored(x1: f64, y1: f64, x2: f64, y2: f64, score: f64) -> ScoredBox {
        ScoredBox {
            x1,
            y1,
            x2,
            y2,
            score,
            class_id: 0,
        }
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let mut dets = vec![
            scored(0.0, 0.0, 100.0, 100.0, 0.9),
            scored(5.0, 5.0, 105.0, 105.0, 0.8),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_nms_keeps_non_overlapping_in_score_order() {
        let mut dets = vec![
            scored(200.0, 200.0, 250.0, 250.0, 0.6),
            scored(0.0, 0.0, 50.0, 50.0, 0.9),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 2);
        assert_relative_eq!(kept[0].score, 0.9);
        assert_relative_eq!(kept[1].score, 0.6);
    }

    #[test]
    fn test_nms_keeps_overlapping_boxes_of_different_classes() {
        // A rider (person) on a motorcycle, overlapping well past 0.45 IoU.
        let rider = scored(100.0, 50.0, 220.0, 300.0, 0.91);
        let mut motorcycle = scored(90.0, 120.0, 230.0, 320.0, 0.84);
        motorcycle.class_id = 3;
        assert!(bbox_iou(&rider.corners(), &motorcycle.corners()) > 0.45);

        let kept = nms(&mut [motorcycle, rider], 0.45);
        let classes: Vec<_> = kept.iter().map(|d| d.class_id).collect();
        assert_eq!(classes, vec![0, 3]);
    }

    #[test]
    fn test_nms_suppresses_within_each_class() {
        let mut car_a = scored(0.0, 0.0, 100.0, 100.0, 0.9);
        car_a.class_id = 2;
        let mut car_b = scored(1.0, 1.0, 101.0, 101.0, 0.7);
        car_b.class_id = 2;
        let person = scored(2.0, 2.0, 102.0, 102.0, 0.8);

        let kept = nms(&mut [car_a, car_b, person], 0.45);
        let classes: Vec<_> = kept.iter().map(|d| (d.class_id, d.score)).collect();
        assert_eq!(classes, vec![(2, 0.9), (0, 0.8)]);
    }

    #[test]
    fn test_nms_empty_input() {
        let kept = nms(&mut [], 0.3);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_bbox_iou_no_overlap() {
        assert_eq!(
            bbox_iou(&[0.0, 0.0, 10.0, 10.0], &[20.0, 20.0, 30.0, 30.0]),
            0.0
        );
    }

    #[test]
    fn test_bbox_iou_half_overlap() {
        // Intersection 50, union 150.
        let iou = bbox_iou(&[0.0, 0.0, 10.0, 10.0], &[5.0, 0.0, 15.0, 10.0]);
        assert_relative_eq!(iou, 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bbox_iou_perfect() {
        let b = [0.0, 0.0, 10.0, 10.0];
        assert_relative_eq!(bbox_iou(&b, &b), 1.0);
    }
}
