/// Application directory name under the platform config and cache dirs.
pub const APP_DIR_NAME: &str = "GateWatch";

pub const SERVICE_NAME: &str = "GateWatch Backend";

/// COCO object detector. Exported locally (e.g. `yolo export format=onnx`),
/// never downloaded.
pub const OBJECT_MODEL_NAME: &str = "yolo11n.onnx";

pub const FACE_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const FACE_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Extensions accepted as reference face images (compared lowercase).
pub const REFERENCE_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Name reported for a face with no reference within tolerance.
pub const UNKNOWN_PERSON: &str = "Unknown";

/// Placeholder face confidences; not derived from the match distance.
pub const MATCHED_FACE_CONFIDENCE: f64 = 0.95;
pub const UNMATCHED_FACE_CONFIDENCE: f64 = 0.7;

/// Class names of the 80-class COCO detection head, in model output order.
pub const COCO_CLASS_NAMES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];
