pub mod bucket;
pub mod detection_record;
pub mod object_detector;
