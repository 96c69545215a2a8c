use crate::shared::constants::UNKNOWN_PERSON;

/// A known person: display name plus the embedding of their reference image.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceFace {
    pub name: String,
    pub embedding: Vec<f32>,
}

/// Read-only set of reference faces, built once before any session starts
/// and shared by every session afterwards.
#[derive(Clone, Debug, Default)]
pub struct ReferenceStore {
    faces: Vec<ReferenceFace>,
}

impl ReferenceStore {
    pub fn new(faces: Vec<ReferenceFace>) -> Self {
        Self { faces }
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn faces(&self) -> &[ReferenceFace] {
        &self.faces
    }

    /// Closest reference whose distance to `query` is within `tolerance`.
    ///
    /// Ties keep the earliest-loaded reference.
    pub fn best_match(&self, query: &[f32], tolerance: f64) -> Option<&ReferenceFace> {
        let mut best: Option<(&ReferenceFace, f64)> = None;
        for face in &self.faces {
            let distance = embedding_distance(&face.embedding, query);
            if distance > tolerance {
                continue;
            }
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((face, distance));
            }
        }
        best.map(|(face, _)| face)
    }

    /// Name of the best match, or `"Unknown"`.
    pub fn resolve_name(&self, query: &[f32], tolerance: f64) -> String {
        self.best_match(query, tolerance)
            .map(|face| face.name.clone())
            .unwrap_or_else(|| UNKNOWN_PERSON.to_string())
    }
}

/// Euclidean distance between two embeddings. Extra trailing components
/// of the longer vector are ignored.
pub fn embedding_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = (*x as f64) - (*y as f64);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}
