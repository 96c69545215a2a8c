use std::fs;
use std::path::{Path, PathBuf};

use crate::recognition::domain::face_encoder::FaceEncoder;
use crate::recognition::domain::reference_store::{ReferenceFace, ReferenceStore};
use crate::shared::constants::REFERENCE_IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::shared::SendError;

/// Build the reference store from the images in `dir`.
///
/// Without an encoder (face capability unavailable) the store stays empty.
/// A missing directory is created and yields an empty store. Files that
/// cannot be decoded or contain no face are logged and skipped.
pub fn load_reference_faces(
    dir: &Path,
    encoder: Option<&mut dyn FaceEncoder>,
) -> std::io::Result<ReferenceStore> {
    let Some(encoder) = encoder else {
        log::info!("Face recognition unavailable; reference faces not loaded");
        return Ok(ReferenceStore::default());
    };

    if !dir.exists() {
        fs::create_dir_all(dir)?;
        log::info!(
            "Created {} - add reference images named like First_Last.jpg",
            dir.display()
        );
        return Ok(ReferenceStore::default());
    }

    let mut faces = Vec::new();
    for path in reference_images(dir)? {
        let Some(name) = display_name(&path) else {
            continue;
        };
        match first_embedding(&path, encoder) {
            Ok(Some(embedding)) => {
                log::info!("Loaded face: {name}");
                faces.push(ReferenceFace { name, embedding });
            }
            Ok(None) => log::warn!("No face found in {}, skipping", path.display()),
            Err(e) => log::warn!("Failed to load {}: {e}", path.display()),
        }
    }

    log::info!("Loaded {} known faces", faces.len());
    Ok(ReferenceStore::new(faces))
}

/// Image files directly inside `dir`, sorted by path.
fn reference_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_reference_extension(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn has_reference_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| REFERENCE_IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// File stem with underscores turned into spaces ("Jane_Doe.jpg" -> "Jane Doe").
fn display_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.replace('_', " "))
}

fn first_embedding(
    path: &Path,
    encoder: &mut dyn FaceEncoder,
) -> Result<Option<Vec<f32>>, SendError> {
    let img = image::open(path)?.to_rgb8();
    let (width, height) = img.dimensions();
    let frame = Frame::new(img.into_raw(), width, height, 3, 0);
    Ok(encoder
        .encode(&frame)?
        .into_iter()
        .next()
        .map(|face| face.embedding))
}
