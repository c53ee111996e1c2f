use std::{fs, path::Path};

use ndarray::Array2;

use super::Dataset;
use crate::error::{NetErr, Result};

/// MNIST geometry.
pub const IMAGE_SIDE: usize = 28;
pub const NUM_PIXELS: usize = IMAGE_SIDE * IMAGE_SIDE;
pub const NUM_CLASSES: usize = 10;

/// IDX magic numbers (big-endian): 3D byte tensor for images, 1D for labels.
const IMAGE_MAGIC: u32 = 2051;
const LABEL_MAGIC: u32 = 2049;

/// Default file names of the four dataset shards.
pub const TRAIN_IMAGES: &str = "train-images-10";
pub const TRAIN_LABELS: &str = "train-labels-10";
pub const TEST_IMAGES: &str = "test-images-10";
pub const TEST_LABELS: &str = "test-labels-10";

/// The train and test splits, normalized and one-hot encoded.
pub struct MnistData {
    pub train: Dataset,
    pub test: Dataset,
}

/// Reads the four IDX files under `dir` into normalized matrices.
pub fn load_data(dir: &Path) -> Result<MnistData> {
    Ok(MnistData {
        train: load_split(dir, TRAIN_IMAGES, TRAIN_LABELS)?,
        test: load_split(dir, TEST_IMAGES, TEST_LABELS)?,
    })
}

fn load_split(dir: &Path, images: &str, labels: &str) -> Result<Dataset> {
    let image_path = dir.join(images);
    let label_path = dir.join(labels);

    let x = parse_images(&fs::read(&image_path)?, &image_path)?;
    let y = parse_labels(&fs::read(&label_path)?, &label_path)?;

    if x.nrows() != y.nrows() {
        return Err(NetErr::SampleCountMismatch {
            images: x.nrows(),
            labels: y.nrows(),
        });
    }

    Ok(Dataset::new(x, y))
}

/// Parses an IDX image file: a big-endian `magic, count, rows, cols` header
/// followed by one byte per pixel, row-major. Pixels are normalized to
/// `[0, 1]`.
///
/// # Arguments
/// * `bytes` - The raw file contents.
/// * `path` - The file's path, for error reporting.
pub fn parse_images(bytes: &[u8], path: &Path) -> Result<Array2<f32>> {
    if bytes.len() < 16 {
        return Err(truncated(path, bytes.len(), 16));
    }

    let magic = be_u32(bytes, 0);
    if magic != IMAGE_MAGIC {
        return Err(bad_magic(path, magic, IMAGE_MAGIC));
    }

    let count = be_u32(bytes, 4) as usize;
    let pixels = be_u32(bytes, 8) as usize * be_u32(bytes, 12) as usize;

    let expected = 16 + count * pixels;
    if bytes.len() < expected {
        return Err(truncated(path, bytes.len(), expected));
    }

    let data = bytes[16..expected]
        .iter()
        .map(|&p| p as f32 / 255.0)
        .collect();

    // The byte count was validated above.
    Ok(Array2::from_shape_vec((count, pixels), data).unwrap())
}

/// Parses an IDX label file into one-hot rows with [`NUM_CLASSES`] columns.
pub fn parse_labels(bytes: &[u8], path: &Path) -> Result<Array2<f32>> {
    if bytes.len() < 8 {
        return Err(truncated(path, bytes.len(), 8));
    }

    let magic = be_u32(bytes, 0);
    if magic != LABEL_MAGIC {
        return Err(bad_magic(path, magic, LABEL_MAGIC));
    }

    let count = be_u32(bytes, 4) as usize;
    let expected = 8 + count;
    if bytes.len() < expected {
        return Err(truncated(path, bytes.len(), expected));
    }

    let mut y = Array2::zeros((count, NUM_CLASSES));
    for (index, &label) in bytes[8..expected].iter().enumerate() {
        if label as usize >= NUM_CLASSES {
            return Err(NetErr::BadLabel {
                path: path.to_path_buf(),
                index,
                label,
            });
        }

        y[[index, label as usize]] = 1.0;
    }

    Ok(y)
}

fn be_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn truncated(path: &Path, got: usize, expected: usize) -> NetErr {
    NetErr::Truncated {
        path: path.to_path_buf(),
        got,
        expected,
    }
}

fn bad_magic(path: &Path, got: u32, expected: u32) -> NetErr {
    NetErr::BadMagic {
        path: path.to_path_buf(),
        got,
        expected,
    }
}
