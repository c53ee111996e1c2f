use std::{
    fs,
    path::{Path, PathBuf},
};

use safetensors::{Dtype, SafeTensors, serialize, tensor::TensorView};

use crate::error::{NetErr, Result};

/// Persists named tensors for one layer under `<dir>/<name>.safetensors`.
///
/// # Arguments
/// * `dir` - The checkpoint directory, created if missing.
/// * `name` - The layer name the file is keyed by.
/// * `tensors` - `(tensor name, data, shape)` triples.
pub fn save_layer(dir: &Path, name: &str, tensors: &[(&str, &[f32], &[usize])]) -> Result<()> {
    fs::create_dir_all(dir)?;

    let views = tensors
        .iter()
        .map(|&(tensor_name, data, shape)| {
            TensorView::new(Dtype::F32, shape.to_vec(), bytemuck::cast_slice(data))
                .map(|view| (tensor_name.to_string(), view))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let bytes = serialize(views, &None)?;
    fs::write(layer_path(dir, name), bytes)?;

    Ok(())
}

/// Loads the named tensors of one layer, validating dtype and shape.
///
/// # Arguments
/// * `dir` - The checkpoint directory.
/// * `name` - The layer name the file is keyed by.
/// * `specs` - `(tensor name, expected shape)` pairs.
///
/// # Returns
/// The tensor buffers, in the order of `specs`.
pub fn load_layer(dir: &Path, name: &str, specs: &[(&str, &[usize])]) -> Result<Vec<Vec<f32>>> {
    let buf = fs::read(layer_path(dir, name))?;
    let tensors = SafeTensors::deserialize(&buf)?;

    specs
        .iter()
        .map(|&(tensor_name, shape)| {
            let view = tensors.tensor(tensor_name)?;

            if view.dtype() != Dtype::F32 || view.shape() != shape {
                return Err(NetErr::TensorShapeMismatch {
                    name: format!("{name}.{tensor_name}"),
                    got: view.shape().to_vec(),
                    expected: shape.to_vec(),
                });
            }

            Ok(bytemuck::pod_collect_to_vec(view.data()))
        })
        .collect()
}

fn layer_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.safetensors"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("convnet-ckpt-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn round_trip_preserves_the_buffers() {
        let dir = scratch_dir("round-trip");
        let w = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let b = [0.5f32, -0.5];

        save_layer(&dir, "f1", &[("weight", &w, &[3, 2]), ("bias", &b, &[2])]).unwrap();
        let tensors = load_layer(&dir, "f1", &[("weight", &[3, 2]), ("bias", &[2])]).unwrap();

        assert_eq!(tensors[0], w);
        assert_eq!(tensors[1], b);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let dir = scratch_dir("bad-shape");
        let w = [0.0f32; 4];

        save_layer(&dir, "c1", &[("weight", &w, &[2, 2])]).unwrap();
        let err = load_layer(&dir, "c1", &[("weight", &[4])]);

        assert!(matches!(err, Err(NetErr::TensorShapeMismatch { .. })));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_tensor_is_rejected() {
        let dir = scratch_dir("missing");
        let w = [0.0f32; 2];

        save_layer(&dir, "c1", &[("weight", &w, &[2])]).unwrap();
        let err = load_layer(&dir, "c1", &[("bias", &[2])]);

        assert!(matches!(err, Err(NetErr::Checkpoint(_))));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_surfaces_as_io() {
        let dir = scratch_dir("no-file");

        let err = load_layer(&dir, "ghost", &[("weight", &[1])]);

        assert!(matches!(err, Err(NetErr::Io(_))));
    }
}
