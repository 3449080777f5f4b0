//! Readers for the IDX file format the MNIST family of datasets is distributed in.
//!
//! An IDX file starts with two zero bytes, a type code, the amount of dimensions and then each
//! dimension as a big endian `u32`, followed by the data in row major order. Only unsigned byte
//! data (type code `0x08`) is supported.

use std::{fs, path::Path};

use ndarray::{Array1, Array2};

use crate::{MlErr, Result};

const UBYTE: u8 = 0x08;

/// Loads an IDX images file, flattening every image into a row.
///
/// # Arguments
/// * `path` - The path to the file.
/// * `normalize` - Whether to scale the pixels from `[0, 255]` into `[0, 1]`.
pub fn load_idx_images<P: AsRef<Path>>(path: P, normalize: bool) -> Result<Array2<f32>> {
    let bytes = fs::read(path)?;
    let (dims, data) = parse(&bytes)?;

    let Some((&n, rest)) = dims.split_first() else {
        return Err(MlErr::InvalidDataset(
            "an images file needs at least one dimension".into(),
        ));
    };

    let x_size = rest.iter().product();
    let scale = if normalize { 1.0 / 255.0 } else { 1.0 };
    let pixels = data.iter().map(|&p| p as f32 * scale).collect();

    Ok(Array2::from_shape_vec((n, x_size), pixels)?)
}

/// Loads an IDX labels file.
pub fn load_idx_labels<P: AsRef<Path>>(path: P) -> Result<Array1<u32>> {
    let bytes = fs::read(path)?;
    let (dims, data) = parse(&bytes)?;

    if dims.len() != 1 {
        return Err(MlErr::InvalidDataset(format!(
            "a labels file has exactly one dimension, got {}",
            dims.len()
        )));
    }

    Ok(data.iter().map(|&l| l as u32).collect())
}

/// Splits an IDX file into it's dimensions and data.
fn parse(bytes: &[u8]) -> Result<(Vec<usize>, &[u8])> {
    let Some((&[0, 0, kind, ndims], rest)) = bytes.split_first_chunk::<4>() else {
        return Err(MlErr::InvalidDataset("bad idx magic number".into()));
    };

    if kind != UBYTE {
        return Err(MlErr::InvalidDataset(format!(
            "unsupported idx data type {kind:#04x}"
        )));
    }

    let header = ndims as usize * 4;
    if rest.len() < header {
        return Err(MlErr::InvalidDataset("truncated idx header".into()));
    }

    let (raw_dims, data) = rest.split_at(header);
    let dims: Vec<usize> = raw_dims
        .chunks_exact(4)
        .map(|d| u32::from_be_bytes([d[0], d[1], d[2], d[3]]) as usize)
        .collect();

    let expected = dims.iter().product();
    if data.len() != expected {
        return Err(MlErr::SizeMismatch {
            what: "idx data",
            got: data.len(),
            expected,
        });
    }

    Ok((dims, data))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn idx_file(dims: &[u32], data: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0, 0, UBYTE, dims.len() as u8]).unwrap();
        for d in dims {
            file.write_all(&d.to_be_bytes()).unwrap();
        }
        file.write_all(data).unwrap();
        file
    }

    #[test]
    fn images_are_flattened_and_normalized() {
        let file = idx_file(&[2, 2, 2], &[0, 255, 51, 102, 255, 255, 0, 0]);

        let x = load_idx_images(file.path(), true).unwrap();
        assert_eq!(x.dim(), (2, 4));
        assert_eq!(x[[0, 1]], 1.0);
        assert!((x[[0, 2]] - 0.2).abs() < 1e-6);

        let raw = load_idx_images(file.path(), false).unwrap();
        assert_eq!(raw[[1, 0]], 255.0);
    }

    #[test]
    fn labels_load_as_u32() {
        let file = idx_file(&[3], &[7, 0, 9]);
        assert_eq!(load_idx_labels(file.path()).unwrap().to_vec(), vec![7, 0, 9]);
    }

    #[test]
    fn truncated_data_is_rejected() {
        let file = idx_file(&[4], &[1, 2]);
        assert!(matches!(
            load_idx_labels(file.path()),
            Err(MlErr::SizeMismatch { got: 2, expected: 4, .. })
        ));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3, 4, 5]).unwrap();
        assert!(matches!(
            load_idx_labels(file.path()),
            Err(MlErr::InvalidDataset(_))
        ));
    }
}
