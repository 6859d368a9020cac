#![allow(dead_code)]

use data_augmentation::{
    dataset::InMemoryDataset,
    sample::Sample,
    transforms::{
        vision::{Compose, HorizontalFlip, Targets, TargetsToSample},
        Transform,
    },
};

use anyhow::Result;
use image::{Rgb, RgbImage};
use std::fmt::Write as _;
use std::path::Path;

/// 4x4 images with the index in the red channel of pixel (0,0), so both the
/// sample identity and a horizontal flip can be read back from the tensor.
pub fn marker_images(n: usize) -> Vec<RgbImage> {
    (0..n)
        .map(|i| {
            let mut img = RgbImage::new(4, 4);
            img.put_pixel(0, 0, Rgb([i as u8 + 1, 0, 0]));
            img
        })
        .collect()
}

/// Marker images behind a coin-flip horizontal flip.
pub fn flipped_marker_dataset(n: usize) -> Result<InMemoryDataset<RgbImage>> {
    let pipeline = Compose::new().with_step(HorizontalFlip::new(0.5)?);
    Ok(InMemoryDataset::new(marker_images(n)).with_transform(
        (|image: RgbImage| -> Result<Targets> { Ok(Targets::new(image)) })
            .then(pipeline)
            .then(TargetsToSample::new()),
    ))
}

/// Reads `(marker, flipped)` from a `[3, 4, 4]` uint8 image tensor.
pub fn read_marker(image: &tch::Tensor) -> (i64, bool) {
    let left = image.int64_value(&[0, 0, 0]);
    let right = image.int64_value(&[0, 0, 3]);
    if left > 0 {
        (left - 1, false)
    } else {
        (right - 1, true)
    }
}

/// Integers `0..n` as single-feature samples under `"x"`.
pub fn number_dataset(n: i64) -> InMemoryDataset<i64> {
    InMemoryDataset::new((0..n).collect::<Vec<i64>>()).with_transform(
        |v: i64| -> Result<Sample> {
            Ok(Sample::from_single("x", tch::Tensor::from_slice(&[v])))
        },
    )
}

/// A wine-style table: header, then `rows` rows of `label,f1..f{features}`
/// where the label cycles through 1..=3 and feature j of row i is `i + j/10`.
pub fn wine_csv(rows: usize, features: usize) -> String {
    let mut out = String::from("Wine");
    for j in 0..features {
        let _ = write!(out, ",f{}", j);
    }
    out.push('\n');
    for i in 0..rows {
        let _ = write!(out, "{}", i % 3 + 1);
        for j in 0..features {
            let _ = write!(out, ",{}", i as f32 + j as f32 / 10.0);
        }
        out.push('\n');
    }
    out
}

/// Writes `n` stitched pairs: the left half carries a red marker at its
/// top-left pixel, the right half a blue marker at its top-left pixel.
/// Names sort in index order.
pub fn write_stitched_pairs(dir: &Path, n: usize, half_width: u32, height: u32) -> Result<()> {
    for i in 0..n {
        let mut img = RgbImage::from_pixel(half_width * 2, height, Rgb([0, 0, 0]));
        img.put_pixel(0, 0, Rgb([200, 0, 0]));
        img.put_pixel(half_width, 0, Rgb([0, 0, 200]));
        img.save(dir.join(format!("{:03}.png", i)))?;
    }
    Ok(())
}
