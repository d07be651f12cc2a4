use image::RgbImage;

/// Side length of the reduced grayscale raster fed to the DCT.
const DCT_SIZE: usize = 32;

/// Side length of the low-frequency block kept from the DCT output.
const HASH_DIM: usize = 8;

/// Two fingerprints at or above this similarity are visually the same.
pub const VISUAL_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Compute the 64-bit perceptual hash of an encoded image.
///
/// The pipeline is fixed so fingerprints are comparable across hosts:
/// decode, nearest-neighbor resample to 32×32, grayscale, 2-D DCT, keep the
/// top-left 8×8 coefficients, threshold each against their median.
pub fn compute_phash(data: &[u8]) -> Result<u64, image::ImageError> {
    let decoded = image::load_from_memory(data)?;
    let rgb = decoded.to_rgb8();

    let gray = resized_grayscale(&rgb);
    let dct = dct_2d(&gray);

    // top-left 8x8 block, row-major
    let mut low_freq = [0f64; HASH_DIM * HASH_DIM];
    for row in 0..HASH_DIM {
        for col in 0..HASH_DIM {
            low_freq[row * HASH_DIM + col] = dct[row][col];
        }
    }

    let median = median_of(&low_freq);

    let mut hash: u64 = 0;
    for (i, value) in low_freq.iter().enumerate() {
        if *value > median {
            hash |= 1 << i;
        }
    }
    Ok(hash)
}

/// Resample to 32×32 with nearest-neighbor lookup and convert to luminance.
///
/// Source coordinates are floored (`src_x = x·src_w/32`), which keeps the
/// result deterministic for a given source resolution.
fn resized_grayscale(rgb: &RgbImage) -> [[f64; DCT_SIZE]; DCT_SIZE] {
    let (src_w, src_h) = rgb.dimensions();
    let mut gray = [[0f64; DCT_SIZE]; DCT_SIZE];

    for y in 0..DCT_SIZE {
        for x in 0..DCT_SIZE {
            let src_x = (x as u32 * src_w) / DCT_SIZE as u32;
            let src_y = (y as u32 * src_h) / DCT_SIZE as u32;
            let pixel = rgb.get_pixel(src_x, src_y);
            let [r, g, b] = pixel.0;
            gray[y][x] = f64::from(r) * 0.299 + f64::from(g) * 0.587 + f64::from(b) * 0.114;
        }
    }
    gray
}

/// Type-II 2-D DCT with orthonormalization factors (1/√2 at index 0) and a
/// global 1/4 scale.
fn dct_2d(matrix: &[[f64; DCT_SIZE]; DCT_SIZE]) -> [[f64; DCT_SIZE]; DCT_SIZE] {
    let n = DCT_SIZE as f64;
    let mut result = [[0f64; DCT_SIZE]; DCT_SIZE];

    for u in 0..DCT_SIZE {
        for v in 0..DCT_SIZE {
            let mut sum = 0.0;
            for x in 0..DCT_SIZE {
                for y in 0..DCT_SIZE {
                    sum += matrix[x][y]
                        * ((2.0 * x as f64 + 1.0) * u as f64 * std::f64::consts::PI / (2.0 * n))
                            .cos()
                        * ((2.0 * y as f64 + 1.0) * v as f64 * std::f64::consts::PI / (2.0 * n))
                            .cos();
                }
            }

            let cu = if u == 0 { std::f64::consts::FRAC_1_SQRT_2 } else { 1.0 };
            let cv = if v == 0 { std::f64::consts::FRAC_1_SQRT_2 } else { 1.0 };
            result[u][v] = 0.25 * cu * cv * sum;
        }
    }
    result
}

/// Median of the coefficient block; even-length input averages the two
/// middle values.
fn median_of(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Number of differing bits between two fingerprints.
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// Fingerprint similarity in `[0, 1]`: `1 − distance/64`.
pub fn hash_similarity(a: u64, b: u64) -> f64 {
    1.0 - f64::from(hamming_distance(a, b)) / 64.0
}

/// Similarity of two frame-fingerprint sequences.
///
/// Frames are compared index-aligned over the shorter sequence; the match
/// count is normalized by the longer length, so differing durations lower
/// the score.
pub fn frame_sequence_similarity(a: &[u64], b: &[u64]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let overlap = a.len().min(b.len());
    let matching = (0..overlap)
        .filter(|&i| hash_similarity(a[i], b[i]) >= VISUAL_SIMILARITY_THRESHOLD)
        .count();

    matching as f64 / a.len().max(b.len()) as f64
}
