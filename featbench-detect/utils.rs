/// Helpers shared by the segment-test and corner-response detectors

/// Check if there are at least `min_count` consecutive set bits in the
/// circular 16-bit mask
#[inline]
pub fn has_consecutive_bits(mask: u16, min_count: usize) -> bool {
    if min_count == 0 || min_count > 16 {
        return false;
    }
    if mask == u16::MAX {
        return true;
    }

    let mut run = mask;
    for i in 1..min_count as u32 {
        run &= mask.rotate_left(i);
        if run == 0 {
            return false;
        }
    }
    run != 0
}

/// Sort by response, strongest first
pub fn sort_by_response_desc<T>(items: &mut [T], response: impl Fn(&T) -> f32) {
    items.sort_by(|a, b| response(b).total_cmp(&response(a)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_consecutive_pixels(pixels: &[bool; 16], min_count: usize) -> bool {
        let mask = pixels
            .iter()
            .enumerate()
            .fold(0u16, |mask, (i, &p)| if p { mask | (1 << i) } else { mask });
        has_consecutive_bits(mask, min_count)
    }

    fn reference_run(pixels: &[bool; 16], min_count: usize) -> bool {
        let mut best = 0;
        let mut current = 0;
        for i in 0..32 {
            if pixels[i % 16] {
                current += 1;
                best = best.max(current);
            } else {
                current = 0;
            }
        }
        min_count > 0 && min_count <= 16 && best >= min_count
    }

    #[test]
    fn test_consecutive_pixels_simple() {
        let mut pixels = [false; 16];
        for p in pixels.iter_mut().take(9) {
            *p = true;
        }
        assert!(has_consecutive_pixels(&pixels, 9));
        assert!(!has_consecutive_pixels(&pixels, 10));
    }

    #[test]
    fn test_consecutive_pixels_wrap_around() {
        let mut pixels = [false; 16];
        for i in (12..16).chain(0..5) {
            pixels[i] = true;
        }
        assert!(has_consecutive_pixels(&pixels, 9));
    }

    #[test]
    fn test_alternating_pixels() {
        let mut pixels = [false; 16];
        for i in (0..16).step_by(2) {
            pixels[i] = true;
        }
        assert!(!has_consecutive_pixels(&pixels, 2));
        assert!(has_consecutive_pixels(&pixels, 1));
    }

    #[test]
    fn test_bitmask_agrees_with_linear_scan() {
        for seed in 0u32..2000 {
            let mask = (seed.wrapping_mul(2654435761) >> 8) as u16;
            let mut pixels = [false; 16];
            for (i, p) in pixels.iter_mut().enumerate() {
                *p = mask & (1 << i) != 0;
            }
            for min_count in [1, 3, 9, 12, 16] {
                assert_eq!(
                    has_consecutive_pixels(&pixels, min_count),
                    reference_run(&pixels, min_count),
                    "mask={:016b} min_count={}",
                    mask,
                    min_count
                );
            }
        }
    }

    #[test]
    fn test_sort_by_response_desc() {
        let mut values = vec![1.0f32, 5.0, 2.0, 3.0];
        sort_by_response_desc(&mut values, |v| *v);
        assert_eq!(values, vec![5.0, 3.0, 2.0, 1.0]);
    }
}
