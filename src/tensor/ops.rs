//! Element-wise primitives shared by tensors and optimizers.
//!
//! Callers are expected to have checked that both slices have the same length,
//! extra elements on either side are ignored.

/// Adds `src` into `dst` element-wise.
pub fn add(dst: &mut [f32], src: &[f32]) {
    dst.iter_mut().zip(src).for_each(|(d, s)| *d += s);
}

/// Computes `dst += alpha * src` element-wise.
pub fn scaled_add(dst: &mut [f32], alpha: f32, src: &[f32]) {
    dst.iter_mut().zip(src).for_each(|(d, s)| *d += alpha * s);
}

/// Compares two slices element-wise within an absolute tolerance.
pub fn all_close(a: &[f32], b: &[f32], tolerance: f32) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_accumulates() {
        let mut dst = [1., 2., 3.];
        add(&mut dst, &[1., 1., 1.]);
        assert_eq!(dst, [2., 3., 4.]);
    }

    #[test]
    fn scaled_add_with_negative_rate() {
        let mut dst = [1., 2.];
        scaled_add(&mut dst, -0.5, &[2., 4.]);
        assert_eq!(dst, [0., 0.]);
    }

    #[test]
    fn all_close_checks_length_and_tolerance() {
        assert!(all_close(&[0.9, 1.9], &[0.90001, 1.89999], 1e-4));
        assert!(!all_close(&[0.9, 1.9], &[0.9], 1e-4));
        assert!(!all_close(&[0.9], &[0.8], 1e-4));
    }
}
