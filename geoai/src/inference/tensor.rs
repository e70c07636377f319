//! Dense `f32` tensors exchanged with inference sessions.

use super::InferenceError;

/// Row-major `f32` tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Creates a tensor, checking the data length against the shape.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, InferenceError> {
        let expected: usize = shape.iter().product();
        if shape.is_empty() || expected != data.len() {
            return Err(InferenceError::InvalidTensor(format!(
                "shape {:?} needs {} values, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Shape with leading unit dimensions removed, keeping at least `rank`
    /// dimensions.
    ///
    /// `[1, 1, 5, 6]` squeezed to rank 2 is `[5, 6]`.
    pub fn squeezed_shape(&self, rank: usize) -> &[usize] {
        let mut shape = self.shape.as_slice();
        while shape.len() > rank && shape[0] == 1 {
            shape = &shape[1..];
        }
        shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_rejected() {
        assert!(Tensor::new(vec![2, 3], vec![0.0; 5]).is_err());
        assert!(Tensor::new(vec![], vec![]).is_err());
    }

    #[test]
    fn test_squeeze_leading_units() {
        let t = Tensor::new(vec![1, 1, 2, 3], vec![0.0; 6]).unwrap();
        assert_eq!(t.squeezed_shape(2), &[2, 3]);
        assert_eq!(t.squeezed_shape(3), &[1, 2, 3]);
        let rows = Tensor::new(vec![1, 6], vec![0.0; 6]).unwrap();
        assert_eq!(rows.squeezed_shape(2), &[1, 6]);
    }
}
