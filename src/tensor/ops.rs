//! Dense tensor operations for weighted relations.
//!
//! Facts are rank 0-2 candle tensors of f64 on the CPU. Every operation
//! validates shapes before delegating to candle, so incompatible shapes
//! surface as [`TlError::ShapeMismatch`] rather than backend errors, and a
//! failed rule application can never silently yield a default tensor.

use crate::error::{Result, TlError};
use candle_core::{DType, Device, Tensor};

fn shape_mismatch(expected: impl Into<String>, got: impl Into<String>) -> TlError {
    TlError::ShapeMismatch {
        expected: expected.into(),
        got: got.into(),
    }
}

fn require_same_shape(a: &Tensor, b: &Tensor) -> Result<()> {
    if a.dims() != b.dims() {
        return Err(shape_mismatch(
            format!("{:?}", a.dims()),
            format!("{:?}", b.dims()),
        ));
    }
    Ok(())
}

/// Flatten a tensor to a row-major f64 vector.
fn flat(t: &Tensor) -> Result<Vec<f64>> {
    Ok(t.flatten_all()?.to_dtype(DType::F64)?.to_vec1::<f64>()?)
}

/// Create a rank-0 tensor.
pub fn scalar(value: f64) -> Result<Tensor> {
    Ok(Tensor::new(value, &Device::Cpu)?)
}

/// Create a rank-1 tensor.
pub fn vector(values: &[f64]) -> Result<Tensor> {
    Ok(Tensor::from_slice(values, values.len(), &Device::Cpu)?)
}

/// Create a rank-2 tensor from row-major values.
pub fn matrix(rows: usize, cols: usize, values: &[f64]) -> Result<Tensor> {
    if values.len() != rows * cols {
        return Err(shape_mismatch(
            format!("{}x{} ({} values)", rows, cols, rows * cols),
            format!("{} values", values.len()),
        ));
    }
    Ok(Tensor::from_slice(values, (rows, cols), &Device::Cpu)?)
}

/// Matrix product, rank-aware.
///
/// - matrix @ matrix -> matrix
/// - vector @ matrix -> vector (row vector convention)
/// - matrix @ vector -> vector
/// - vector @ vector -> scalar (dot product)
///
/// Inner dimensions must agree; rank 0 and rank >= 3 operands are rejected.
pub fn matmul(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    match (a.rank(), b.rank()) {
        (2, 2) => {
            if a.dims()[1] != b.dims()[0] {
                return Err(shape_mismatch(
                    format!("inner dim {}", a.dims()[1]),
                    format!("inner dim {}", b.dims()[0]),
                ));
            }
            Ok(a.matmul(b)?)
        }
        (1, 2) => {
            if a.dims()[0] != b.dims()[0] {
                return Err(shape_mismatch(
                    format!("vector of len {}", b.dims()[0]),
                    format!("vector of len {}", a.dims()[0]),
                ));
            }
            // [k] @ [k,n]: lift to a 1xk row, multiply, drop the row dim
            Ok(a.unsqueeze(0)?.matmul(b)?.squeeze(0)?)
        }
        (2, 1) => {
            if a.dims()[1] != b.dims()[0] {
                return Err(shape_mismatch(
                    format!("vector of len {}", a.dims()[1]),
                    format!("vector of len {}", b.dims()[0]),
                ));
            }
            Ok(a.matmul(&b.unsqueeze(1)?)?.squeeze(1)?)
        }
        (1, 1) => {
            require_same_shape(a, b)?;
            Ok((a * b)?.sum_all()?)
        }
        (ra, rb) => Err(shape_mismatch(
            "operands of rank 1 or 2",
            format!("ranks {} and {}", ra, rb),
        )),
    }
}

/// Elementwise minimum (fuzzy conjunction). Shapes must be identical.
pub fn minimum(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    require_same_shape(a, b)?;
    Ok(a.minimum(b)?)
}

/// Elementwise maximum (fuzzy disjunction). Shapes must be identical.
pub fn maximum(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    require_same_shape(a, b)?;
    Ok(a.maximum(b)?)
}

/// Elementwise absolute difference |a - b|. Shapes must be identical.
pub fn abs_diff(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    require_same_shape(a, b)?;
    Ok((a - b)?.abs()?)
}

/// Mean of all elements.
pub fn mean(t: &Tensor) -> Result<f64> {
    let v = flat(t)?;
    Ok(v.iter().sum::<f64>() / v.len() as f64)
}

/// Minimum element.
pub fn min(t: &Tensor) -> Result<f64> {
    Ok(flat(t)?.into_iter().fold(f64::INFINITY, f64::min))
}

/// Maximum element.
pub fn max(t: &Tensor) -> Result<f64> {
    Ok(flat(t)?.into_iter().fold(f64::NEG_INFINITY, f64::max))
}

/// Population standard deviation of all elements.
pub fn stddev(t: &Tensor) -> Result<f64> {
    let v = flat(t)?;
    let m = v.iter().sum::<f64>() / v.len() as f64;
    let var = v.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / v.len() as f64;
    Ok(var.sqrt())
}

/// First element in row-major order: element 0 of a scalar or vector,
/// element (0,0) of a matrix.
pub fn leading(t: &Tensor) -> Result<f64> {
    flat(t)?
        .first()
        .copied()
        .ok_or_else(|| shape_mismatch("non-empty tensor", format!("{:?}", t.dims())))
}

/// Render a tensor as a short human-readable string.
pub fn display(t: &Tensor) -> String {
    match flat(t) {
        Ok(v) if t.rank() == 0 => format!("{:.4}", v[0]),
        Ok(v) if v.len() <= 8 => {
            let parts: Vec<String> = v.iter().map(|x| format!("{:.4}", x)).collect();
            format!("{:?} [{}]", t.dims(), parts.join(", "))
        }
        Ok(v) => {
            let m = v.iter().sum::<f64>() / v.len() as f64;
            format!("{:?} ({} elements, mean={:.4})", t.dims(), v.len(), m)
        }
        Err(_) => format!("{:?} (unreadable)", t.dims()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conjunction_is_elementwise_min_and_commutative() {
        let a = vector(&[0.2, 0.9, 0.5]).unwrap();
        let b = vector(&[0.7, 0.1, 0.5]).unwrap();

        let ab = flat(&minimum(&a, &b).unwrap()).unwrap();
        let ba = flat(&minimum(&b, &a).unwrap()).unwrap();
        assert_eq!(ab, vec![0.2, 0.1, 0.5]);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_disjunction_is_elementwise_max_and_commutative() {
        let a = vector(&[0.2, 0.9, 0.5]).unwrap();
        let b = vector(&[0.7, 0.1, 0.5]).unwrap();

        let ab = flat(&maximum(&a, &b).unwrap()).unwrap();
        let ba = flat(&maximum(&b, &a).unwrap()).unwrap();
        assert_eq!(ab, vec![0.7, 0.9, 0.5]);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_vector_matrix_product() {
        let premise = vector(&[1.0]).unwrap();
        let implication = matrix(1, 1, &[0.98]).unwrap();

        let out = matmul(&premise, &implication).unwrap();
        assert_eq!(out.dims(), &[1]);
        assert!((leading(&out).unwrap() - 0.98).abs() < 1e-9);
    }

    #[test]
    fn test_dot_product_yields_scalar() {
        let a = vector(&[1.0, 2.0]).unwrap();
        let b = vector(&[3.0, 4.0]).unwrap();

        let out = matmul(&a, &b).unwrap();
        assert_eq!(out.rank(), 0);
        assert!((leading(&out).unwrap() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_matmul_shape_mismatch() {
        let a = matrix(2, 3, &[1.0; 6]).unwrap();
        let b = matrix(2, 2, &[1.0; 4]).unwrap();

        assert!(matches!(
            matmul(&a, &b),
            Err(TlError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_elementwise_shape_mismatch() {
        let a = vector(&[0.1, 0.2]).unwrap();
        let b = vector(&[0.1, 0.2, 0.3]).unwrap();

        assert!(matches!(
            minimum(&a, &b),
            Err(TlError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_reductions() {
        let t = matrix(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();

        assert!((mean(&t).unwrap() - 2.5).abs() < 1e-9);
        assert!((min(&t).unwrap() - 1.0).abs() < 1e-9);
        assert!((max(&t).unwrap() - 4.0).abs() < 1e-9);
        assert!((stddev(&t).unwrap() - 1.25f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_leading_element() {
        let s = scalar(0.7).unwrap();
        let m = matrix(2, 2, &[0.9, 0.1, 0.2, 0.3]).unwrap();

        assert!((leading(&s).unwrap() - 0.7).abs() < 1e-9);
        assert!((leading(&m).unwrap() - 0.9).abs() < 1e-9);
    }
}
