//! Python bindings for bilinear-pool-core via PyO3.

use pyo3::exceptions::{PyTypeError, PyValueError};
use pyo3::prelude::*;

use bilinear_pool_core::{
    BilinearPool, BufferRole, ComputeContext, DType, DynTensor, DynTensorMut, PoolError, Shape,
    TensorView, TensorViewMut,
};

fn to_py_err(e: PoolError) -> PyErr {
    match e {
        PoolError::Type(_) => PyTypeError::new_err(e.to_string()),
        PoolError::Shape(_) => PyValueError::new_err(e.to_string()),
    }
}

fn parse_shape(dims: &[usize]) -> PyResult<Shape> {
    Shape::from_dims(dims).map_err(to_py_err)
}

fn element_count(shape: &Shape, buffer: BufferRole) -> PyResult<usize> {
    shape.total(buffer).map_err(to_py_err)
}

fn parse_dtype(name: &str) -> PyResult<DType> {
    DType::from_name(name).map_err(|e| to_py_err(e.into()))
}

/// Host-side storage for one buffer of a call, in the requested dtype.
enum Buffer {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Buffer {
    fn from_values(values: &[f64], dtype: DType) -> Self {
        match dtype {
            DType::Float32 => Buffer::F32(values.iter().map(|&v| v as f32).collect()),
            DType::Float64 => Buffer::F64(values.to_vec()),
        }
    }

    fn zeros(len: usize, dtype: DType) -> Self {
        match dtype {
            DType::Float32 => Buffer::F32(vec![0.0; len]),
            DType::Float64 => Buffer::F64(vec![0.0; len]),
        }
    }

    fn view(&self, shape: Shape) -> DynTensor<'_> {
        match self {
            Buffer::F32(data) => TensorView::new(data.as_slice(), shape).into(),
            Buffer::F64(data) => TensorView::new(data.as_slice(), shape).into(),
        }
    }

    fn view_mut(&mut self, shape: Shape) -> DynTensorMut<'_> {
        match self {
            Buffer::F32(data) => TensorViewMut::new(data.as_mut_slice(), shape).into(),
            Buffer::F64(data) => TensorViewMut::new(data.as_mut_slice(), shape).into(),
        }
    }

    fn into_values(self) -> Vec<f64> {
        match self {
            Buffer::F32(data) => data.into_iter().map(f64::from).collect(),
            Buffer::F64(data) => data,
        }
    }
}

/// Output shape `[n, c0*c1, 1, 1]` for inputs `[n, c0, h, w]` and `[n, c1, h, w]`.
#[pyfunction]
fn output_shape(shape0: Vec<usize>, shape1: Vec<usize>) -> PyResult<Vec<usize>> {
    let s0 = parse_shape(&shape0)?;
    let s1 = parse_shape(&shape1)?;
    let out = BilinearPool::default().infer_shape(&s0, &s1).map_err(to_py_err)?;
    Ok(out.as_slice().to_vec())
}

/// Pool `data0` with `data1`. Returns the flat output and its shape.
#[pyfunction]
#[pyo3(signature = (data0, shape0, data1, shape1, dtype = "float32", parallel = false))]
fn forward(
    data0: Vec<f64>,
    shape0: Vec<usize>,
    data1: Vec<f64>,
    shape1: Vec<usize>,
    dtype: &str,
    parallel: bool,
) -> PyResult<(Vec<f64>, Vec<usize>)> {
    let dtype = parse_dtype(dtype)?;
    let s0 = parse_shape(&shape0)?;
    let s1 = parse_shape(&shape1)?;
    let op = BilinearPool::new(ComputeContext::with_parallelism(parallel));
    let out_shape = op.infer_shape(&s0, &s1).map_err(to_py_err)?;

    let b0 = Buffer::from_values(&data0, dtype);
    let b1 = Buffer::from_values(&data1, dtype);
    let mut out = Buffer::zeros(element_count(&out_shape, BufferRole::Output)?, dtype);
    op.forward(b0.view(s0), b1.view(s1), out.view_mut(out_shape))
        .map_err(to_py_err)?;

    log::debug!(
        "forward {:?} x {:?} -> {:?} ({})",
        s0.as_slice(),
        s1.as_slice(),
        out_shape.as_slice(),
        op.context().name()
    );
    Ok((out.into_values(), out_shape.as_slice().to_vec()))
}

/// Pairs the optional second input with its shape. Both or neither must be
/// given; `None` means self-pooling.
fn second_input(
    data1: Option<Vec<f64>>,
    shape1: Option<Vec<usize>>,
) -> Result<Option<(Vec<f64>, Vec<usize>)>, &'static str> {
    match (data1, shape1) {
        (Some(data), Some(shape)) => Ok(Some((data, shape))),
        (Some(_), None) => Err("shape1 is required with data1"),
        (None, Some(_)) => Err("shape1 given without data1"),
        (None, None) => Ok(None),
    }
}

/// Gradients of both inputs. Omitting `data1` pools `data0` with itself and
/// returns `None` for the second gradient.
#[pyfunction]
#[pyo3(signature = (grad_out, data0, shape0, data1 = None, shape1 = None, dtype = "float32", parallel = false))]
fn backward(
    grad_out: Vec<f64>,
    data0: Vec<f64>,
    shape0: Vec<usize>,
    data1: Option<Vec<f64>>,
    shape1: Option<Vec<usize>>,
    dtype: &str,
    parallel: bool,
) -> PyResult<(Vec<f64>, Option<Vec<f64>>)> {
    let dtype = parse_dtype(dtype)?;
    let s0 = parse_shape(&shape0)?;
    let op = BilinearPool::new(ComputeContext::with_parallelism(parallel));

    let b0 = Buffer::from_values(&data0, dtype);
    let mut g0 = Buffer::zeros(element_count(&s0, BufferRole::GradData0)?, dtype);

    match second_input(data1, shape1).map_err(PyValueError::new_err)? {
        Some((data1, shape1)) => {
            let s1 = parse_shape(&shape1)?;
            let out_shape = op.infer_shape(&s0, &s1).map_err(to_py_err)?;
            let go = Buffer::from_values(&grad_out, dtype);
            let b1 = Buffer::from_values(&data1, dtype);
            let mut g1 = Buffer::zeros(element_count(&s1, BufferRole::GradData1)?, dtype);
            op.backward(
                go.view(out_shape),
                b0.view(s0),
                Some(b1.view(s1)),
                g0.view_mut(s0),
                Some(g1.view_mut(s1)),
            )
            .map_err(to_py_err)?;
            Ok((g0.into_values(), Some(g1.into_values())))
        }
        None => {
            let out_shape = op.infer_shape(&s0, &s0).map_err(to_py_err)?;
            let go = Buffer::from_values(&grad_out, dtype);
            op.backward(go.view(out_shape), b0.view(s0), None, g0.view_mut(s0), None)
                .map_err(to_py_err)?;
            Ok((g0.into_values(), None))
        }
    }
}

#[pymodule]
fn bilinear_pool_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(output_shape, m)?)?;
    m.add_function(wrap_pyfunction!(forward, m)?)?;
    m.add_function(wrap_pyfunction!(backward, m)?)?;
    m.add("OP_NAME", bilinear_pool_core::op::OP_NAME)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_input_requires_both_or_neither() {
        assert_eq!(second_input(None, None), Ok(None));
        assert_eq!(
            second_input(Some(vec![1.0, 2.0]), Some(vec![1, 1, 1, 2])),
            Ok(Some((vec![1.0, 2.0], vec![1, 1, 1, 2])))
        );
        assert_eq!(second_input(Some(vec![1.0]), None), Err("shape1 is required with data1"));
        assert_eq!(second_input(None, Some(vec![1, 1, 1, 2])), Err("shape1 given without data1"));
    }
}
