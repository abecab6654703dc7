//! Python bindings for the siamtrack tracking core.
//!
//! Frames are `float32` numpy arrays shaped `(height, width, channels)`.
//! Bounding boxes are `(center_y, center_x, height, width)` tuples in pixels.

use numpy::{
    PyArray1, PyArray3, PyArray4, PyArrayMethods, PyReadonlyArray3, PyReadonlyArray4,
    PyUntypedArrayMethods,
};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use siamtrack::{
    BoundingBox, FrameView, PooledEmbedding, ResponseCalibration, ResponseMap, SearchGeometry,
    SiamTrackError, SiameseTracker, Tensor4, TrackerConfig as RustTrackerConfig, UpsampleMethod,
};

/// Convert a SiamTrackError to a Python exception.
fn to_py_err(err: SiamTrackError) -> PyErr {
    PyRuntimeError::new_err(err.to_string())
}

fn parse_method(name: &str) -> PyResult<UpsampleMethod> {
    name.parse::<UpsampleMethod>()
        .map_err(|_| PyValueError::new_err("upsample_method must be 'bilinear' or 'bicubic'"))
}

fn to_bbox(bbox: (f32, f32, f32, f32)) -> BoundingBox {
    BoundingBox::new(bbox.0, bbox.1, bbox.2, bbox.3)
}

fn frame_view<'a>(frame: &'a PyReadonlyArray3<'_, f32>) -> PyResult<FrameView<'a>> {
    let shape = frame.shape();
    let data = frame.as_slice()?;
    FrameView::new(data, shape[0], shape[1], shape[2]).map_err(to_py_err)
}

fn tensor_from_py(array: &PyReadonlyArray4<'_, f32>) -> PyResult<Tensor4> {
    let shape = array.shape();
    let data = array.as_slice()?.to_vec();
    Tensor4::from_vec(data, [shape[0], shape[1], shape[2], shape[3]]).map_err(to_py_err)
}

fn tensor_to_py<'py>(py: Python<'py>, tensor: Tensor4) -> PyResult<Bound<'py, PyArray4<f32>>> {
    let shape = tensor.shape();
    PyArray1::from_vec(py, tensor.into_vec()).reshape(shape)
}

fn response_to_py<'py>(
    py: Python<'py>,
    response: &ResponseMap,
) -> PyResult<Bound<'py, PyArray3<f32>>> {
    let shape = response.shape();
    PyArray1::from_slice(py, response.as_slice()).reshape(shape)
}

/// Tracker configuration.
#[pyclass]
#[derive(Clone)]
pub struct TrackerConfig {
    inner: RustTrackerConfig,
}

#[pymethods]
impl TrackerConfig {
    /// Create a new TrackerConfig.
    ///
    /// Args:
    ///     z_image_size: Exemplar patch side (default: 127)
    ///     x_image_size: Search patch side (default: 255)
    ///     num_scales: Odd number of search scales (default: 3)
    ///     scale_step: Ratio between neighbouring scales (default: 1.0375)
    ///     context_amount: Context padding fraction (default: 0.5)
    ///     upsample_method: "bilinear" or "bicubic" (default: "bicubic")
    ///     upsample_factor: Response upsampling factor (default: 16)
    ///     response_scale: Multiplicative calibration (default: 1e-3)
    ///     response_bias: Additive calibration (default: 0.0)
    ///     log_level: Above zero, step returns search crops (default: 0)
    #[new]
    #[pyo3(signature = (
        z_image_size = 127,
        x_image_size = 255,
        num_scales = 3,
        scale_step = 1.0375,
        context_amount = 0.5,
        upsample_method = "bicubic",
        upsample_factor = 16,
        response_scale = 1e-3,
        response_bias = 0.0,
        log_level = 0
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        z_image_size: usize,
        x_image_size: usize,
        num_scales: usize,
        scale_step: f32,
        context_amount: f32,
        upsample_method: &str,
        upsample_factor: usize,
        response_scale: f32,
        response_bias: f32,
        log_level: u32,
    ) -> PyResult<Self> {
        let inner = RustTrackerConfig {
            z_image_size,
            x_image_size,
            num_scales,
            scale_step,
            context_amount,
            upsample_method: parse_method(upsample_method)?,
            upsample_factor,
            response_scale,
            response_bias,
            log_level,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Validate the configuration.
    fn validate(&self) -> PyResult<()> {
        self.inner.validate().map_err(to_py_err)
    }

    fn __repr__(&self) -> String {
        format!(
            "TrackerConfig(z_image_size={}, x_image_size={}, num_scales={}, scale_step={}, upsample_method='{}', upsample_factor={})",
            self.inner.z_image_size,
            self.inner.x_image_size,
            self.inner.num_scales,
            self.inner.scale_step,
            self.inner.upsample_method,
            self.inner.upsample_factor
        )
    }
}

/// Search geometry of one frame.
#[pyclass]
#[derive(Clone)]
pub struct Geometry {
    /// Exemplar extent in frame pixels.
    #[pyo3(get)]
    pub base_s_z: f32,
    /// Frame-to-exemplar resize factor.
    #[pyo3(get)]
    pub base_scale_z: f32,
    /// Unscaled search extent in frame pixels.
    #[pyo3(get)]
    pub base_s_x: f32,
    /// Frame-to-search resize factor of the centre scale.
    #[pyo3(get)]
    pub base_scale_x: f32,
    /// Normalized `(top, left, bottom, right)` crop boxes.
    #[pyo3(get)]
    pub boxes: Vec<(f32, f32, f32, f32)>,
    /// Per-scale resize factors.
    #[pyo3(get)]
    pub scale_factors: Vec<f32>,
}

#[pymethods]
impl Geometry {
    fn __repr__(&self) -> String {
        format!(
            "Geometry(base_s_x={:.2}, base_scale_x={:.4}, scales={})",
            self.base_s_x,
            self.base_scale_x,
            self.scale_factors.len()
        )
    }
}

impl From<SearchGeometry> for Geometry {
    fn from(g: SearchGeometry) -> Self {
        Self {
            base_s_z: g.base_s_z,
            base_scale_z: g.base_scale_z,
            base_s_x: g.base_s_x,
            base_scale_x: g.base_scale_x,
            boxes: g
                .boxes
                .iter()
                .map(|b| (b.top, b.left, b.bottom, b.right))
                .collect(),
            scale_factors: g.scale_factors,
        }
    }
}

/// Resolve the multi-scale search geometry of a target box.
///
/// Args:
///     bbox: (center_y, center_x, height, width)
///     frame_height: Frame height in pixels
///     frame_width: Frame width in pixels
///     config: TrackerConfig (default: TrackerConfig())
#[pyfunction]
#[pyo3(signature = (bbox, frame_height, frame_width, config = None))]
fn search_geometry(
    bbox: (f32, f32, f32, f32),
    frame_height: usize,
    frame_width: usize,
    config: Option<TrackerConfig>,
) -> PyResult<Geometry> {
    let cfg = config.map(|c| c.inner).unwrap_or_default();
    let geometry = SearchGeometry::resolve(&to_bbox(bbox), frame_height, frame_width, &cfg)
        .map_err(to_py_err)?;
    Ok(geometry.into())
}

/// Crop the mean-padded multi-scale search patches.
///
/// Returns:
///     float32 array (num_scales, x_image_size, x_image_size, channels)
#[pyfunction]
#[pyo3(signature = (frame, bbox, config = None))]
fn crop_search_images<'py>(
    py: Python<'py>,
    frame: PyReadonlyArray3<'py, f32>,
    bbox: (f32, f32, f32, f32),
    config: Option<TrackerConfig>,
) -> PyResult<Bound<'py, PyArray4<f32>>> {
    let cfg = config.map(|c| c.inner).unwrap_or_default();
    let view = frame_view(&frame)?;
    let geometry = SearchGeometry::resolve(&to_bbox(bbox), view.height(), view.width(), &cfg)
        .map_err(to_py_err)?;
    let images =
        siamtrack::crop_and_resize(view, &geometry.boxes, cfg.x_image_size).map_err(to_py_err)?;
    tensor_to_py(py, images)
}

/// Per-scale valid cross-correlation with affine calibration.
///
/// Args:
///     search: float32 (scales, H, W, C)
///     templates: float32 (scales, h, w, C)
#[pyfunction]
#[pyo3(signature = (search, templates, scale = 1e-3, bias = 0.0))]
fn correlate<'py>(
    py: Python<'py>,
    search: PyReadonlyArray4<'py, f32>,
    templates: PyReadonlyArray4<'py, f32>,
    scale: f32,
    bias: f32,
) -> PyResult<Bound<'py, PyArray3<f32>>> {
    let search = tensor_from_py(&search)?;
    let templates = tensor_from_py(&templates)?;
    let response = siamtrack::correlate(&search, &templates, ResponseCalibration { scale, bias })
        .map_err(to_py_err)?;
    response_to_py(py, &response)
}

/// Corner-aligned upsampling of a (scales, H, W) response.
#[pyfunction]
#[pyo3(signature = (response, factor = 16, method = "bicubic"))]
fn upsample_response<'py>(
    py: Python<'py>,
    response: PyReadonlyArray3<'py, f32>,
    factor: usize,
    method: &str,
) -> PyResult<Bound<'py, PyArray3<f32>>> {
    let shape = response.shape();
    let map = ResponseMap::from_vec(response.as_slice()?.to_vec(), shape[0], shape[1], shape[2])
        .map_err(to_py_err)?;
    let up = siamtrack::upsample(&map, factor, parse_method(method)?).map_err(to_py_err)?;
    response_to_py(py, &up)
}

/// Single-target tracker backed by the box-pooling reference embedding.
#[pyclass]
pub struct Tracker {
    inner: SiameseTracker<PooledEmbedding>,
}

#[pymethods]
impl Tracker {
    /// Create a tracker.
    ///
    /// Args:
    ///     config: TrackerConfig (default: TrackerConfig())
    #[new]
    #[pyo3(signature = (config = None))]
    fn new(config: Option<TrackerConfig>) -> PyResult<Self> {
        let cfg = config.map(|c| c.inner).unwrap_or_default();
        let inner = SiameseTracker::new(PooledEmbedding::alexnet(), cfg).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Build and store the exemplar template.
    ///
    /// Returns:
    ///     Tuple of (template, reid, scale_factors)
    fn initialize<'py>(
        &mut self,
        py: Python<'py>,
        frame: PyReadonlyArray3<'py, f32>,
        bbox: (f32, f32, f32, f32),
    ) -> PyResult<(Bound<'py, PyArray4<f32>>, Bound<'py, PyArray4<f32>>, Vec<f32>)> {
        let view = frame_view(&frame)?;
        let exemplar = self
            .inner
            .initialize(view, &to_bbox(bbox))
            .map_err(to_py_err)?;
        let template = tensor_to_py(py, exemplar.template.features().clone())?;
        let reid = tensor_to_py(py, exemplar.reid)?;
        Ok((template, reid, exemplar.scale_factors))
    }

    /// Run one tracking step.
    ///
    /// Args:
    ///     frame: float32 (height, width, channels)
    ///     bbox: (center_y, center_x, height, width) of the previous frame
    ///     templates: Optional per-scale templates; the stored template otherwise
    ///     keep_search_images: Return the crops (default: config log_level > 0)
    ///
    /// Returns:
    ///     dict with scale_factors, response, response_up, track, reid and
    ///     optionally search_images
    #[pyo3(signature = (frame, bbox, templates = None, keep_search_images = None))]
    fn step<'py>(
        &self,
        py: Python<'py>,
        frame: PyReadonlyArray3<'py, f32>,
        bbox: (f32, f32, f32, f32),
        templates: Option<PyReadonlyArray4<'py, f32>>,
        keep_search_images: Option<bool>,
    ) -> PyResult<Bound<'py, PyDict>> {
        let view = frame_view(&frame)?;
        let bbox = to_bbox(bbox);
        let keep = keep_search_images
            .unwrap_or_else(|| self.inner.config().keep_search_images_default());
        let out = match templates {
            Some(t) => {
                let t = tensor_from_py(&t)?;
                self.inner.step(view, &bbox, &t, keep)
            }
            None => self.inner.step_with_stored(view, &bbox, keep),
        }
        .map_err(to_py_err)?;

        let dict = PyDict::new(py);
        dict.set_item("scale_factors", out.scale_factors)?;
        dict.set_item("response", response_to_py(py, &out.response)?)?;
        dict.set_item("response_up", response_to_py(py, &out.response_up)?)?;
        dict.set_item("track", tensor_to_py(py, out.track)?)?;
        dict.set_item("reid", tensor_to_py(py, out.reid)?)?;
        if let Some(images) = out.search_images {
            dict.set_item("search_images", tensor_to_py(py, images)?)?;
        }
        Ok(dict)
    }

    /// Forget the stored template.
    fn reset(&mut self) {
        self.inner.reset();
    }

    /// Whether an exemplar template is stored.
    #[getter]
    fn initialized(&self) -> bool {
        self.inner.template().is_some()
    }

    fn __repr__(&self) -> String {
        format!(
            "Tracker(num_scales={}, initialized={})",
            self.inner.config().num_scales,
            self.inner.template().is_some()
        )
    }
}

/// Load an image file as a float32 (height, width, 3) RGB frame.
#[pyfunction]
fn load_frame<'py>(py: Python<'py>, path: &str) -> PyResult<Bound<'py, PyArray3<f32>>> {
    let frame = siamtrack::io::load_rgb_frame(path).map_err(to_py_err)?;
    let shape = [frame.height(), frame.width(), frame.channels()];
    PyArray1::from_slice(py, frame.data()).reshape(shape)
}

/// Python module for siamtrack.
#[pymodule]
fn _siamtrack(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<TrackerConfig>()?;
    m.add_class::<Geometry>()?;
    m.add_class::<Tracker>()?;
    m.add_function(wrap_pyfunction!(search_geometry, m)?)?;
    m.add_function(wrap_pyfunction!(crop_search_images, m)?)?;
    m.add_function(wrap_pyfunction!(correlate, m)?)?;
    m.add_function(wrap_pyfunction!(upsample_response, m)?)?;
    m.add_function(wrap_pyfunction!(load_frame, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
