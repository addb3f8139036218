//! GPU evaluation of device expressions using WGPU.
//!
//! This backend turns a whole pre-validated expression tree into a single
//! WGSL compute shader: offsets of nested block reads are folded into the
//! generated indexing arithmetic, elementwise nodes become inline
//! expressions, and one dispatch writes every output element. No
//! intermediate buffer exists on either side of the fence.
//!
//! The GPU context is initialized once via `lazy_static`. Staged `f64`
//! data is cast to `f32` for the device and back on readback, and every
//! readback is a blocking synchronization point (`pollster` + device
//! poll), so a caller can never observe an unfinished result.
//!
//! Entry points return `Option` so the dispatcher can fall back to the
//! CPU backend when the GPU declines the work.

use briny::prelude::*;
use wgpu::util::DeviceExt;

use crate::expr::{DeviceMatrix, Expr, ExprOp};

/// Basic wrapper for common GPU errors.
#[derive(Debug)]
pub enum GpuError {
    /// An error in requesting the adapter.
    Adapter(wgpu::RequestAdapterError),
    /// An error in requesting the GPU (device).
    Device(wgpu::RequestDeviceError),
}

impl std::fmt::Display for GpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuError::Adapter(e) => write!(f, "Adapter error: {e}"),
            GpuError::Device(e) => write!(f, "Device error: {e}"),
        }
    }
}

/// Wrapper for a `GpuError` or `ValidationError` depending on how it fails.
#[derive(Debug)]
pub enum GpuFailureKind {
    /// An error resulting from the GPU.
    Gpu(GpuError),
    /// An error resulting from validating generated shader source.
    Validation(ValidationError),
}

impl std::fmt::Display for GpuFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuFailureKind::Gpu(err) => write!(f, "GPU error: {err}"),
            GpuFailureKind::Validation(err) => write!(f, "Validation error: {err}"),
        }
    }
}

/// A type of error closely related to the GPU.
#[derive(Debug)]
pub struct GpuFailure {
    /// The optional type of failure that occurred.
    pub kind: Option<GpuFailureKind>,
    /// The optional message explaining the failure.
    pub message: Option<String>,
}

impl From<GpuError> for GpuFailure {
    fn from(kind: GpuError) -> Self {
        Self {
            kind: Some(GpuFailureKind::Gpu(kind)),
            message: None,
        }
    }
}

impl From<ValidationError> for GpuFailure {
    fn from(kind: ValidationError) -> Self {
        Self {
            kind: Some(GpuFailureKind::Validation(kind)),
            message: None,
        }
    }
}

impl From<&str> for GpuFailure {
    fn from(msg: &str) -> Self {
        Self {
            kind: None,
            message: Some(msg.to_string()),
        }
    }
}

impl std::fmt::Display for GpuFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if let Some(kind) = &self.kind {
            write!(f, "GPU failure: {kind}")
        } else if let Some(msg) = &self.message {
            write!(f, "GPU failure: {msg}")
        } else {
            write!(f, "Unknown GPU failure")
        }
    }
}

impl std::error::Error for GpuFailure {}

/// Holds the WGPU device and queue used for executing compute pipelines.
///
/// Initialized once globally and reused for all evaluations via
/// `lazy_static`.
pub struct GpuContext {
    /// The actual GPU device.
    pub device: wgpu::Device,
    /// A queue for work submitted to the device.
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Initializes a new GPU context, selecting the default adapter and
    /// creating a device + queue.
    ///
    /// # Returns
    /// - `Ok(GpuContext)` if the GPU is successfully initialized
    /// - `Err(GpuError)` if adapter or device acquisition fails
    ///
    /// # Internals
    /// - Uses `pollster::block_on` to synchronously wait for async WGPU
    ///   calls
    /// - Selects the default adapter with default options
    /// - Enables default limits and features for broad compatibility
    pub fn new() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::default();
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
                .map_err(GpuError::Adapter)?;
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .map_err(GpuError::Device)?;

        Ok(Self { device, queue })
    }
}

/// Secure wrapper for generated WGSL source code.
pub struct WgslSource<'a>(pub &'a str);

impl<'a> Validate for WgslSource<'a> {
    fn validate(&self) -> Result<(), ValidationError> {
        let src = self.0;

        // Basic sanity checks
        if src.len() > 65536 {
            return Err(ValidationError);
        }

        if !src.contains("fn main") {
            return Err(ValidationError);
        }

        if src.contains("import") || src.contains("#include") {
            return Err(ValidationError); // Disallow source inclusion
        }

        // Disallow forbidden patterns
        let forbidden = ["asm", "unsafe", "ptr", "std::"];
        if forbidden.iter().any(|bad| src.contains(bad)) {
            return Err(ValidationError);
        }

        Ok(())
    }
}

/// Validates generated WGSL and compiles it into a labeled shader module.
pub fn load_shader(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> Result<wgpu::ShaderModule, GpuFailure> {
    WgslSource(source).validate()?; // briny-based check

    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    }))
}

lazy_static::lazy_static! {
    static ref GPU_CONTEXT: GpuContext = GpuContext::new().expect("Failed to initialize GPU context");
}

fn as_bytes<T: Copy>(data: &[T]) -> &[u8] {
    let len = std::mem::size_of_val(data);
    unsafe { std::slice::from_raw_parts(data.as_ptr() as *const u8, len) }
}

fn bytes_to_f32_slice(data: &[u8]) -> Result<&[f32], &'static str> {
    use std::mem::{align_of, size_of};

    if data.as_ptr() as usize % align_of::<f32>() != 0 {
        return Err("unaligned buffer");
    }

    if data.len() % size_of::<f32>() != 0 {
        return Err("buffer length is not a multiple of f32");
    }

    let len = data.len() / size_of::<f32>();
    let ptr = data.as_ptr() as *const f32;
    unsafe { Ok(std::slice::from_raw_parts(ptr, len)) }
}

/// Generates one WGSL compute shader for the whole expression tree.
///
/// Each invocation computes one output element; block offsets and source
/// strides are folded into the generated indexing expressions, so the
/// shader body is a single assignment however deep the tree is.
fn generate_wgsl(expr: &Expr<'_>) -> String {
    let mut shader = String::new();
    for s in 0..expr.sources().len() {
        shader.push_str(&format!(
            "@group(0) @binding({s}) var<storage, read> src{s}: array<f32>;\n"
        ));
    }
    shader.push_str(&format!(
        "@group(0) @binding({}) var<storage, read_write> out: array<f32>;\n\n",
        expr.sources().len()
    ));

    let len = expr.rows() * expr.cols();
    let cols = expr.cols();
    let body = emit(expr, expr.root(), "r", "c");
    shader.push_str(&format!(
        "@compute @workgroup_size(64)\n\
         fn main(@builtin(global_invocation_id) gid: vec3<u32>) {{\n\
         \x20   let i = gid.x;\n\
         \x20   if (i >= {len}u) {{\n\
         \x20       return;\n\
         \x20   }}\n\
         \x20   let r = i / {cols}u;\n\
         \x20   let c = i % {cols}u;\n\
         \x20   out[i] = {body};\n\
         }}\n"
    ));
    shader
}

fn emit(expr: &Expr<'_>, node: usize, row: &str, col: &str) -> String {
    match &expr.nodes()[node].op {
        ExprOp::Load(s) => {
            let stride = expr.sources()[*s].cols();
            format!("src{s}[({row}) * {stride}u + ({col})]")
        }
        ExprOp::Block { of, row0, col0 } => emit(
            expr,
            *of,
            &format!("{row} + {row0}u"),
            &format!("{col} + {col0}u"),
        ),
        ExprOp::Add(a, b) => format!(
            "({} + {})",
            emit(expr, *a, row, col),
            emit(expr, *b, row, col)
        ),
        ExprOp::Sub(a, b) => format!(
            "({} - {})",
            emit(expr, *a, row, col),
            emit(expr, *b, row, col)
        ),
        ExprOp::Mul(a, b) => format!(
            "({} * {})",
            emit(expr, *a, row, col),
            emit(expr, *b, row, col)
        ),
        ExprOp::Scale(a, k) => {
            format!("(f32({:?}) * {})", *k as f32, emit(expr, *a, row, col))
        }
    }
}

/// Evaluates an expression on the GPU with a single fused dispatch.
///
/// # Returns
/// - `Some(DeviceMatrix)` on success
/// - `None` if GPU execution fails (the dispatcher then falls back to
///   the CPU backend)
///
/// # Notes
/// - Staged data is cast from f64 → f32 for the device
/// - Output is cast back from f32 → f64
pub fn wgpu_eval(expr: &Expr<'_>) -> Option<DeviceMatrix> {
    let rows = expr.rows();
    let cols = expr.cols();
    if rows * cols == 0 {
        return Some(DeviceMatrix::new(rows, cols, Vec::new()));
    }

    let sources: Vec<Vec<f32>> = expr
        .sources()
        .iter()
        .map(|s| s.as_slice().iter().map(|&v| v as f32).collect())
        .collect();

    let wgsl = generate_wgsl(expr);
    let mut output = vec![0.0f32; rows * cols];

    let result = pollster::block_on(run_fused_shader(&sources, &mut output, &wgsl));
    if result.is_err() {
        return None;
    }

    Some(DeviceMatrix::new(
        rows,
        cols,
        output.into_iter().map(|v| v as f64).collect(),
    ))
}

// TODO: cache compiled pipelines keyed by generated source; identical
// expression shapes currently recompile the same shader.
async fn run_fused_shader(
    sources: &[Vec<f32>],
    out: &mut [f32],
    wgsl: &str,
) -> Result<(), GpuFailure> {
    let device = &GPU_CONTEXT.device;
    let queue = &GPU_CONTEXT.queue;

    let shader = load_shader(device, "fused_eval", wgsl)?;

    let mut layout_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..sources.len())
        .map(|s| wgpu::BindGroupLayoutEntry {
            binding: s as u32,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        })
        .collect();
    layout_entries.push(wgpu::BindGroupLayoutEntry {
        binding: sources.len() as u32,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("fused_eval_bgl"),
        entries: &layout_entries,
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("fused_eval_pipeline_layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("fused_eval_pipeline"),
        layout: Some(&pipeline_layout),
        module: &shader,
        entry_point: Some("main"),
        cache: None,
        compilation_options: wgpu::PipelineCompilationOptions::default(),
    });

    let source_buffers: Vec<wgpu::Buffer> = sources
        .iter()
        .enumerate()
        .map(|(s, data)| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("src{s}")),
                contents: as_bytes(data),
                usage: wgpu::BufferUsages::STORAGE,
            })
        })
        .collect();

    let out_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("out"),
        size: (out.len() * 4) as u64,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });

    let mut bind_entries: Vec<wgpu::BindGroupEntry> = source_buffers
        .iter()
        .enumerate()
        .map(|(s, buf)| wgpu::BindGroupEntry {
            binding: s as u32,
            resource: buf.as_entire_binding(),
        })
        .collect();
    bind_entries.push(wgpu::BindGroupEntry {
        binding: sources.len() as u32,
        resource: out_buffer.as_entire_binding(),
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("fused_eval_bind_group"),
        layout: &bind_group_layout,
        entries: &bind_entries,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("fused_eval_encoder"),
    });

    {
        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("fused_eval_pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&pipeline);
        compute_pass.set_bind_group(0, &bind_group, &[]);
        compute_pass.dispatch_workgroups((out.len() as u32).div_ceil(64), 1, 1);
    }

    let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("staging"),
        size: (out.len() * 4) as u64,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    encoder.copy_buffer_to_buffer(&out_buffer, 0, &staging_buffer, 0, (out.len() * 4) as u64);

    queue.submit(Some(encoder.finish()));
    let buffer_slice = staging_buffer.slice(..);
    buffer_slice.map_async(wgpu::MapMode::Read, |result| {
        assert!(result.is_ok());
    });
    device
        .poll(wgpu::PollType::Wait)
        .map_err(|_| GpuFailure::from("device poll failed"))?;

    let data = buffer_slice.get_mapped_range();
    out.copy_from_slice(bytes_to_f32_slice(&data)?);
    drop(data);
    staging_buffer.unmap();

    Ok(())
}
