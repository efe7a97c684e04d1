//! Constants used throughout the pipeline

/// Minimum working resolution below which images are upscaled before search
pub const MIN_WORKING_WIDTH: u32 = 640;
pub const MIN_WORKING_HEIGHT: u32 = 480;

/// Secondary working resolution for the second upscale stage
pub const SECONDARY_WORKING_WIDTH: u32 = 1024;
pub const SECONDARY_WORKING_HEIGHT: u32 = 768;

/// Ceiling for the combined pre-search upscale factor
pub const MAX_COMBINED_UPSCALE: f64 = 3.0;

/// Scale factors tried by the multi-scale search, in order
pub const DEFAULT_SEARCH_SCALES: [f64; 3] = [0.75, 1.0, 1.25];

/// Extra scale tried by the extended search profile
pub const EXTENDED_SEARCH_SCALE: f64 = 1.5;

/// Minimum face size as a fraction of the shorter working dimension
pub const PORTRAIT_FACE_FRACTION: f64 = 0.03;
pub const LANDSCAPE_FACE_FRACTION: f64 = 0.06;
pub const UPSCALED_FACE_FRACTION: f64 = 0.04;

/// Share of the base minimum size dropped once more than one face clears it
pub const MULTI_FACE_FRACTION: f64 = 0.03;

/// Decimal places kept for exported x/y and z
pub const XY_DECIMALS: i32 = 2;
pub const Z_DECIMALS: i32 = 3;

/// Overlay blend factor for the marked copy
pub const DEFAULT_OVERLAY_ALPHA: f32 = 0.5;

/// Face-mesh landmark counts with and without iris refinement
pub const FACE_MESH_LANDMARKS: usize = 468;
pub const REFINED_FACE_MESH_LANDMARKS: usize = 478;

/// Scheduler timer period in milliseconds
pub const DEFAULT_TICK_MS: u64 = 15;

/// Assumed frame rate when a source does not report one
pub const DEFAULT_FPS: f64 = 30.0;

/// Size of the frame processing worker pool
pub const DEFAULT_WORKER_THREADS: usize = 5;

/// Frames retained per stream behind the newest computed frame
pub const DEFAULT_CACHE_WINDOW: u64 = 300;

/// Cooldown between two exports in milliseconds
pub const DEFAULT_EXPORT_THROTTLE_MS: u64 = 1000;
