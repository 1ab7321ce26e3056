//! Split-screen cameras

/// Number of split-screen cameras
pub const MAX_SPLIT: usize = 8;

/// Camera errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// Every camera is already active
    #[error("all {0} cameras are active")]
    AllActive(usize),

    /// Index past [`MAX_SPLIT`]
    #[error("camera index {0} out of range")]
    OutOfRange(usize),
}

/// One split-screen view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camera {
    index: usize,
    active: bool,
}

impl Camera {
    /// Inactive camera at `index`
    pub const fn new(index: usize) -> Self {
        Self {
            index,
            active: false,
        }
    }

    /// Position in the camera array
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Whether the camera is drawn
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Enable the camera
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Disable the camera
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

/// Fixed array of [`MAX_SPLIT`] cameras
#[derive(Debug, Clone)]
pub struct CameraRig {
    cameras: [Camera; MAX_SPLIT],
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraRig {
    /// All cameras inactive
    pub fn new() -> Self {
        Self {
            cameras: std::array::from_fn(Camera::new),
        }
    }

    /// Every camera
    pub const fn cameras(&self) -> &[Camera; MAX_SPLIT] {
        &self.cameras
    }

    /// Every camera, mutably
    pub fn cameras_mut(&mut self) -> &mut [Camera; MAX_SPLIT] {
        &mut self.cameras
    }

    /// Camera at `index`
    pub fn camera(&self, index: usize) -> Result<&Camera, CameraError> {
        self.cameras.get(index).ok_or(CameraError::OutOfRange(index))
    }

    /// Camera at `index`, mutably
    pub fn camera_mut(&mut self, index: usize) -> Result<&mut Camera, CameraError> {
        self.cameras.get_mut(index).ok_or(CameraError::OutOfRange(index))
    }

    /// Activate the first inactive camera and return its index
    pub fn activate_camera(&mut self) -> Result<usize, CameraError> {
        let camera = self
            .cameras
            .iter_mut()
            .find(|camera| !camera.is_active())
            .ok_or(CameraError::AllActive(MAX_SPLIT))?;
        camera.activate();
        Ok(camera.index())
    }

    /// Number of active cameras
    pub fn active_count(&self) -> usize {
        self.cameras.iter().filter(|camera| camera.is_active()).count()
    }
}
