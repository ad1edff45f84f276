use std::hash::Hash;

use num_traits::{PrimInt, Unsigned};

use crate::error::VolumeError;

/// Volume extent in voxels
///
/// A struct to represent the extent of a volume along each axis.
///
/// # Examples
///
/// ```
/// use voxmorph_volume::VolumeSize;
///
/// let size = VolumeSize { x: 10, y: 20, z: 30 };
///
/// assert_eq!(size.numel(), 6000);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VolumeSize {
    /// Extent along the x axis in voxels
    pub x: usize,
    /// Extent along the y axis in voxels
    pub y: usize,
    /// Extent along the z axis in voxels
    pub z: usize,
}

impl VolumeSize {
    /// Total number of voxels in the volume.
    pub fn numel(&self) -> usize {
        self.x * self.y * self.z
    }
}

impl std::fmt::Display for VolumeSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VolumeSize {{ x: {}, y: {}, z: {} }}", self.x, self.y, self.z)
    }
}

impl From<[usize; 3]> for VolumeSize {
    fn from(size: [usize; 3]) -> Self {
        VolumeSize {
            x: size[0],
            y: size[1],
            z: size[2],
        }
    }
}

/// Physical size of one voxel along each axis.
///
/// Defaults to unit isotropic spacing. Anisotropic spacing only affects
/// distance computations; indexing is always in voxel units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelSpacing {
    /// Voxel size along the x axis
    pub x: f32,
    /// Voxel size along the y axis
    pub y: f32,
    /// Voxel size along the z axis
    pub z: f32,
}

impl Default for VoxelSpacing {
    fn default() -> Self {
        VoxelSpacing {
            x: 1.0,
            y: 1.0,
            z: 1.0,
        }
    }
}

impl VoxelSpacing {
    /// Whether all three factors are positive and finite.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.z]
            .iter()
            .all(|w| w.is_finite() && *w > 0.0)
    }
}

/// Trait for unsigned integer label values stored in a volume.
///
/// The zero value is reserved for background / unlabeled voxels.
pub trait LabelValue: PrimInt + Unsigned + Hash + Send + Sync + 'static {}

impl<T> LabelValue for T where T: PrimInt + Unsigned + Hash + Send + Sync + 'static {}

/// A dense 3D volume of voxel values.
///
/// The backing buffer is linear with the x axis fastest:
/// `index = x + size.x * (y + size.y * z)`. The shape is fixed at
/// construction; mutation is in-place value replacement only.
#[derive(Clone, Debug)]
pub struct Volume<T> {
    data: Vec<T>,
    size: VolumeSize,
}

impl<T: PartialEq> PartialEq for Volume<T> {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.data == other.data
    }
}

impl<T> Volume<T> {
    /// Create a new volume from voxel data.
    ///
    /// # Arguments
    ///
    /// * `size` - The extent of the volume in voxels.
    /// * `data` - The voxel data in x-fastest order.
    ///
    /// # Errors
    ///
    /// Returns an error if any dimension is zero or if the data length does
    /// not match the volume size.
    ///
    /// # Examples
    ///
    /// ```
    /// use voxmorph_volume::{Volume, VolumeSize};
    ///
    /// let volume = Volume::<u8>::new(
    ///     VolumeSize { x: 2, y: 3, z: 4 },
    ///     vec![0u8; 2 * 3 * 4],
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(volume.size().z, 4);
    /// assert_eq!(volume.numel(), 24);
    /// ```
    pub fn new(size: VolumeSize, data: Vec<T>) -> Result<Self, VolumeError> {
        if size.x == 0 || size.y == 0 || size.z == 0 {
            return Err(VolumeError::InvalidDimension(size.x, size.y, size.z));
        }

        if data.len() != size.numel() {
            return Err(VolumeError::InvalidLength(data.len(), size.numel()));
        }

        Ok(Self { data, size })
    }

    /// Create a new volume with every voxel set to `val`.
    ///
    /// # Errors
    ///
    /// Returns an error if any dimension is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use voxmorph_volume::{Volume, VolumeSize};
    ///
    /// let volume = Volume::from_size_val(VolumeSize { x: 4, y: 4, z: 4 }, false).unwrap();
    ///
    /// assert!(volume.as_slice().iter().all(|v| !v));
    /// ```
    pub fn from_size_val(size: VolumeSize, val: T) -> Result<Self, VolumeError>
    where
        T: Clone,
    {
        let data = vec![val; size.numel()];
        Volume::new(size, data)
    }

    /// Get the extent of the volume in voxels.
    pub fn size(&self) -> VolumeSize {
        self.size
    }

    /// Total number of voxels in the volume.
    pub fn numel(&self) -> usize {
        self.size.numel()
    }

    /// Linear index of the voxel at `(x, y, z)`.
    ///
    /// The caller must ensure the coordinates are in bounds.
    #[inline]
    pub fn offset(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.size.x * (y + self.size.y * z)
    }

    /// Get a reference to the voxel at `(x, y, z)`, or `None` when out of
    /// bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use voxmorph_volume::{Volume, VolumeSize};
    ///
    /// let volume = Volume::from_size_val(VolumeSize { x: 2, y: 2, z: 2 }, 7u8).unwrap();
    ///
    /// assert_eq!(volume.get(1, 1, 1), Some(&7));
    /// assert_eq!(volume.get(2, 0, 0), None);
    /// ```
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<&T> {
        if x >= self.size.x || y >= self.size.y || z >= self.size.z {
            return None;
        }
        self.data.get(self.offset(x, y, z))
    }

    /// Set the voxel at `(x, y, z)` to `val`.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinates are out of bounds.
    pub fn set(&mut self, x: usize, y: usize, z: usize, val: T) -> Result<(), VolumeError> {
        if x >= self.size.x || y >= self.size.y || z >= self.size.z {
            return Err(VolumeError::IndexOutOfBounds(
                x, y, z, self.size.x, self.size.y, self.size.z,
            ));
        }
        let idx = self.offset(x, y, z);
        self.data[idx] = val;
        Ok(())
    }

    /// Set every voxel to `val`.
    pub fn fill(&mut self, val: T)
    where
        T: Clone,
    {
        self.data.iter_mut().for_each(|v| *v = val.clone());
    }

    /// Get the voxel data as a slice in x-fastest order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Get the voxel data as a mutable slice in x-fastest order.
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the volume and return the backing buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}
