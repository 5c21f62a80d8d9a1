use glam::{DMat3, DVec3};

/// Tilt factors of a triclinic box.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Tilt {
    pub xy: f64,
    pub xz: f64,
    pub yz: f64,
}

/// The box bounds as they are written in a dump frame.
///
/// For a triclinic box, `lo` and `hi` describe the axis-aligned bounding box of the tilted cell,
/// not the cell itself. [`Lattice::from_bounds`] undoes that.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BoxBounds {
    pub lo: DVec3,
    pub hi: DVec3,
    /// Present iff the box is triclinic.
    pub tilt: Option<Tilt>,
}

impl BoxBounds {
    pub fn orthogonal(lo: impl Into<DVec3>, hi: impl Into<DVec3>) -> Self {
        Self {
            lo: lo.into(),
            hi: hi.into(),
            tilt: None,
        }
    }

    pub fn triclinic(lo: impl Into<DVec3>, hi: impl Into<DVec3>, tilt: Tilt) -> Self {
        Self {
            lo: lo.into(),
            hi: hi.into(),
            tilt: Some(tilt),
        }
    }

    pub fn is_triclinic(&self) -> bool {
        self.tilt.is_some()
    }

    /// Returns the lower and upper corner of the cell itself, with the tilt-induced skew of
    /// the bounding box removed.
    pub fn corrected(&self) -> (DVec3, DVec3) {
        let (mut lo, mut hi) = (self.lo, self.hi);
        if let Some(Tilt { xy, xz, yz }) = self.tilt {
            lo.x -= 0.0f64.min(xy).min(xz).min(xy + xz);
            hi.x -= 0.0f64.max(xy).max(xz).max(xy + xz);
            lo.y -= 0.0f64.min(yz);
            hi.y -= 0.0f64.max(yz);
        }
        (lo, hi)
    }
}

/// The simulation cell derived from a frame's [`BoxBounds`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice {
    /// Edge vectors `a`, `b` and `c` as the columns of the matrix.
    pub matrix: DMat3,
    pub volume: f64,
    /// Geometric center of the cell in the coordinates of the dump.
    pub center: DVec3,
}

impl Lattice {
    pub fn from_bounds(bounds: &BoxBounds) -> Self {
        let (lo, hi) = bounds.corrected();
        let Tilt { xy, xz, yz } = bounds.tilt.unwrap_or_default();
        let extent = hi - lo;

        let a = DVec3::new(extent.x, 0.0, 0.0);
        let b = DVec3::new(xy, extent.y, 0.0);
        let c = DVec3::new(xz, yz, extent.z);

        Self {
            matrix: DMat3::from_cols(a, b, c),
            volume: a.dot(b.cross(c)),
            center: 0.5 * (a + b + c) + lo,
        }
    }

    pub fn a(&self) -> DVec3 {
        self.matrix.x_axis
    }

    pub fn b(&self) -> DVec3 {
        self.matrix.y_axis
    }

    pub fn c(&self) -> DVec3 {
        self.matrix.z_axis
    }

    /// Returns the rows of the lattice matrix, top to bottom.
    pub fn rows(&self) -> [DVec3; 3] {
        [self.matrix.row(0), self.matrix.row(1), self.matrix.row(2)]
    }

    /// A cell is only physically meaningful if its volume is strictly positive. `NaN` is not.
    pub fn is_valid(&self) -> bool {
        self.volume > 0.0
    }
}
