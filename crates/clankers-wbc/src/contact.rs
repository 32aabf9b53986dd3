use nalgebra::{DMatrix, DVector};

use crate::error::WbcError;
use crate::model::RobotModel;
use crate::task::linear_rows;

/// Contact geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactKind {
    /// Point foot: 3-D reaction force.
    Point,
    /// Rectangular sole: 6-D reaction wrench.
    Surface,
}

impl ContactKind {
    /// Dimension of the reaction force.
    pub const fn dim(self) -> usize {
        match self {
            Self::Point => 3,
            Self::Surface => 6,
        }
    }
}

/// A ground contact on one link.
///
/// `rf_z_max` bounds the normal reaction force and is written directly by
/// the gait sequencer (or a [`ReactionForceManager`](crate::ReactionForceManager))
/// at any tick.
///
/// The Jacobian accessors fail until [`Contact::update_contact`] has run
/// once.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    link: String,
    kind: ContactKind,
    mu: f64,
    x: f64,
    y: f64,
    n_q_dot: usize,
    pub rf_z_max: f64,
    jacobian: DMatrix<f64>,
    jacobian_dot_q_dot: DVector<f64>,
    jacobian_fresh: bool,
}

impl Contact {
    /// Point contact with friction coefficient `mu`.
    pub fn point(
        link: impl Into<String>,
        n_q_dot: usize,
        mu: f64,
        rf_z_max: f64,
    ) -> Result<Self, WbcError> {
        Self::new(link.into(), ContactKind::Point, n_q_dot, mu, 0.0, 0.0, rf_z_max)
    }

    /// Surface contact with half extents `x` (length) and `y` (width).
    pub fn surface(
        link: impl Into<String>,
        n_q_dot: usize,
        x: f64,
        y: f64,
        mu: f64,
        rf_z_max: f64,
    ) -> Result<Self, WbcError> {
        if !(x > 0.0 && y > 0.0) {
            return Err(WbcError::InvalidArgument(format!(
                "surface contact extents x={x}, y={y} (must be > 0)"
            )));
        }
        Self::new(link.into(), ContactKind::Surface, n_q_dot, mu, x, y, rf_z_max)
    }

    fn new(
        link: String,
        kind: ContactKind,
        n_q_dot: usize,
        mu: f64,
        x: f64,
        y: f64,
        rf_z_max: f64,
    ) -> Result<Self, WbcError> {
        if !(mu > 0.0 && mu.is_finite()) {
            return Err(WbcError::InvalidArgument(format!(
                "friction coefficient {mu} (must be > 0)"
            )));
        }
        if !(rf_z_max >= 0.0) {
            return Err(WbcError::InvalidArgument(format!(
                "rf_z_max {rf_z_max} (must be >= 0)"
            )));
        }
        let dim = kind.dim();
        Ok(Self {
            link,
            kind,
            mu,
            x,
            y,
            n_q_dot,
            rf_z_max,
            jacobian: DMatrix::zeros(dim, n_q_dot),
            jacobian_dot_q_dot: DVector::zeros(dim),
            jacobian_fresh: false,
        })
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub const fn kind(&self) -> ContactKind {
        self.kind
    }

    pub const fn dim(&self) -> usize {
        self.kind.dim()
    }

    pub const fn mu(&self) -> f64 {
        self.mu
    }

    /// Half extents `(x, y)` of a surface contact; zero for a point.
    pub const fn half_extents(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub const fn is_jacobian_fresh(&self) -> bool {
        self.jacobian_fresh
    }

    /// Contact Jacobian, `dim × n_q_dot`.
    pub fn jacobian(&self) -> Result<&DMatrix<f64>, WbcError> {
        self.require_fresh()?;
        Ok(&self.jacobian)
    }

    pub fn jacobian_dot_q_dot(&self) -> Result<&DVector<f64>, WbcError> {
        self.require_fresh()?;
        Ok(&self.jacobian_dot_q_dot)
    }

    /// Refresh the contact Jacobian from the robot model.
    pub fn update_contact(&mut self, robot: &dyn RobotModel) -> Result<(), WbcError> {
        let jac = robot.get_link_jacobian(&self.link)?;
        let jac_dot = robot.get_link_jacobian_dot(&self.link)?;
        let (jac, jac_dot) = match self.kind {
            ContactKind::Point => (linear_rows(jac)?, linear_rows(jac_dot)?),
            ContactKind::Surface => (jac, jac_dot),
        };
        WbcError::check_len("contact jacobian rows", self.dim(), jac.nrows())?;
        WbcError::check_len("contact jacobian_dot rows", self.dim(), jac_dot.nrows())?;
        WbcError::check_len("contact jacobian cols", self.n_q_dot, jac.ncols())?;
        WbcError::check_len("contact jacobian_dot cols", self.n_q_dot, jac_dot.ncols())?;

        let q_dot = robot.get_q_dot();
        WbcError::check_len("q_dot", self.n_q_dot, q_dot.len())?;
        self.jacobian_dot_q_dot = &jac_dot * q_dot;
        self.jacobian = jac;
        self.jacobian_fresh = true;
        Ok(())
    }

    fn require_fresh(&self) -> Result<(), WbcError> {
        if self.jacobian_fresh {
            Ok(())
        } else {
            Err(WbcError::JacobianNotRefreshed(format!("contact({})", self.link)))
        }
    }
}
