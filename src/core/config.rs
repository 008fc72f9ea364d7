//! Explicit configuration for mesh construction and refinement.
//!
//! Nothing in this crate reads process-wide state: every tolerance, the
//! enclosing-polygon shape, the optional topology tables and the refinement
//! criteria travel in the values defined here.
//!
//! # Examples
//!
//! ```rust
//! use fmesh::core::config::{MeshConfigBuilder, RefinementParametersBuilder};
//!
//! let config = MeshConfigBuilder::default()
//!     .track_vertex_triangles(false)
//!     .build()
//!     .unwrap();
//! assert!(config.track_neighbor_edges);
//! assert_eq!(config.enclosure.sides, 8);
//!
//! let params = RefinementParametersBuilder::default()
//!     .min_angle_degrees(25.0)
//!     .max_edge(0.1)
//!     .build()
//!     .unwrap();
//! assert_eq!(params.max_edge(), Some(0.1));
//! ```

use crate::geometry::mesh_type::MeshType;
use crate::geometry::point::Point;

// =============================================================================
// TOLERANCES
// =============================================================================

/// Numerical tolerances with their documented defaults.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    /// Relative spread of the third coordinate below which input is planar.
    pub flatness: f64,
    /// Relative radius deviation below which input is spherical.
    pub sphere: f64,
    /// Relative tolerance of orientation and in-circle determinants.
    pub predicate: f64,
    /// Distance, relative to the input radius, under which a point is a duplicate.
    pub duplicate: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            flatness: 1e-10,
            sphere: 1e-7,
            predicate: 1e-12,
            duplicate: 1e-12,
        }
    }
}

impl Tolerances {
    /// Classifies a point set with these tolerances.
    #[must_use]
    pub fn classify(&self, points: &[Point]) -> MeshType {
        MeshType::classify(points, self.flatness, self.sphere)
    }

    fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("flatness", self.flatness),
            ("sphere", self.sphere),
            ("predicate", self.predicate),
            ("duplicate", self.duplicate),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(format!("tolerance `{name}` must be finite and non-negative, got {value}"));
            }
        }
        Ok(())
    }
}

// =============================================================================
// ENCLOSURE
// =============================================================================

/// Shape of the enclosing polygon built around planar input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnclosureConfig {
    /// Number of polygon sides (at least 3).
    pub sides: usize,
    /// Margin, relative to the input's bounding radius, between the input and
    /// the polygon.
    pub margin: f64,
}

impl Default for EnclosureConfig {
    fn default() -> Self {
        Self {
            sides: 8,
            margin: 0.1,
        }
    }
}

// =============================================================================
// MESH CONFIGURATION
// =============================================================================

/// Configuration of a [`Mesh`](crate::core::mesh::Mesh).
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct MeshConfig {
    /// Numerical tolerances.
    #[builder(default)]
    pub tolerances: Tolerances,
    /// Enclosing polygon parameters.
    #[builder(default)]
    pub enclosure: EnclosureConfig,
    /// Maintain the per-triangle back-edge table (O(1) edge crossing).
    #[builder(default = "true")]
    pub track_neighbor_edges: bool,
    /// Maintain the vertex-to-one-triangle table.
    #[builder(default = "true")]
    pub track_vertex_triangles: bool,
    /// Force a mesh type instead of classifying the input.
    #[builder(setter(into, strip_option), default)]
    pub mesh_type: Option<MeshType>,
    /// Flip budget per repair pass; `None` derives it from the mesh size.
    #[builder(setter(into, strip_option), default)]
    pub max_flips: Option<usize>,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            enclosure: EnclosureConfig::default(),
            track_neighbor_edges: true,
            track_vertex_triangles: true,
            mesh_type: None,
            max_flips: None,
        }
    }
}

impl MeshConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(tolerances) = &self.tolerances {
            tolerances.validate()?;
        }
        if let Some(enclosure) = &self.enclosure {
            if enclosure.sides < 3 {
                return Err(format!(
                    "enclosing polygon needs at least 3 sides, got {}",
                    enclosure.sides
                ));
            }
            if !(enclosure.margin.is_finite() && enclosure.margin >= 0.0) {
                return Err(format!(
                    "enclosure margin must be finite and non-negative, got {}",
                    enclosure.margin
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// REFINEMENT PARAMETERS
// =============================================================================

/// Default minimum angle bound, in degrees.
pub const DEFAULT_MIN_ANGLE_DEGREES: f64 = 21.0;

/// Quality criteria and resource ceilings for refinement.
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct RefinementParameters {
    /// Minimum interior angle, in degrees; `0` disables the angle criterion.
    #[builder(default = "DEFAULT_MIN_ANGLE_DEGREES")]
    pub min_angle_degrees: f64,
    /// Default maximum edge length; non-positive means unbounded.
    #[builder(default = "0.0")]
    pub max_edge: f64,
    /// Per-vertex maximum edge lengths; entries `<= 0` fall back to `max_edge`.
    #[builder(setter(into), default)]
    pub per_vertex_max_edge: Vec<f64>,
    /// Use off-center Steiner points instead of plain circumcenters.
    #[builder(default = "false")]
    pub off_center: bool,
    /// Maximum number of Steiner points inserted before giving up.
    #[builder(default = "1_000_000")]
    pub max_steiner_points: usize,
    /// Maximum number of live triangles before giving up.
    #[builder(default = "10_000_000")]
    pub max_triangles: usize,
}

impl Default for RefinementParameters {
    fn default() -> Self {
        Self {
            min_angle_degrees: DEFAULT_MIN_ANGLE_DEGREES,
            max_edge: 0.0,
            per_vertex_max_edge: Vec::new(),
            off_center: false,
            max_steiner_points: 1_000_000,
            max_triangles: 10_000_000,
        }
    }
}

impl RefinementParameters {
    /// Default edge bound, if one is set.
    #[must_use]
    pub fn max_edge(&self) -> Option<f64> {
        (self.max_edge > 0.0 && self.max_edge.is_finite()).then_some(self.max_edge)
    }

    /// Minimum angle bound in radians.
    #[must_use]
    pub fn min_angle_radians(&self) -> f64 {
        self.min_angle_degrees.to_radians()
    }

    /// Checks the parameters; used by the builder and by refinement entry points.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid parameter.
    pub fn check(&self) -> Result<(), String> {
        if !(self.min_angle_degrees.is_finite() && (0.0..60.0).contains(&self.min_angle_degrees)) {
            return Err(format!(
                "minimum angle must be in [0, 60) degrees, got {}",
                self.min_angle_degrees
            ));
        }
        if self.max_edge.is_nan() {
            return Err("maximum edge length is NaN".to_string());
        }
        if self.per_vertex_max_edge.iter().any(|b| b.is_nan()) {
            return Err("per-vertex maximum edge length contains NaN".to_string());
        }
        Ok(())
    }
}

impl RefinementParametersBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(angle) = self.min_angle_degrees {
            if !(angle.is_finite() && (0.0..60.0).contains(&angle)) {
                return Err(format!(
                    "minimum angle must be in [0, 60) degrees, got {angle}"
                ));
            }
        }
        if self.max_edge.is_some_and(f64::is_nan) {
            return Err("maximum edge length is NaN".to_string());
        }
        Ok(())
    }
}
