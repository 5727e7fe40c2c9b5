//! 3D vector and quaternion math in double precision.
//!
//! Right-handed coordinates. Quaternions use the Hamilton convention with the
//! scalar part in `w`; rotations are expected to be unit length.

use ts_rs::TS;

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize, TS)]
#[ts(export)]
pub struct Vec3 {
    #[serde(alias = "_x")]
    pub x: f64,
    #[serde(alias = "_y")]
    pub y: f64,
    #[serde(alias = "_z")]
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Shorthand constructor
pub fn vec3(x: f64, y: f64, z: f64) -> Vec3 {
    Vec3::new(x, y, z)
}

pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(a.x + b.x, a.y + b.y, a.z + b.z)
}

/// a - b
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(a.x - b.x, a.y - b.y, a.z - b.z)
}

pub fn scale(v: Vec3, s: f64) -> Vec3 {
    Vec3::new(v.x * s, v.y * s, v.z * s)
}

/// Reflect through the origin
pub fn negate(v: Vec3) -> Vec3 {
    Vec3::new(-v.x, -v.y, -v.z)
}

pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a.x * b.x + a.y * b.y + a.z * b.z
}

#[cfg(test)]
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    Vec3 {
        x: a.y * b.z - a.z * b.y,
        y: a.z * b.x - a.x * b.z,
        z: a.x * b.y - a.y * b.x,
    }
}

pub fn length(v: Vec3) -> f64 {
    dot(v, v).sqrt()
}

/// Normalize to unit length. Degenerate vectors map to zero rather than NaN.
pub fn normalize(v: Vec3) -> Vec3 {
    let len = length(v);
    if len < 1e-10 {
        return Vec3::ZERO;
    }
    scale(v, 1.0 / len)
}

/// Euclidean distance between two points
pub fn distance(a: Vec3, b: Vec3) -> f64 {
    length(sub(a, b))
}

/// Linear interpolation, t=0 returns a, t=1 returns b.
#[cfg(test)]
pub fn lerp(a: Vec3, b: Vec3, t: f64) -> Vec3 {
    add(a, scale(sub(b, a), t))
}

/// Largest absolute component
pub fn max_abs_component(v: Vec3) -> f64 {
    v.x.abs().max(v.y.abs()).max(v.z.abs())
}

pub fn is_finite(v: Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

/// Rotation quaternion (x, y, z, w).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, TS)]
#[ts(export)]
pub struct Quat {
    #[serde(alias = "_x")]
    pub x: f64,
    #[serde(alias = "_y")]
    pub y: f64,
    #[serde(alias = "_z")]
    pub z: f64,
    #[serde(alias = "_w")]
    pub w: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    pub fn dot(self, other: Quat) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }

    /// Unit-length copy, or `None` for a (near) zero quaternion.
    pub fn normalized(self) -> Option<Quat> {
        let len = self.length();
        if !len.is_finite() || len < 1e-10 {
            return None;
        }
        let inv = 1.0 / len;
        Some(Quat::new(
            self.x * inv,
            self.y * inv,
            self.z * inv,
            self.w * inv,
        ))
    }

    /// Spherical linear interpolation along the shortest arc.
    /// t=0 returns self, t=1 returns other (possibly sign-flipped).
    pub fn slerp(self, other: Quat, t: f64) -> Quat {
        let mut cos_theta = self.dot(other);
        let mut end = other;
        if cos_theta < 0.0 {
            cos_theta = -cos_theta;
            end = Quat::new(-other.x, -other.y, -other.z, -other.w);
        }

        let (s0, s1) = if cos_theta > 0.9995 {
            (1.0 - t, t)
        } else {
            let theta = cos_theta.clamp(-1.0, 1.0).acos();
            let sin_theta = theta.sin();
            (
                ((1.0 - t) * theta).sin() / sin_theta,
                (t * theta).sin() / sin_theta,
            )
        };

        let q = Quat::new(
            s0 * self.x + s1 * end.x,
            s0 * self.y + s1 * end.y,
            s0 * self.z + s1 * end.z,
            s0 * self.w + s1 * end.w,
        );
        q.normalized().unwrap_or(Quat::IDENTITY)
    }
}
