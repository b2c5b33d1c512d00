//! Route domain types: waypoints, validated paths and the consecutive pairs
//! sent to the distance provider.

use crate::error::{Result, WaypointError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Fewest waypoints a route may have (start and drop-off).
pub const MIN_WAYPOINTS: usize = 2;

/// Most waypoints a route may have.
pub const MAX_WAYPOINTS: usize = 25;

pub(crate) const MSG_TOO_SHORT: &str = "Route start & dropoff required";
pub(crate) const MSG_TOO_LONG: &str =
    "Max dropoff location is 25 (the limit can increased as required)";
pub(crate) const MSG_BAD_POINT: &str = "Incorrect latitude longitude";

// ═══════════════════════════════════════════════════════════════════════════════
// RoutePoint
// ═══════════════════════════════════════════════════════════════════════════════

/// A waypoint as submitted: latitude and longitude kept as the caller's strings.
///
/// Serializes as a two-element array, `["lat", "lng"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutePoint {
    pub latitude: String,
    pub longitude: String,
}

impl RoutePoint {
    pub fn new(latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self {
            latitude: latitude.into(),
            longitude: longitude.into(),
        }
    }
}

impl fmt::Display for RoutePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

impl Serialize for RoutePoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        (&self.latitude, &self.longitude).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RoutePoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (latitude, longitude) = <(String, String)>::deserialize(deserializer)?;
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl TryFrom<Vec<String>> for RoutePoint {
    type Error = WaypointError;

    fn try_from(fields: Vec<String>) -> Result<Self> {
        let [latitude, longitude]: [String; 2] = fields
            .try_into()
            .map_err(|_| WaypointError::validation(MSG_BAD_POINT))?;
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RoutePath
// ═══════════════════════════════════════════════════════════════════════════════

/// An ordered route of [`MIN_WAYPOINTS`]..=[`MAX_WAYPOINTS`] points.
///
/// The only way to build one is through validation, so every `RoutePath` in
/// the system is known to have a legal length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoutePath(Vec<RoutePoint>);

impl RoutePath {
    /// Validate a list of points.
    pub fn new(points: Vec<RoutePoint>) -> Result<Self> {
        check_len(points.len())?;
        Ok(Self(points))
    }

    pub fn points(&self) -> &[RoutePoint] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept alongside `len` for clippy.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The `n - 1` consecutive legs of the route, in order.
    pub fn pairs(&self) -> Vec<WaypointPair> {
        self.0
            .windows(2)
            .map(|w| WaypointPair {
                origin: w[0].clone(),
                destination: w[1].clone(),
            })
            .collect()
    }

    /// JSON text stored alongside the job.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }
}

impl TryFrom<Vec<Vec<String>>> for RoutePath {
    type Error = WaypointError;

    /// Length is checked before point shape, matching the order callers see errors in.
    fn try_from(raw: Vec<Vec<String>>) -> Result<Self> {
        check_len(raw.len())?;
        let points = raw
            .into_iter()
            .map(RoutePoint::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self(points))
    }
}

impl<'de> Deserialize<'de> for RoutePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let points = Vec::<RoutePoint>::deserialize(deserializer)?;
        RoutePath::new(points).map_err(|e| serde::de::Error::custom(e.user_message()))
    }
}

fn check_len(len: usize) -> Result<()> {
    if len < MIN_WAYPOINTS {
        return Err(WaypointError::validation(MSG_TOO_SHORT));
    }
    if len > MAX_WAYPOINTS {
        return Err(WaypointError::validation(MSG_TOO_LONG));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// WaypointPair
// ═══════════════════════════════════════════════════════════════════════════════

/// One leg of a route: `path[i]` to `path[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaypointPair {
    pub origin: RoutePoint,
    pub destination: RoutePoint,
}
