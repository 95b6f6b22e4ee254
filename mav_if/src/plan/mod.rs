//! # Mission plan document
//!
//! Deterministic builder for the waypoint plan file consumed by the ground
//! control software. The document schema - field names, nesting, and the
//! seven-element item parameter vector - must match the consumer's parser
//! exactly, so the structs here fix the field order and the serialisation of
//! every value. Identical input always serialises to identical bytes.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Magnitude limit of a valid latitude, in degrees.
const LAT_LIMIT_DEG: f64 = 90.0;

/// Magnitude limit of a valid longitude, in degrees.
const LON_LIMIT_DEG: f64 = 180.0;

/// Item `command` id of a simple navigation waypoint.
const ITEM_COMMAND_NAV_WAYPOINT: u32 = 16;

/// Item `frame` id of the global relative-altitude frame.
const ITEM_FRAME_GLOBAL_RELATIVE_ALT: u32 = 3;

/// Item altitude mode: altitude relative to the home position.
const ITEM_ALTITUDE_MODE_RELATIVE: u32 = 1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A geographic mission waypoint.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Latitude in degrees
    pub lat_deg: f64,

    /// Longitude in degrees
    pub lon_deg: f64,

    /// Altitude in metres above the home position
    pub alt_m: f64,
}

/// Plan profile: the vehicle identification and speeds written into the
/// document, plus the altitude assigned to waypoints that don't carry one.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanProfile {
    /// Cruise speed written into the document, metres/second
    pub cruise_speed_ms: f64,

    /// Hover speed written into the document, metres/second
    pub hover_speed_ms: f64,

    /// Firmware type id of the target autopilot
    pub firmware_type: u32,

    /// Vehicle type id
    pub vehicle_type: u32,

    /// Default waypoint altitude, metres
    pub default_alt_m: f64,
}

/// The persisted mission plan document.
///
/// Field order matters: the consumer's parser is fed these names and this
/// nesting, and the order here is the order they serialise in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionPlan {
    file_type: &'static str,
    version: u32,
    ground_station: &'static str,
    geo_fence: GeoFence,
    rally_points: RallyPoints,
    mission: Mission,
}

#[derive(Debug, Clone, Serialize)]
struct GeoFence {
    circles: Vec<serde_json::Value>,
    polygons: Vec<serde_json::Value>,
    version: u32,
}

#[derive(Debug, Clone, Serialize)]
struct RallyPoints {
    points: Vec<serde_json::Value>,
    version: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Mission {
    cruise_speed: f64,
    firmware_type: u32,
    hover_speed: f64,
    items: Vec<MissionItem>,
    planned_home_position: [f64; 3],
    vehicle_type: u32,
    version: u32,
}

#[derive(Debug, Clone, Serialize)]
struct MissionItem {
    #[serde(rename = "AMSLAltAboveTerrain")]
    amsl_alt_above_terrain: Option<f64>,

    #[serde(rename = "Altitude")]
    altitude: f64,

    #[serde(rename = "AltitudeMode")]
    altitude_mode: u32,

    #[serde(rename = "autoContinue")]
    auto_continue: bool,

    command: u32,

    #[serde(rename = "doJumpId")]
    do_jump_id: u32,

    frame: u32,

    params: ItemParams,

    #[serde(rename = "type")]
    item_type: &'static str,
}

/// The seven-element item parameter vector: `[0, 0, 0, null, lat, lon, alt]`.
#[derive(Debug, Copy, Clone)]
struct ItemParams {
    lat_deg: f64,
    lon_deg: f64,
    alt_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors raised while building or persisting a mission plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("The mission contains no waypoints")]
    EmptyMission,

    #[error("Waypoint {index} is not a usable coordinate: ({lat_deg}, {lon_deg})")]
    InvalidWaypoint {
        index: usize,
        lat_deg: f64,
        lon_deg: f64,
    },

    #[error("Malformed waypoint input: {0}")]
    MalformedInput(String),

    #[error("Cannot serialise the plan document: {0}")]
    SerialiseError(serde_json::Error),

    #[error("Cannot write the plan file: {0}")]
    WriteError(std::io::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build a mission plan document from an ordered waypoint sequence.
///
/// The sequence order is the mission execution order. The first waypoint also
/// becomes the document's planned home position - a duplication the consumer's
/// format requires.
///
/// All waypoints are validated before any part of the document is built, so a
/// failed build produces nothing.
pub fn build(waypoints: &[Waypoint], profile: &PlanProfile) -> Result<MissionPlan, PlanError> {
    let home = match waypoints.first() {
        Some(wp) => *wp,
        None => return Err(PlanError::EmptyMission),
    };

    for (index, wp) in waypoints.iter().enumerate() {
        if !wp.is_valid() {
            return Err(PlanError::InvalidWaypoint {
                index,
                lat_deg: wp.lat_deg,
                lon_deg: wp.lon_deg,
            });
        }
    }

    let items = waypoints
        .iter()
        .enumerate()
        .map(|(i, wp)| MissionItem {
            amsl_alt_above_terrain: None,
            altitude: wp.alt_m,
            altitude_mode: ITEM_ALTITUDE_MODE_RELATIVE,
            auto_continue: true,
            command: ITEM_COMMAND_NAV_WAYPOINT,
            do_jump_id: (i + 1) as u32,
            frame: ITEM_FRAME_GLOBAL_RELATIVE_ALT,
            params: ItemParams {
                lat_deg: wp.lat_deg,
                lon_deg: wp.lon_deg,
                alt_m: wp.alt_m,
            },
            item_type: "SimpleItem",
        })
        .collect();

    Ok(MissionPlan {
        file_type: "Plan",
        version: 1,
        ground_station: "QGroundControl",
        geo_fence: GeoFence {
            circles: Vec::new(),
            polygons: Vec::new(),
            version: 2,
        },
        rally_points: RallyPoints {
            points: Vec::new(),
            version: 2,
        },
        mission: Mission {
            cruise_speed: profile.cruise_speed_ms,
            firmware_type: profile.firmware_type,
            hover_speed: profile.hover_speed_ms,
            items,
            planned_home_position: [home.lat_deg, home.lon_deg, home.alt_m],
            vehicle_type: profile.vehicle_type,
            version: 2,
        },
    })
}

/// Read waypoints from a CSV file.
///
/// The header must contain a latitude and a longitude column (matched
/// case-insensitively, so `latitude` and `Latitude` both pair). Rows are
/// taken in file order and assigned the given default altitude.
pub fn waypoints_from_csv<P: AsRef<Path>>(
    path: P,
    default_alt_m: f64,
) -> Result<Vec<Waypoint>, PlanError> {
    let mut reader =
        csv::Reader::from_path(path).map_err(|e| PlanError::MalformedInput(e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| PlanError::MalformedInput(e.to_string()))?
        .clone();

    let lat_col = find_column(&headers, "latitude")
        .ok_or_else(|| PlanError::MalformedInput(String::from("no latitude column in header")))?;
    let lon_col = find_column(&headers, "longitude")
        .ok_or_else(|| PlanError::MalformedInput(String::from("no longitude column in header")))?;

    let mut waypoints = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| PlanError::MalformedInput(e.to_string()))?;

        let lat_deg = parse_coord(&record, lat_col, row)?;
        let lon_deg = parse_coord(&record, lon_col, row)?;

        waypoints.push(Waypoint {
            lat_deg,
            lon_deg,
            alt_m: default_alt_m,
        });
    }

    Ok(waypoints)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Find a header column by case-insensitive name.
fn find_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

/// Parse one coordinate field out of a record.
fn parse_coord(record: &csv::StringRecord, col: usize, row: usize) -> Result<f64, PlanError> {
    let field = record
        .get(col)
        .ok_or_else(|| PlanError::MalformedInput(format!("row {} is missing a coordinate", row)))?;

    field.trim().parse().map_err(|_| {
        PlanError::MalformedInput(format!("row {}: {:?} is not a coordinate", row, field))
    })
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoint {
    /// True if all coordinates are finite and within range.
    pub fn is_valid(&self) -> bool {
        self.lat_deg.is_finite()
            && self.lon_deg.is_finite()
            && self.alt_m.is_finite()
            && self.lat_deg.abs() <= LAT_LIMIT_DEG
            && self.lon_deg.abs() <= LON_LIMIT_DEG
    }
}

impl Default for PlanProfile {
    /// The surface vessel profile.
    fn default() -> Self {
        Self {
            cruise_speed_ms: 1.5,
            hover_speed_ms: 3.0,
            firmware_type: 3,
            vehicle_type: 2,
            default_alt_m: 2.0,
        }
    }
}

impl MissionPlan {
    /// Number of mission items in the document.
    pub fn num_items(&self) -> usize {
        self.mission.items.len()
    }

    /// The planned home position as `[lat, lon, alt]`.
    pub fn planned_home_position(&self) -> [f64; 3] {
        self.mission.planned_home_position
    }

    /// Serialise the document to its canonical JSON form.
    pub fn to_json(&self) -> Result<String, PlanError> {
        serde_json::to_string_pretty(self).map_err(PlanError::SerialiseError)
    }

    /// Write the document to the given path.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PlanError> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(PlanError::WriteError)
    }
}

impl Serialize for ItemParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(7))?;
        seq.serialize_element(&0)?;
        seq.serialize_element(&0)?;
        seq.serialize_element(&0)?;
        seq.serialize_element(&Option::<f64>::None)?;
        seq.serialize_element(&self.lat_deg)?;
        seq.serialize_element(&self.lon_deg)?;
        seq.serialize_element(&self.alt_m)?;
        seq.end()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn wp(lat_deg: f64, lon_deg: f64) -> Waypoint {
        Waypoint {
            lat_deg,
            lon_deg,
            alt_m: 2.0,
        }
    }

    #[test]
    fn test_empty_mission_rejected() {
        match build(&[], &PlanProfile::default()) {
            Err(PlanError::EmptyMission) => (),
            other => panic!("Expected EmptyMission, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_single_waypoint_home_and_jump_id() {
        let plan = build(&[wp(51.002, -1.4)], &PlanProfile::default()).unwrap();

        assert_eq!(plan.num_items(), 1);
        assert_eq!(plan.planned_home_position(), [51.002, -1.4, 2.0]);
        assert_eq!(plan.mission.items[0].do_jump_id, 1);
    }

    #[test]
    fn test_items_in_input_order() {
        let wps = [wp(51.0, -1.0), wp(51.1, -1.1), wp(51.2, -1.2)];
        let plan = build(&wps, &PlanProfile::default()).unwrap();

        assert_eq!(plan.num_items(), 3);
        for (i, item) in plan.mission.items.iter().enumerate() {
            assert_eq!(item.do_jump_id, (i + 1) as u32);
            assert_eq!(item.params.lat_deg, wps[i].lat_deg);
            assert_eq!(item.params.lon_deg, wps[i].lon_deg);
        }

        // Home is the first waypoint, not any later one
        assert_eq!(plan.planned_home_position(), [51.0, -1.0, 2.0]);
    }

    #[test]
    fn test_out_of_range_waypoint_rejected() {
        let wps = [wp(51.0, -1.0), wp(91.0, -1.0)];
        match build(&wps, &PlanProfile::default()) {
            Err(PlanError::InvalidWaypoint { index: 1, .. }) => (),
            other => panic!("Expected InvalidWaypoint, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_non_finite_waypoint_rejected() {
        let wps = [wp(f64::NAN, -1.0)];
        assert!(build(&wps, &PlanProfile::default()).is_err());
    }

    #[test]
    fn test_document_schema() {
        let plan = build(&[wp(51.002, -1.4)], &PlanProfile::default()).unwrap();
        let json = plan.to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["fileType"], "Plan");
        assert_eq!(value["version"], 1);
        assert_eq!(value["groundStation"], "QGroundControl");
        assert_eq!(value["geoFence"]["version"], 2);
        assert_eq!(value["rallyPoints"]["version"], 2);
        assert_eq!(value["mission"]["cruiseSpeed"], 1.5);
        assert_eq!(value["mission"]["firmwareType"], 3);
        assert_eq!(value["mission"]["vehicleType"], 2);
        assert_eq!(value["mission"]["version"], 2);

        let item = &value["mission"]["items"][0];
        assert_eq!(item["type"], "SimpleItem");
        assert_eq!(item["command"], 16);
        assert_eq!(item["frame"], 3);
        assert_eq!(item["AltitudeMode"], 1);
        assert_eq!(item["autoContinue"], true);
        assert!(item["AMSLAltAboveTerrain"].is_null());

        // params is [0, 0, 0, null, lat, lon, alt]
        let params = item["params"].as_array().unwrap();
        assert_eq!(params.len(), 7);
        assert_eq!(params[0], 0);
        assert!(params[3].is_null());
        assert_eq!(params[4], 51.002);
        assert_eq!(params[5], -1.4);
        assert_eq!(params[6], 2.0);

        let home = value["mission"]["plannedHomePosition"].as_array().unwrap();
        assert_eq!(home.len(), 3);
        assert_eq!(home[0], 51.002);
    }

    #[test]
    fn test_serialisation_is_deterministic() {
        let wps = [wp(51.0, -1.0), wp(51.1, -1.1)];
        let a = build(&wps, &PlanProfile::default()).unwrap();
        let b = build(&wps, &PlanProfile::default()).unwrap();

        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }

    #[test]
    fn test_csv_round_trip() {
        let path = std::env::temp_dir().join("njord_plan_test_waypoints.csv");
        std::fs::write(&path, "Latitude,Longitude\n51.0,-1.0\n51.1,-1.1\n51.2,-1.2\n").unwrap();

        let wps = waypoints_from_csv(&path, 2.0).unwrap();
        assert_eq!(wps.len(), 3);
        assert_eq!(wps[0], wp(51.0, -1.0));
        assert_eq!(wps[2], wp(51.2, -1.2));

        let plan = build(&wps, &PlanProfile::default()).unwrap();
        assert_eq!(plan.num_items(), 3);
        assert_eq!(plan.planned_home_position(), [51.0, -1.0, 2.0]);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_csv_missing_column_rejected() {
        let path = std::env::temp_dir().join("njord_plan_test_bad_header.csv");
        std::fs::write(&path, "lat,Longitude\n51.0,-1.0\n").unwrap();

        match waypoints_from_csv(&path, 2.0) {
            Err(PlanError::MalformedInput(_)) => (),
            other => panic!("Expected MalformedInput, got {:?}", other),
        }

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_csv_unparseable_row_rejected() {
        let path = std::env::temp_dir().join("njord_plan_test_bad_row.csv");
        std::fs::write(&path, "latitude,longitude\n51.0,not-a-number\n").unwrap();

        assert!(waypoints_from_csv(&path, 2.0).is_err());

        std::fs::remove_file(path).ok();
    }
}
