//! JNI bindings for the Android app.
//!
//! Each public function here corresponds to an `external fun` declaration
//! in RustBridge.kt. The function names follow JNI naming conventions:
//! Java_<package>_<class>_<method> with dots replaced by underscores.
//!
//! The navigation engine lives behind an opaque `jlong` handle. Structured
//! data crosses the boundary as JSON; failures are logged and surface as
//! `null` / `0` / `false` on the Kotlin side.

use jni::objects::{JByteArray, JClass, JString};
use jni::sys::{jboolean, jdouble, jlong, jstring, JNI_FALSE, JNI_TRUE};
use jni::JNIEnv;
use log::{info, warn};
use serde_json::json;

use crate::alert::Alert;
use crate::config::Config;
use crate::engine::NavigationEngine;
use crate::error::{Error, Result};
use crate::geo::{now_ms, Coordinate, PositionSample};
use crate::gpx::PathSource;
use crate::guide::{spots_from_geojson, SpotGuide};
use crate::record::{RecordedRide, RideLog, TrackRecorder};
use crate::route_nav::{steps_from_points, steps_from_track, DEFAULT_TRACK_TOLERANCE_M};
use crate::steps::{steps_from_directions_json, steps_from_matching_json, RouteStep};

type Engine = NavigationEngine<Vec<Alert>>;

/// An empty string selects the defaults.
fn parse_config(config_json: &str) -> Result<Config> {
    if config_json.trim().is_empty() {
        Ok(Config::default())
    } else {
        Config::from_json(config_json)
    }
}

fn new_engine(config_json: &str) -> Result<Engine> {
    let config = parse_config(config_json)?;
    Ok(NavigationEngine::new(config.navigation, Vec::new()))
}

fn set_steps_json(engine: &mut Engine, steps_json: &str) -> Result<()> {
    let steps: Vec<RouteStep> = serde_json::from_str(steps_json)?;
    engine.set_steps(steps);
    Ok(())
}

/// Apply one fix and report the new state with the alerts it fired.
fn update_payload(engine: &mut Engine, lat: f64, lng: f64) -> Result<String> {
    engine.update_location(lat, lng);
    let alerts = std::mem::take(engine.sink_mut());
    Ok(serde_json::to_string(&json!({
        "state": engine.state(),
        "alerts": alerts,
    }))?)
}

fn state_payload(engine: &Engine) -> Result<String> {
    Ok(serde_json::to_string(&engine.state())?)
}

/// Curated routes keep every point as a turn; recorded tracks are
/// simplified first.
fn gpx_steps_json(data: &[u8]) -> Result<String> {
    let gpx = crate::gpx::parse_bytes(data)?;
    let (source, points) = gpx
        .route_coordinates()
        .ok_or_else(|| Error::InvalidData("GPX file has no route or track".into()))?;
    let steps = match source {
        PathSource::Route => steps_from_points(&points),
        PathSource::Track => steps_from_track(&points, DEFAULT_TRACK_TOLERANCE_M),
    };
    info!("GPX {:?} of {} points -> {} steps", source, points.len(), steps.len());
    Ok(serde_json::to_string(&steps)?)
}

fn directions_steps_json(response_json: &str) -> Result<String> {
    Ok(serde_json::to_string(&steps_from_directions_json(response_json)?)?)
}

fn matching_steps_json(response_json: &str) -> Result<String> {
    Ok(serde_json::to_string(&steps_from_matching_json(response_json)?)?)
}

fn new_recorder(config_json: &str) -> Result<TrackRecorder> {
    Ok(TrackRecorder::new(parse_config(config_json)?.recording))
}

fn recorder_stats_json(recorder: &TrackRecorder, now: i64) -> Result<String> {
    Ok(serde_json::to_string(&recorder.stats(now))?)
}

/// The finished ride, or `null` when nothing was being recorded.
fn recorder_stop_json(recorder: &mut TrackRecorder, name: Option<&str>, now: i64) -> Result<String> {
    Ok(serde_json::to_string(&recorder.stop(name, now))?)
}

fn ride_gpx(ride_json: &str) -> Result<String> {
    let ride: RecordedRide = serde_json::from_str(ride_json)?;
    crate::gpx::write_ride(&ride)
}

fn ride_geojson(ride_json: &str) -> Result<String> {
    let ride: RecordedRide = serde_json::from_str(ride_json)?;
    Ok(serde_json::to_string(&ride.to_geojson())?)
}

fn load_ride_log(log_json: &str, config_json: &str) -> Result<RideLog> {
    let max_rides = parse_config(config_json)?.recording.max_saved_rides;
    if log_json.trim().is_empty() {
        Ok(RideLog::new(max_rides))
    } else {
        RideLog::from_json(log_json, max_rides)
    }
}

fn ride_log_add(log_json: &str, ride_json: &str, config_json: &str) -> Result<String> {
    let mut log = load_ride_log(log_json, config_json)?;
    log.push(serde_json::from_str(ride_json)?);
    log.to_json()
}

fn ride_log_delete(log_json: &str, id: &str, config_json: &str) -> Result<String> {
    let mut log = load_ride_log(log_json, config_json)?;
    if !log.delete(id) {
        warn!("rideLogDelete: no ride with id {id}");
    }
    log.to_json()
}

fn new_guide(config_json: &str, spots_geojson: &str) -> Result<SpotGuide> {
    let config = parse_config(config_json)?;
    Ok(SpotGuide::new(config.guide, spots_from_geojson(spots_geojson)?))
}

/// The announcement to speak, or `null`.
fn guide_update_json(
    guide: &mut SpotGuide,
    lat: f64,
    lng: f64,
    now: i64,
    is_speaking: bool,
) -> Result<String> {
    let announcement = guide.update_position(&Coordinate::new(lat, lng), now, is_speaking);
    Ok(serde_json::to_string(&announcement)?)
}

fn into_handle<T>(value: T) -> jlong {
    Box::into_raw(Box::new(value)) as jlong
}

/// Borrow the value behind a handle from one of the `*Create` entries.
///
/// # Safety
/// `handle` must be 0 or a live pointer to a `T` returned by the matching
/// `*Create` entry that has not been passed to `*Destroy`, with no other
/// borrow active.
unsafe fn handle_mut<'a, T>(handle: jlong) -> Option<&'a mut T> {
    (handle as *mut T).as_mut()
}

/// # Safety
/// Same contract as `handle_mut`; the handle must not be used afterwards.
unsafe fn drop_handle<T>(handle: jlong) {
    if handle != 0 {
        drop(Box::from_raw(handle as *mut T));
    }
}

fn to_jstring(env: &mut JNIEnv, value: &str) -> jstring {
    match env.new_string(value) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            warn!("Failed to create Java string: {e}");
            std::ptr::null_mut()
        }
    }
}

fn result_to_jstring(env: &mut JNIEnv, context: &str, result: Result<String>) -> jstring {
    match result {
        Ok(json) => to_jstring(env, &json),
        Err(e) => {
            warn!("{context}: {e}");
            std::ptr::null_mut()
        }
    }
}

fn read_string(env: &mut JNIEnv, value: &JString) -> Option<String> {
    match env.get_string(value) {
        Ok(s) => Some(s.into()),
        Err(e) => {
            warn!("Failed to read Java string: {e}");
            None
        }
    }
}

fn read_optional_string(env: &mut JNIEnv, value: &JString) -> Option<String> {
    if value.is_null() {
        None
    } else {
        read_string(env, value)
    }
}

/// Returns the library version.
/// Maps to: RustBridge.version() -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_version(
    mut env: JNIEnv,
    _class: JClass,
) -> jstring {
    to_jstring(&mut env, crate::VERSION)
}

/// Routes `log` output to logcat.
/// Maps to: RustBridge.initLogging()
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_initLogging(
    _env: JNIEnv,
    _class: JClass,
) {
    #[cfg(target_os = "android")]
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Debug)
            .with_tag("ridenav"),
    );
}

/// Maps to: RustBridge.engineCreate(configJson: String) -> Long
/// Returns 0 if the configuration is invalid.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_engineCreate(
    mut env: JNIEnv,
    _class: JClass,
    config_json: JString,
) -> jlong {
    let Some(config_json) = read_string(&mut env, &config_json) else {
        return 0;
    };
    match new_engine(&config_json) {
        Ok(engine) => into_handle(engine),
        Err(e) => {
            warn!("engineCreate: {e}");
            0
        }
    }
}

/// Maps to: RustBridge.engineDestroy(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_engineDestroy(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    // SAFETY: the handle came from `engineCreate` and is destroyed once.
    unsafe { drop_handle::<Engine>(handle) }
}

/// Maps to: RustBridge.engineSetSteps(handle: Long, stepsJson: String) -> Boolean
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_engineSetSteps(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    steps_json: JString,
) -> jboolean {
    // SAFETY: see `handle_mut`.
    let Some(engine) = (unsafe { handle_mut::<Engine>(handle) }) else {
        return JNI_FALSE;
    };
    let Some(steps_json) = read_string(&mut env, &steps_json) else {
        return JNI_FALSE;
    };
    match set_steps_json(engine, &steps_json) {
        Ok(()) => JNI_TRUE,
        Err(e) => {
            warn!("engineSetSteps: {e}");
            JNI_FALSE
        }
    }
}

/// Maps to: RustBridge.engineStart(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_engineStart(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    // SAFETY: see `handle_mut`.
    if let Some(engine) = unsafe { handle_mut::<Engine>(handle) } {
        engine.start();
    }
}

/// Maps to: RustBridge.engineStop(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_engineStop(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    // SAFETY: see `handle_mut`.
    if let Some(engine) = unsafe { handle_mut::<Engine>(handle) } {
        engine.stop();
    }
}

/// Maps to: RustBridge.engineUpdate(handle: Long, lat: Double, lng: Double) -> String?
/// Returns `{"state": {...}, "alerts": [...]}`.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_engineUpdate(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    lat: jdouble,
    lng: jdouble,
) -> jstring {
    // SAFETY: see `handle_mut`.
    let Some(engine) = (unsafe { handle_mut::<Engine>(handle) }) else {
        return std::ptr::null_mut();
    };
    let result = update_payload(engine, lat, lng);
    result_to_jstring(&mut env, "engineUpdate", result)
}

/// Maps to: RustBridge.engineState(handle: Long) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_engineState(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    // SAFETY: see `handle_mut`.
    let Some(engine) = (unsafe { handle_mut::<Engine>(handle) }) else {
        return std::ptr::null_mut();
    };
    let result = state_payload(engine);
    result_to_jstring(&mut env, "engineState", result)
}

/// Maps to: RustBridge.directionsToSteps(responseJson: String) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_directionsToSteps(
    mut env: JNIEnv,
    _class: JClass,
    response_json: JString,
) -> jstring {
    let Some(response_json) = read_string(&mut env, &response_json) else {
        return std::ptr::null_mut();
    };
    let result = directions_steps_json(&response_json);
    result_to_jstring(&mut env, "directionsToSteps", result)
}

/// Maps to: RustBridge.matchingToSteps(responseJson: String) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_matchingToSteps(
    mut env: JNIEnv,
    _class: JClass,
    response_json: JString,
) -> jstring {
    let Some(response_json) = read_string(&mut env, &response_json) else {
        return std::ptr::null_mut();
    };
    let result = matching_steps_json(&response_json);
    result_to_jstring(&mut env, "matchingToSteps", result)
}

/// Maps to: RustBridge.gpxToSteps(data: ByteArray) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_gpxToSteps(
    mut env: JNIEnv,
    _class: JClass,
    data: JByteArray,
) -> jstring {
    let result = match env.convert_byte_array(&data) {
        Ok(bytes) => gpx_steps_json(&bytes),
        Err(e) => {
            warn!("gpxToSteps: {e}");
            return std::ptr::null_mut();
        }
    };
    result_to_jstring(&mut env, "gpxToSteps", result)
}

/// Maps to: RustBridge.parseGpx(data: ByteArray) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_parseGpx(
    mut env: JNIEnv,
    _class: JClass,
    data: JByteArray,
) -> jstring {
    let result = match env.convert_byte_array(&data) {
        Ok(bytes) => crate::gpx::parse_to_json(&bytes),
        Err(e) => {
            warn!("parseGpx: {e}");
            return std::ptr::null_mut();
        }
    };
    result_to_jstring(&mut env, "parseGpx", result)
}

/// Maps to: RustBridge.recorderCreate(configJson: String) -> Long
/// Returns 0 if the configuration is invalid.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_recorderCreate(
    mut env: JNIEnv,
    _class: JClass,
    config_json: JString,
) -> jlong {
    let Some(config_json) = read_string(&mut env, &config_json) else {
        return 0;
    };
    match new_recorder(&config_json) {
        Ok(recorder) => into_handle(recorder),
        Err(e) => {
            warn!("recorderCreate: {e}");
            0
        }
    }
}

/// Maps to: RustBridge.recorderDestroy(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_recorderDestroy(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    // SAFETY: the handle came from `recorderCreate` and is destroyed once.
    unsafe { drop_handle::<TrackRecorder>(handle) }
}

/// Maps to: RustBridge.recorderStart(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_recorderStart(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    // SAFETY: see `handle_mut`.
    if let Some(recorder) = unsafe { handle_mut::<TrackRecorder>(handle) } {
        recorder.start(now_ms());
    }
}

/// Maps to: RustBridge.recorderPause(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_recorderPause(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    // SAFETY: see `handle_mut`.
    if let Some(recorder) = unsafe { handle_mut::<TrackRecorder>(handle) } {
        recorder.pause(now_ms());
    }
}

/// Maps to: RustBridge.recorderResume(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_recorderResume(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    // SAFETY: see `handle_mut`.
    if let Some(recorder) = unsafe { handle_mut::<TrackRecorder>(handle) } {
        recorder.resume(now_ms());
    }
}

/// Maps to: RustBridge.recorderAddPoint(handle: Long, lat: Double, lng: Double) -> Boolean
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_recorderAddPoint(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
    lat: jdouble,
    lng: jdouble,
) -> jboolean {
    // SAFETY: see `handle_mut`.
    let Some(recorder) = (unsafe { handle_mut::<TrackRecorder>(handle) }) else {
        return JNI_FALSE;
    };
    if recorder.add_point(PositionSample::new(lat, lng, now_ms())) {
        JNI_TRUE
    } else {
        JNI_FALSE
    }
}

/// Maps to: RustBridge.recorderStats(handle: Long) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_recorderStats(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    // SAFETY: see `handle_mut`.
    let Some(recorder) = (unsafe { handle_mut::<TrackRecorder>(handle) }) else {
        return std::ptr::null_mut();
    };
    let result = recorder_stats_json(recorder, now_ms());
    result_to_jstring(&mut env, "recorderStats", result)
}

/// Maps to: RustBridge.recorderStop(handle: Long, name: String?) -> String?
/// Returns the ride JSON, or `"null"` when nothing was recorded.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_recorderStop(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    name: JString,
) -> jstring {
    // SAFETY: see `handle_mut`.
    let Some(recorder) = (unsafe { handle_mut::<TrackRecorder>(handle) }) else {
        return std::ptr::null_mut();
    };
    let name = read_optional_string(&mut env, &name);
    let result = recorder_stop_json(recorder, name.as_deref(), now_ms());
    result_to_jstring(&mut env, "recorderStop", result)
}

/// Maps to: RustBridge.writeRideGpx(rideJson: String) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_writeRideGpx(
    mut env: JNIEnv,
    _class: JClass,
    ride_json: JString,
) -> jstring {
    let Some(ride_json) = read_string(&mut env, &ride_json) else {
        return std::ptr::null_mut();
    };
    let result = ride_gpx(&ride_json);
    result_to_jstring(&mut env, "writeRideGpx", result)
}

/// Maps to: RustBridge.rideToGeoJson(rideJson: String) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_rideToGeoJson(
    mut env: JNIEnv,
    _class: JClass,
    ride_json: JString,
) -> jstring {
    let Some(ride_json) = read_string(&mut env, &ride_json) else {
        return std::ptr::null_mut();
    };
    let result = ride_geojson(&ride_json);
    result_to_jstring(&mut env, "rideToGeoJson", result)
}

/// Maps to: RustBridge.rideLogAdd(logJson: String, rideJson: String, configJson: String) -> String?
/// Returns the updated log, newest first.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_rideLogAdd(
    mut env: JNIEnv,
    _class: JClass,
    log_json: JString,
    ride_json: JString,
    config_json: JString,
) -> jstring {
    let (Some(log_json), Some(ride_json), Some(config_json)) = (
        read_string(&mut env, &log_json),
        read_string(&mut env, &ride_json),
        read_string(&mut env, &config_json),
    ) else {
        return std::ptr::null_mut();
    };
    let result = ride_log_add(&log_json, &ride_json, &config_json);
    result_to_jstring(&mut env, "rideLogAdd", result)
}

/// Maps to: RustBridge.rideLogDelete(logJson: String, id: String, configJson: String) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_rideLogDelete(
    mut env: JNIEnv,
    _class: JClass,
    log_json: JString,
    id: JString,
    config_json: JString,
) -> jstring {
    let (Some(log_json), Some(id), Some(config_json)) = (
        read_string(&mut env, &log_json),
        read_string(&mut env, &id),
        read_string(&mut env, &config_json),
    ) else {
        return std::ptr::null_mut();
    };
    let result = ride_log_delete(&log_json, &id, &config_json);
    result_to_jstring(&mut env, "rideLogDelete", result)
}

/// Maps to: RustBridge.guideCreate(configJson: String, spotsGeoJson: String) -> Long
/// The guide starts disabled. Returns 0 on invalid input.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_guideCreate(
    mut env: JNIEnv,
    _class: JClass,
    config_json: JString,
    spots_geojson: JString,
) -> jlong {
    let (Some(config_json), Some(spots_geojson)) = (
        read_string(&mut env, &config_json),
        read_string(&mut env, &spots_geojson),
    ) else {
        return 0;
    };
    match new_guide(&config_json, &spots_geojson) {
        Ok(guide) => into_handle(guide),
        Err(e) => {
            warn!("guideCreate: {e}");
            0
        }
    }
}

/// Maps to: RustBridge.guideDestroy(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_guideDestroy(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    // SAFETY: the handle came from `guideCreate` and is destroyed once.
    unsafe { drop_handle::<SpotGuide>(handle) }
}

/// Maps to: RustBridge.guideSetEnabled(handle: Long, enabled: Boolean)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_guideSetEnabled(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
    enabled: jboolean,
) {
    // SAFETY: see `handle_mut`.
    if let Some(guide) = unsafe { handle_mut::<SpotGuide>(handle) } {
        guide.set_enabled(enabled != JNI_FALSE);
    }
}

/// Maps to: RustBridge.guideToggle(handle: Long) -> Boolean
/// Returns the new enabled state.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_guideToggle(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jboolean {
    // SAFETY: see `handle_mut`.
    match unsafe { handle_mut::<SpotGuide>(handle) } {
        Some(guide) => {
            if guide.toggle() {
                JNI_TRUE
            } else {
                JNI_FALSE
            }
        }
        None => JNI_FALSE,
    }
}

/// Maps to: RustBridge.guideResetAnnouncements(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_guideResetAnnouncements(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    // SAFETY: see `handle_mut`.
    if let Some(guide) = unsafe { handle_mut::<SpotGuide>(handle) } {
        guide.reset_announcements();
    }
}

/// Maps to: RustBridge.guideUpdate(handle: Long, lat: Double, lng: Double, isSpeaking: Boolean) -> String?
/// Returns the announcement JSON, or `"null"` when there is nothing to say.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ridenav_app_RustBridge_guideUpdate(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    lat: jdouble,
    lng: jdouble,
    is_speaking: jboolean,
) -> jstring {
    // SAFETY: see `handle_mut`.
    let Some(guide) = (unsafe { handle_mut::<SpotGuide>(handle) }) else {
        return std::ptr::null_mut();
    };
    let result = guide_update_json(guide, lat, lng, now_ms(), is_speaking != JNI_FALSE);
    result_to_jstring(&mut env, "guideUpdate", result)
}
