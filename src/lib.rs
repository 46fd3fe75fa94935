pub mod alert;
pub mod android_jni;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod geo;
pub mod gpx;
pub mod guide;
pub mod locate;
pub mod record;
pub mod route_nav;
pub mod speed;
pub mod steps;

pub use alert::{Alert, AlertSink};
pub use config::Config;
pub use engine::{NavigationEngine, NavigationState};
pub use error::{Error, Result};
pub use geo::{Coordinate, PositionSample};
pub use steps::RouteStep;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
