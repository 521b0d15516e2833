//! Daylight gating.
//!
//! A location counts as "in daylight" when its current local hour lies between
//! the local sunrise hour and the local sunset hour, both ends inclusive.
//! Comparison is by whole hours only: 05:10 with a 05:42 sunrise is daylight.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use tzf_rs::DefaultFinder;

use crate::error::{RaincamError, Result};

// Official zenith for sunrise/sunset, accounting for refraction and the solar disc.
const ZENITH: f64 = 90.833;

pub trait DaylightGate {
    fn is_daylight(&self, lat: f64, lon: f64, now: DateTime<Utc>) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SunTimes {
    Daily {
        sunrise: DateTime<Utc>,
        sunset: DateTime<Utc>,
    },
    /// The sun never sets on this date.
    PolarDay,
    /// The sun never rises on this date.
    PolarNight,
}

/// Sunrise/sunset from the coordinate's own timezone.
pub struct SolarDaylight {
    finder: DefaultFinder,
}

impl SolarDaylight {
    pub fn new() -> Self {
        SolarDaylight {
            finder: DefaultFinder::new(),
        }
    }

    pub fn timezone(&self, lat: f64, lon: f64) -> Result<Tz> {
        let name = self.finder.get_tz_name(lon, lat);
        if name.is_empty() {
            return Err(RaincamError::Timezone {
                lat,
                lon,
                reason: "no timezone at coordinate".to_string(),
            });
        }

        name.parse::<Tz>().map_err(|_| RaincamError::Timezone {
            lat,
            lon,
            reason: format!("unknown timezone '{}'", name),
        })
    }
}

impl Default for SolarDaylight {
    fn default() -> Self {
        Self::new()
    }
}

impl DaylightGate for SolarDaylight {
    fn is_daylight(&self, lat: f64, lon: f64, now: DateTime<Utc>) -> Result<bool> {
        let tz = self.timezone(lat, lon)?;
        Ok(is_daylight_in(tz, lat, lon, now))
    }
}

pub fn is_daylight_in<T: TimeZone>(tz: T, lat: f64, lon: f64, now: DateTime<Utc>) -> bool {
    let local = now.with_timezone(&tz);

    match sun_times(local.date_naive(), lat, lon) {
        SunTimes::PolarDay => true,
        SunTimes::PolarNight => false,
        SunTimes::Daily { sunrise, sunset } => {
            let hour = local.hour();
            let sunrise_hour = sunrise.with_timezone(&tz).hour();
            let sunset_hour = sunset.with_timezone(&tz).hour();

            // Sunset after local midnight wraps past the day's end
            if sunset_hour < sunrise_hour {
                hour >= sunrise_hour || hour <= sunset_hour
            } else {
                hour >= sunrise_hour && hour <= sunset_hour
            }
        }
    }
}

/// Sunrise and sunset for a calendar date, using the sunrise equation from
/// the Almanac for Computers (accurate to a couple of minutes).
pub fn sun_times(date: NaiveDate, lat: f64, lon: f64) -> SunTimes {
    let rise = solar_event(date, lat, lon, true);
    let set = solar_event(date, lat, lon, false);

    match (rise, set) {
        (Event::At(sunrise), Event::At(sunset)) => SunTimes::Daily {
            sunrise: at_hours(date, sunrise),
            sunset: at_hours(date, sunset),
        },
        (Event::NeverSets, _) | (_, Event::NeverSets) => SunTimes::PolarDay,
        _ => SunTimes::PolarNight,
    }
}

enum Event {
    /// UTC hours after midnight of the requested date.
    At(f64),
    NeverRises,
    NeverSets,
}

fn solar_event(date: NaiveDate, lat: f64, lon: f64, rising: bool) -> Event {
    let day_of_year = date.ordinal() as f64;
    let lng_hour = lon / 15.0;

    let t = if rising {
        day_of_year + (6.0 - lng_hour) / 24.0
    } else {
        day_of_year + (18.0 - lng_hour) / 24.0
    };

    // Sun's mean anomaly and true longitude
    let m = 0.9856 * t - 3.289;
    let l = normalise(m + 1.916 * sin(m) + 0.020 * sin(2.0 * m) + 282.634, 360.0);

    // Right ascension, in the same quadrant as L, in hours
    let mut ra = normalise(atan(0.91764 * tan(l)), 360.0);
    ra += (l / 90.0).floor() * 90.0 - (ra / 90.0).floor() * 90.0;
    ra /= 15.0;

    let sin_dec = 0.39782 * sin(l);
    let cos_dec = asin(sin_dec).to_radians().cos();

    let cos_h = (cos(ZENITH) - sin_dec * sin(lat)) / (cos_dec * cos(lat));
    if cos_h > 1.0 {
        return Event::NeverRises;
    }
    if cos_h < -1.0 {
        return Event::NeverSets;
    }

    let h = if rising {
        360.0 - acos(cos_h)
    } else {
        acos(cos_h)
    } / 15.0;

    let local_mean_time = h + ra - 0.06571 * t - 6.622;

    Event::At(normalise(local_mean_time - lng_hour, 24.0))
}

fn at_hours(date: NaiveDate, hours: f64) -> DateTime<Utc> {
    let midnight = Utc.from_utc_datetime(&date.and_time(NaiveTime::default()));
    midnight + Duration::seconds((hours * 3600.0).round() as i64)
}

fn normalise(value: f64, range: f64) -> f64 {
    value.rem_euclid(range)
}

fn sin(deg: f64) -> f64 {
    deg.to_radians().sin()
}

fn cos(deg: f64) -> f64 {
    deg.to_radians().cos()
}

fn tan(deg: f64) -> f64 {
    deg.to_radians().tan()
}

fn asin(x: f64) -> f64 {
    x.asin().to_degrees()
}

fn acos(x: f64) -> f64 {
    x.acos().to_degrees()
}

fn atan(x: f64) -> f64 {
    x.atan().to_degrees()
}

// -- Tests -------------------------------------------------------------------
