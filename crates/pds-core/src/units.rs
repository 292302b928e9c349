//! Unit newtypes for the quantities that flow through the conversion.
//!
//! Result series report energy per interval (GWh) and interval lengths in
//! hours; target models take average power in MW. Wrapping the raw `f64`s
//! keeps an energy value from being written where a power value belongs.
//!
//! ```
//! use pds_core::units::{GigawattHours, Hours};
//!
//! let energy = GigawattHours(50.0);
//! let power = energy.average_power(Hours(2.0));
//! assert_eq!(power.value(), 25_000.0);
//! ```

use serde::{Deserialize, Serialize};

/// MW in one GW. Dividing GWh by hours gives GW; this turns it into MW.
pub const MEGAWATTS_PER_GIGAWATT: f64 = 1000.0;

macro_rules! impl_unit {
    ($type:ty, $unit_name:literal) => {
        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
            }
        }

        impl $type {
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }
        }
    };
}

/// Interval length in hours (h)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Hours(pub f64);

impl_unit!(Hours, "h");

/// Energy delivered over one interval, in gigawatt-hours (GWh)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct GigawattHours(pub f64);

impl_unit!(GigawattHours, "GWh");

/// Average active power in megawatts (MW)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Megawatts(pub f64);

impl_unit!(Megawatts, "MW");

impl Hours {
    /// Factor turning GWh delivered over this interval into average MW.
    #[inline]
    pub fn energy_to_power_factor(self) -> f64 {
        MEGAWATTS_PER_GIGAWATT / self.0
    }

    /// A usable interval length is finite and strictly positive.
    #[inline]
    pub fn is_valid_interval(self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }
}

impl GigawattHours {
    /// Average power over an interval of `duration`.
    #[inline]
    pub fn average_power(self, duration: Hours) -> Megawatts {
        Megawatts(self.0 * duration.energy_to_power_factor())
    }
}
