//! Real central London locations for realistic test fixtures.
//!
//! Coordinates are approximate street-level positions.

/// A named address with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub address: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(address: &'static str, lat: f64, lng: f64) -> Self {
        Self { address, lat, lng }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

pub const BAKER_ST: Location = Location::new("221B Baker St, London", 51.523767, -0.158555);
pub const DOWNING_ST: Location = Location::new("10 Downing St, London", 51.503396, -0.127640);
pub const TOWER_BRIDGE: Location = Location::new("Tower Bridge Rd, London SE1 2UP", 51.505456, -0.075356);
pub const BRITISH_MUSEUM: Location = Location::new("Great Russell St, London WC1B 3DG", 51.519413, -0.126957);
pub const KINGS_CROSS: Location = Location::new("Euston Rd, London N1C 4QP", 51.530975, -0.123796);
pub const GREENWICH: Location = Location::new("Blackheath Ave, London SE10 8XJ", 51.476852, -0.000500);

pub const ALL: &[Location] = &[
    BAKER_ST,
    DOWNING_ST,
    TOWER_BRIDGE,
    BRITISH_MUSEUM,
    KINGS_CROSS,
    GREENWICH,
];
