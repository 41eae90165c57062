//! Static hazard catalog
//!
//! One entry per pool: the attestation sources that can confirm the peril
//! index, the confirmations required for consensus, and the historical
//! series the pricing engine runs on. Perils with archival feeds carry a
//! digitized observation series; the rest carry a parameterized curve that
//! is synthesized deterministically and flagged as simulated.

use std::collections::HashMap;

use lazy_static::lazy_static;
use parapet_common::{
    AttestationKind, AttestationSourceConfig, BasisRisk, HazardEvent, HazardHistory, PoolType,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Regional peak magnitudes, Mw, digitized from the USGS ComCat regional
/// extract bundled with the product.
const EARTHQUAKE_SERIES: &[(u16, f64)] = &[
    (1994, 5.6),
    (1995, 6.9),
    (1996, 4.9),
    (1997, 5.1),
    (1999, 6.0),
    (2000, 5.4),
    (2001, 4.7),
    (2003, 5.8),
    (2004, 6.6),
    (2005, 5.2),
    (2007, 5.0),
    (2008, 6.2),
    (2009, 4.8),
    (2011, 7.1),
    (2012, 5.3),
    (2014, 5.5),
    (2015, 5.9),
    (2016, 6.4),
    (2018, 5.1),
    (2019, 4.9),
    (2020, 5.7),
    (2021, 6.1),
    (2022, 5.0),
    (2023, 5.4),
];

/// Annual peak gauge heights, meters, digitized from NOAA NWPS records.
const FLOOD_SERIES: &[(u16, f64)] = &[
    (2004, 2.1),
    (2005, 3.4),
    (2006, 1.8),
    (2007, 4.6),
    (2008, 2.3),
    (2009, 1.9),
    (2010, 3.8),
    (2011, 5.2),
    (2012, 2.7),
    (2013, 4.1),
    (2014, 2.0),
    (2015, 3.1),
    (2016, 4.8),
    (2017, 2.5),
    (2018, 3.6),
    (2019, 5.0),
    (2020, 2.9),
    (2021, 4.3),
    (2022, 2.2),
    (2023, 3.9),
];

/// Annual peak sustained winds, km/h, digitized from NOAA HURDAT2.
const HURRICANE_SERIES: &[(u16, f64)] = &[
    (1994, 120.0),
    (1995, 175.0),
    (1996, 140.0),
    (1997, 105.0),
    (1998, 230.0),
    (1999, 195.0),
    (2000, 110.0),
    (2001, 150.0),
    (2002, 135.0),
    (2003, 185.0),
    (2004, 240.0),
    (2005, 280.0),
    (2006, 95.0),
    (2007, 165.0),
    (2008, 210.0),
    (2009, 100.0),
    (2010, 155.0),
    (2011, 175.0),
    (2012, 185.0),
    (2013, 90.0),
    (2014, 130.0),
    (2015, 165.0),
    (2016, 220.0),
    (2017, 285.0),
    (2018, 250.0),
    (2019, 295.0),
    (2020, 240.0),
    (2021, 190.0),
    (2022, 215.0),
    (2023, 205.0),
];

/// Where a pool's pricing history comes from.
#[derive(Debug, Clone)]
pub enum HistorySpec {
    /// Digitized archival series shipped with the catalog
    Observed {
        source: &'static str,
        range_label: &'static str,
        years: u32,
        series: &'static [(u16, f64)],
    },

    /// Parameterized frequency/severity curve, synthesized on demand
    Curve {
        source: &'static str,
        years: u32,
        /// Probability of an event year
        annual_event_rate: f64,
        /// Index value of the smallest event
        base_value: f64,
        /// Uniform spread above `base_value`
        spread: f64,
        /// Seed for the deterministic synthesis
        seed: u64,
    },
}

impl HistorySpec {
    /// Build the concrete series. Curve specs synthesize the same series
    /// on every call.
    pub fn materialize(&self, pool_type: PoolType) -> HazardHistory {
        match self {
            HistorySpec::Observed {
                source,
                range_label,
                years,
                series,
            } => HazardHistory {
                pool_type,
                events: series
                    .iter()
                    .map(|&(year, value)| HazardEvent { year, value })
                    .collect(),
                years_of_data: *years,
                source: (*source).to_string(),
                range_label: (*range_label).to_string(),
                is_simulated: false,
            },
            HistorySpec::Curve {
                source,
                years,
                annual_event_rate,
                base_value,
                spread,
                seed,
            } => {
                let mut rng = SmallRng::seed_from_u64(*seed);
                let start_year = 2024 - *years as u16;
                let mut events = Vec::new();
                for offset in 0..*years {
                    let roll: f64 = rng.gen();
                    let magnitude: f64 = rng.gen();
                    if roll < *annual_event_rate {
                        events.push(HazardEvent {
                            year: start_year + offset as u16,
                            value: base_value + magnitude * spread,
                        });
                    }
                }
                HazardHistory {
                    pool_type,
                    events,
                    years_of_data: *years,
                    source: (*source).to_string(),
                    range_label: format!("{}-2023 (synthetic)", start_year),
                    is_simulated: true,
                }
            }
        }
    }
}

/// Everything the engine knows about one pool.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub pool_type: PoolType,

    /// Confirmations needed before a payout may settle
    pub consensus_required: usize,

    /// Independent sources able to attest this peril
    pub sources: Vec<AttestationSourceConfig>,

    /// How this pool's pricing history is obtained
    pub history: HistorySpec,
}

impl CatalogEntry {
    pub fn history(&self) -> HazardHistory {
        self.history.materialize(self.pool_type)
    }

    pub fn basis_risk(&self) -> BasisRisk {
        BasisRisk::from_source_count(self.sources.len())
    }
}

/// The full per-pool configuration set.
pub struct HazardCatalog {
    entries: HashMap<PoolType, CatalogEntry>,
}

impl HazardCatalog {
    /// Process-wide catalog.
    pub fn global() -> &'static HazardCatalog {
        &CATALOG
    }

    pub fn entry(&self, pool_type: PoolType) -> Option<&CatalogEntry> {
        self.entries.get(&pool_type)
    }

    pub fn pools(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    fn build_default() -> Self {
        let mut entries = HashMap::new();

        entries.insert(
            PoolType::Earthquake,
            CatalogEntry {
                pool_type: PoolType::Earthquake,
                consensus_required: 2,
                sources: vec![
                    AttestationSourceConfig::new(
                        "usgs-fdsn",
                        "https://earthquake.usgs.gov/fdsnws/event/1/query?format=geojson&latitude={lat}&longitude={lng}&maxradiuskm=300&orderby=magnitude&limit=1",
                        "/features/0/properties/mag",
                        AttestationKind::JsonApi,
                    ),
                    AttestationSourceConfig::new(
                        "emsc-seismicportal",
                        "https://www.seismicportal.eu/fdsnws/event/1/query?format=json&lat={lat}&lon={lng}&maxradius=3&limit=1",
                        "/features/0/properties/mag",
                        AttestationKind::JsonApi,
                    ),
                    AttestationSourceConfig::new(
                        "geonet-quake",
                        "https://api.geonet.org.nz/quake?MMI=3",
                        "/features/0/properties/magnitude",
                        AttestationKind::JsonApi,
                    ),
                ],
                history: HistorySpec::Observed {
                    source: "USGS ComCat (digitized)",
                    range_label: "1994-2023",
                    years: 30,
                    series: EARTHQUAKE_SERIES,
                },
            },
        );

        entries.insert(
            PoolType::Flood,
            CatalogEntry {
                pool_type: PoolType::Flood,
                consensus_required: 2,
                sources: vec![
                    AttestationSourceConfig::new(
                        "open-meteo-flood",
                        "https://flood-api.open-meteo.com/v1/flood?latitude={lat}&longitude={lng}&daily=river_discharge",
                        "/daily/river_discharge/0",
                        AttestationKind::JsonApi,
                    ),
                    AttestationSourceConfig::new(
                        "noaa-nwps",
                        "https://api.water.noaa.gov/nwps/v1/gauges/nearest?latitude={lat}&longitude={lng}",
                        "/status/observed/primary",
                        AttestationKind::JsonApi,
                    ),
                    AttestationSourceConfig::new(
                        "ea-flood-monitoring",
                        "https://environment.data.gov.uk/flood-monitoring/id/measures?parameter=level&lat={lat}&long={lng}&dist=20",
                        "/items/0/latestReading/value",
                        AttestationKind::JsonApi,
                    ),
                ],
                history: HistorySpec::Observed {
                    source: "NOAA NWPS (digitized)",
                    range_label: "2004-2023",
                    years: 20,
                    series: FLOOD_SERIES,
                },
            },
        );

        entries.insert(
            PoolType::Hurricane,
            CatalogEntry {
                pool_type: PoolType::Hurricane,
                consensus_required: 2,
                sources: vec![
                    AttestationSourceConfig::new(
                        "open-meteo-wind",
                        "https://api.open-meteo.com/v1/forecast?latitude={lat}&longitude={lng}&current=wind_speed_10m&wind_speed_unit=kmh",
                        "/current/wind_speed_10m",
                        AttestationKind::JsonApi,
                    ),
                    AttestationSourceConfig::new(
                        "openweather",
                        "https://api.openweathermap.org/data/2.5/weather?lat={lat}&lon={lng}&units=metric",
                        "/wind/speed",
                        AttestationKind::JsonApi,
                    )
                    .with_encoding_schema("uint256:ms_x100"),
                    AttestationSourceConfig::new(
                        "nhc-current-storms",
                        "https://www.nhc.noaa.gov/CurrentStorms.json",
                        "/activeStorms/0/intensity",
                        AttestationKind::JsonApi,
                    )
                    .with_encoding_schema("uint256:knots_x100"),
                ],
                history: HistorySpec::Observed {
                    source: "NOAA HURDAT2 (digitized)",
                    range_label: "1994-2023",
                    years: 30,
                    series: HURRICANE_SERIES,
                },
            },
        );

        entries.insert(
            PoolType::Drought,
            CatalogEntry {
                pool_type: PoolType::Drought,
                consensus_required: 2,
                sources: vec![
                    AttestationSourceConfig::new(
                        "open-meteo-archive",
                        "https://archive-api.open-meteo.com/v1/archive?latitude={lat}&longitude={lng}&daily=precipitation_sum&past_days=92",
                        "/daily/precipitation_sum/0",
                        AttestationKind::JsonApi,
                    ),
                    AttestationSourceConfig::new(
                        "nasa-power",
                        "https://power.larc.nasa.gov/api/temporal/daily/point?latitude={lat}&longitude={lng}&parameters=PRECTOTCORR&community=ag&format=json",
                        "/properties/parameter/PRECTOTCORR/last",
                        AttestationKind::JsonApi,
                    ),
                ],
                history: HistorySpec::Curve {
                    source: "parametric drought model",
                    years: 10,
                    annual_event_rate: 0.45,
                    base_value: 28.0,
                    spread: 18.0,
                    seed: 0x44524f55,
                },
            },
        );

        entries.insert(
            PoolType::Wildfire,
            CatalogEntry {
                pool_type: PoolType::Wildfire,
                consensus_required: 1,
                sources: vec![AttestationSourceConfig::new(
                    "nasa-firms",
                    "https://firms.modaps.eosdis.nasa.gov/api/area?lat={lat}&lng={lng}&source=VIIRS_SNPP_NRT",
                    "/0/frp",
                    AttestationKind::SignedFeed,
                )],
                history: HistorySpec::Curve {
                    source: "parametric fire-weather model",
                    years: 10,
                    annual_event_rate: 0.6,
                    base_value: 22.0,
                    spread: 14.0,
                    seed: 0x57494c44,
                },
            },
        );

        Self { entries }
    }
}

lazy_static! {
    static ref CATALOG: HazardCatalog = HazardCatalog::build_default();
}
