/// Raw variable names (ERA5 short names)
pub const VAR_TEMPERATURE: &str = "t2m";
pub const VAR_DEWPOINT: &str = "d2m";
pub const VAR_PRECIPITATION: &str = "tp";
pub const VAR_TEMPERATURE_MAX: &str = "mx2t";
pub const VAR_TEMPERATURE_MIN: &str = "mn2t";

/// Derived layer names
pub const VAR_TEMPERATURE_CELSIUS: &str = "t2m_celsius";
pub const VAR_TEMPERATURE_MAX_CELSIUS: &str = "mx2t_celsius";
pub const VAR_TEMPERATURE_MIN_CELSIUS: &str = "mn2t_celsius";
pub const VAR_TEMP_SUITABILITY: &str = "temp_suitability";
pub const VAR_GROWING_DEGREE_DAYS: &str = "growing_degree_days";
pub const VAR_RELATIVE_HUMIDITY: &str = "relative_humidity";
pub const VAR_HUMIDITY_RISK: &str = "humidity_risk";
pub const VAR_PRECIPITATION_MM: &str = "tp_mm";
pub const VAR_PRECIP_RISK: &str = "precip_risk";
pub const INDEX_MALARIA_RISK: &str = "malaria_risk_index";

/// Coordinate column names in the long-format grid files
pub const COL_TIME: &str = "time";
pub const COL_LATITUDE: &str = "latitude";
pub const COL_LONGITUDE: &str = "longitude";

/// Arrow field metadata key carrying a variable's units
pub const UNITS_METADATA_KEY: &str = "units";

/// Units
pub const UNITS_KELVIN: &str = "K";
pub const UNITS_CELSIUS: &str = "degC";
pub const UNITS_METRES: &str = "m";
pub const UNITS_MILLIMETRES: &str = "mm";
pub const UNITS_PERCENT: &str = "%";
pub const UNITS_DIMENSIONLESS: &str = "1";
pub const UNITS_DEGREE_DAYS: &str = "degC day";

/// Physical constants
pub const KELVIN_OFFSET: f64 = 273.15;
pub const METRES_TO_MM: f64 = 1000.0;

/// Magnus saturation vapour pressure coefficients (hPa, degC)
pub const MAGNUS_E0: f64 = 6.112;
pub const MAGNUS_A: f64 = 17.67;
pub const MAGNUS_B: f64 = 243.5;

/// Precipitation risk calibration
pub const PRECIP_FLOOR_RISK: f64 = 0.1;
pub const PRECIP_FLOOD_THRESHOLD_MM: f64 = 500.0;
pub const PRECIP_FLOOD_RISK: f64 = 0.5;

/// Humidity risk plateau: humidity alone never counts as fully sufficient
pub const HUMIDITY_PLATEAU_RISK: f64 = 0.9;

/// Composite index default weights
pub const DEFAULT_TEMP_WEIGHT: f64 = 0.4;
pub const DEFAULT_PRECIP_WEIGHT: f64 = 0.3;
pub const DEFAULT_HUMIDITY_WEIGHT: f64 = 0.3;

/// Physical plausibility bounds used by the integrity checker
pub const MIN_PLAUSIBLE_TEMP_K: f64 = 180.0;
pub const MAX_PLAUSIBLE_TEMP_K: f64 = 340.0;
pub const MAX_PLAUSIBLE_PRECIP_M: f64 = 1.0;

/// Processing defaults
pub const DEFAULT_BUFFER_DEGREES: f64 = 1.0;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
