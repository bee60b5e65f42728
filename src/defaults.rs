//! Default constants for panel construction, weight solving and reporting.

pub const DEFAULT_MAX_ITER: usize = 3000;
pub const REFERENCE_LEARNING_RATE: f64 = 1e-4;
pub const MIN_PRE_YEARS: usize = 5;
pub const MIN_DONORS: usize = 2;
pub const DEFAULT_CONTRIBUTOR_THRESHOLD: f64 = 0.01;
pub const DEFAULT_HEADLINE_YEARS: usize = 2;
pub const MAX_HEADLINE_YEARS: usize = 100;

pub const DEFAULT_TREATED_UNIT: &str = "RUS";
pub const DEFAULT_DONOR_POOL: &[&str] = &[
    "SAU", "IDN", "AGO", "AZE", "AUS", "BRA", "ARG", "TUR", "COL", "ARM", "ECU", "CHL", "MYS",
    "IND",
];
pub const DEFAULT_START_YEAR: i32 = 2010;
pub const DEFAULT_END_YEAR: i32 = 2023;
pub const DEFAULT_CUTOFF_YEAR: i32 = 2022;

pub const DEFAULT_PROVIDER_URL: &str = "http://api.worldbank.org/v2";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_PER_PAGE: usize = 5000;

pub const DEFAULT_INDICATOR: &str = "GDP_CONST";

/// (key, World Bank code, label)
pub const DEFAULT_INDICATORS: &[(&str, &str, &str)] = &[
    ("GDP_CONST", "NY.GDP.MKTP.KD", "GDP (Constant US$)"),
    ("GDP_CUR", "NY.GDP.MKTP.CD", "GDP (Current US$)"),
    ("GDP_PC", "NY.GDP.PCAP.KD", "GDP Per Capita"),
    ("GDP_GROWTH", "NY.GDP.MKTP.KD.ZG", "GDP Growth (%)"),
    ("INFLATION", "FP.CPI.TOTL.ZG", "Inflation (CPI %)"),
    ("UNEMPLOYMENT", "SL.UEM.TOTL.ZS", "Unemployment (%)"),
    ("EXPORTS", "NE.EXP.GNFS.KD", "Exports (Goods & Services)"),
    ("IMPORTS", "NE.IMP.GNFS.KD", "Imports (Goods & Services)"),
    ("FDI_IN", "BX.KLT.DINV.WD.GD.ZS", "FDI Inflows (% GDP)"),
    ("RESERVES", "FI.RES.TOTL.CD", "Total Reserves ($)"),
    ("GNI", "NY.GNP.MKTP.KD", "GNI (Gross National Income)"),
    ("IND_VAL", "NV.IND.TOTL.KD", "Industry Value Added"),
    ("AGR_VAL", "NV.AGR.TOTL.KD", "Agriculture Value Added"),
    ("TRADE_GDP", "NE.TRD.GNFS.ZS", "Trade (% of GDP)"),
    ("EXCH_RATE", "PA.NUS.FCRF", "Exchange Rate (Official)"),
];
