//! Symbol universe: the ordered ticker list a batch downloads.
//!
//! The universe is stored as a TOML file with an `index` list (index
//! constituents) and a `custom` list (additions). Order is preserved:
//! index symbols first, then custom symbols, duplicates dropped.

use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const SP500_SYMBOLS: &[&str] = &[
    "MSFT", "AAPL", "AMZN", "BRK.B", "JNJ", "JPM", "FB", "GOOG", "GOOGL", "XOM", "PFE", "VZ",
    "UNH", "PG", "V", "BAC", "T", "CVX", "INTC", "WFC", "MRK", "HD", "CSCO", "KO", "MA", "BA",
    "DIS", "CMCSA", "PEP", "MCD", "WMT", "ABBV", "C", "DWDP", "AMGN", "NFLX", "ABT", "MDT",
    "ORCL", "MMM", "ADBE", "LLY", "PM", "IBM", "CRM", "UNP", "PYPL", "HON", "AVGO", "NKE", "MO",
    "COST", "ACN", "TMO", "TXN", "CVS", "GILD", "UTX", "LIN", "NEE", "NVDA", "BKNG", "SBUX",
    "BMY", "LOW", "COP", "CAT", "GE", "USB", "AMT", "CI", "QCOM", "UPS", "AXP", "CME", "ANTM",
    "LMT", "BIIB", "DUK", "DHR", "GS", "MDLZ", "CB", "BDX", "CELG", "TJX", "ADP", "PNC", "WBA",
    "D", "MS", "EOG", "SLB", "ISRG", "CHTR", "CL", "SPG", "FOXA", "CSX", "INTU", "SCHW", "SYK",
    "OXY", "BLK", "DE", "SO", "BSX", "CCI", "AGN", "BK", "GD", "RTN", "EXC", "ICE", "GM", "VRTX",
    "ILMN", "NOC", "SPGI", "MPC", "MET", "NSC", "MMC", "ZTS", "KMB", "FDX", "ITW", "HUM", "PSX",
    "EMR", "COF", "ECL", "AEP", "PLD", "CTSH", "MU", "WM", "ATVI", "TGT", "AON", "AIG", "BBT",
    "APD", "AFL", "PRU", "PGR", "FIS", "HCA", "BAX", "VLO", "HPQ", "SHW", "ROST", "AMAT", "RHT",
    "TRV", "F", "EW", "ADI", "KMI", "PSA", "SYY", "SRE", "MAR", "ETN", "REGN", "DAL", "DG",
    "FISV", "YUM", "EL", "EQIX", "ORLY", "JCI", "ALL", "WMB", "STZ", "KHC", "ROP", "ADSK", "LYB",
    "WELL", "EBAY", "PEG", "TEL", "XEL", "EA", "STI", "HAL", "PPG", "EQR", "LUV", "AVB", "STT",
    "ED", "GIS", "FOX", "ADM", "PXD", "APC", "MCO", "GLW", "VFC", "CNC", "MCK", "APH", "ALXN",
    "OKE", "IR", "KR", "TROW", "AZO", "DLTR", "CXO", "WEC", "DLR", "XLNX", "LRCX", "MTB", "VTR",
    "PAYX", "ZBH", "PPL", "TWTR", "A", "HLT", "DFS", "ES", "PCAR", "DTE", "CMI", "CLX", "PH",
    "CCL", "WLTW", "FTV", "MNST", "HPE", "SBAC", "O", "EIX", "UAL", "NTRS", "NEM", "MSI", "SWK",
    "ROK", "FE", "IQV", "VRSK", "BXP", "WY", "INFO", "CERN", "MKC", "IP", "SYF", "NUE", "TSN",
    "FITB", "AWK", "OMC", "FLT", "APTV", "RCL", "KEY", "TDG", "GPN", "CHD", "ESS", "CBS", "RSG",
    "MCHP", "AEE", "IDXX", "DXC", "HRS", "VRSN", "BLL", "HIG", "ETR", "AME", "RMD", "AMD",
    "EVRG", "NTAP", "AMP", "HSY", "FANG", "CTL", "FCX", "CFG", "FRC", "K", "FAST", "RF", "CTAS",
    "MYL", "CNP", "ULTA", "CMS", "GPC", "WAT", "ABMD", "ALGN", "MXIM", "HCP", "KLAC", "IFF",
    "CAH", "LLL", "TSS", "MTD", "CTXS", "EXPE", "HBAN", "AJG", "VMC", "MGM", "LH", "MSCI", "MRO",
    "L", "BBY", "AAL", "PCG", "DRI", "GWW", "HST", "COO", "DHI", "AAP", "CBRE", "SNPS", "SYMC",
    "INCY", "ARE", "ABC", "CDNS", "LEN", "WCG", "ANSS", "PFG", "XYL", "CE", "HRL", "EXPD",
    "TTWO", "HSIC", "CMA", "ETFC", "CINF", "EXR", "TXT", "IT", "KSS", "CHRW", "DVN", "NRG",
    "LNC", "KMX", "EFX", "BR", "DGX", "KEYS", "SWKS", "TAP", "CMG", "LW", "SJM", "UDR", "HES",
    "CBOE", "MLM", "BHGE", "MAA", "CAG", "HOLX", "WDC", "VNO", "APA", "ANET", "COG", "DOV",
    "VAR", "WYNN", "MOS", "EMN", "SIVB", "UHS", "TSCO", "NOV", "WRK", "FMC", "FTNT", "REG",
    "LNT", "STX", "CPRT", "KSU", "AKAM", "TPR", "CF", "RJF", "JKHY", "FFIV", "IRM", "AES", "PNW",
    "VIAB", "NBL", "NI", "HAS", "M", "NDAQ", "JNPR", "BEN", "NCLH", "MAS", "DRE", "TIF", "DISCK",
    "FTI", "RE", "FRT", "URI", "XRAY", "NLSN", "SNA", "HII", "ZION", "PKI", "HFC", "NWL", "ARNC",
    "ALB", "JBHT", "IPG", "PKG", "TMK", "BF.B", "ALLE", "AVY", "WU", "GRMN", "MHK", "LKQ", "ADS",
    "ALK", "BWA", "PVH", "QRVO", "WHR", "JEC", "PHM", "IVZ", "SLG", "AIV", "UNM", "RHI", "DVA",
    "FL", "CPB", "KIM", "AOS", "LB", "DISH", "PNR", "XEC", "FLIR", "RL", "GPS", "CPRI", "SEE",
    "HOG", "NKTR", "PBCT", "JWN", "FBHS", "ROL", "TRIP", "HP", "AMG", "HRB", "JEF", "PRGO", "GT",
    "FLS", "AIZ", "MAC", "LEG", "HBI", "FLR", "XRX", "PWR", "NWSA", "DISCA", "IPGP", "BHF",
    "UAA", "MAT", "COTY", "NFX", "UA", "NWS",
];

const CUSTOM_SYMBOLS: &[&str] = &["YRD", "HUYA"];

/// The symbol universe configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    #[serde(default)]
    pub index: Vec<String>,
    #[serde(default)]
    pub custom: Vec<String>,
}

impl Universe {
    pub fn new(index: Vec<String>, custom: Vec<String>) -> Self {
        Self { index, custom }
    }

    /// A universe made only of the given symbols, in order.
    pub fn from_symbols<S: AsRef<str>>(symbols: &[S]) -> Self {
        Self::new(
            symbols.iter().map(|s| s.as_ref().to_string()).collect(),
            Vec::new(),
        )
    }

    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IngestError::Configuration(format!("read universe file {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let universe: Self = toml::from_str(content)
            .map_err(|e| IngestError::Configuration(format!("parse universe TOML: {e}")))?;
        if universe.symbols().is_empty() {
            return Err(IngestError::Configuration("universe has no symbols".into()));
        }
        Ok(universe)
    }

    /// S&P 500 constituents plus the custom additions.
    pub fn default_intrinio() -> Self {
        Self::new(
            SP500_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            CUSTOM_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// All symbols, index first, then custom, first occurrence wins.
    pub fn symbols(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.index
            .iter()
            .chain(self.custom.iter())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && seen.insert(*s))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.symbols().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize the universe to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| IngestError::Configuration(format!("serialize universe: {e}")))
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::default_intrinio()
    }
}
