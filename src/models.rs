use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub const DEFAULT_T_MAX: f64 = 60.0;
pub const DEFAULT_N_MAX: u64 = 1_000;
pub const DEFAULT_MEAN_INTERARRIVAL: f64 = 13.0;
pub const DEFAULT_VALIDATION_TIME: f64 = 2.0;
pub const DEFAULT_SERVERS: usize = 8;
pub const SUPPORTED_SERVER_COUNTS: [usize; 2] = [8, 10];

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SimConfig {
    #[serde(alias = "T_max")]
    pub t_max: f64,
    #[serde(alias = "N_max")]
    pub n_max: u64,
    #[serde(alias = "media_interarribo")]
    pub mean_interarrival: f64,
    #[serde(alias = "tiempo_validacion")]
    pub validation_time: f64,
    pub p_usb_c: f64,
    pub p_lightning: f64,
    pub p_microusb: f64,
    #[serde(alias = "n_servidores")]
    pub n_servers: usize,
    #[serde(default, deserialize_with = "deserialize_connectors")]
    pub connectors: ConnectorProfiles,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub max_wall_ms: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            t_max: DEFAULT_T_MAX,
            n_max: DEFAULT_N_MAX,
            mean_interarrival: DEFAULT_MEAN_INTERARRIVAL,
            validation_time: DEFAULT_VALIDATION_TIME,
            p_usb_c: 0.45,
            p_lightning: 0.25,
            p_microusb: 0.30,
            n_servers: DEFAULT_SERVERS,
            connectors: ConnectorProfiles::default(),
            seed: None,
            max_wall_ms: None,
        }
    }
}

impl SimConfig {
    pub fn probability(&self, connector: ConnectorType) -> f64 {
        match connector {
            ConnectorType::UsbC => self.p_usb_c,
            ConnectorType::Lightning => self.p_lightning,
            ConnectorType::MicroUsb => self.p_microusb,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectorType {
    UsbC,
    Lightning,
    MicroUsb,
}

impl ConnectorType {
    /// Order used for categorical draws and per-connector columns.
    pub const ALL: [ConnectorType; 3] = [
        ConnectorType::UsbC,
        ConnectorType::Lightning,
        ConnectorType::MicroUsb,
    ];

    pub fn column_key(self) -> &'static str {
        match self {
            ConnectorType::UsbC => "usb_c",
            ConnectorType::Lightning => "lightning",
            ConnectorType::MicroUsb => "microusb",
        }
    }
}

impl fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectorType::UsbC => "USB-C",
            ConnectorType::Lightning => "Lightning",
            ConnectorType::MicroUsb => "MicroUSB",
        };
        write!(f, "{}", label)
    }
}

/// One value per connector type.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ByConnector<T> {
    pub usb_c: T,
    pub lightning: T,
    pub microusb: T,
}

impl<T> ByConnector<T> {
    pub fn get(&self, connector: ConnectorType) -> &T {
        match connector {
            ConnectorType::UsbC => &self.usb_c,
            ConnectorType::Lightning => &self.lightning,
            ConnectorType::MicroUsb => &self.microusb,
        }
    }

    pub fn get_mut(&mut self, connector: ConnectorType) -> &mut T {
        match connector {
            ConnectorType::UsbC => &mut self.usb_c,
            ConnectorType::Lightning => &mut self.lightning,
            ConnectorType::MicroUsb => &mut self.microusb,
        }
    }
}

impl Default for ByConnector<f64> {
    fn default() -> Self {
        Self {
            usb_c: 0.0,
            lightning: 0.0,
            microusb: 0.0,
        }
    }
}

pub type ConnectorProfiles = ByConnector<ConnectorProfile>;

impl Default for ConnectorProfiles {
    fn default() -> Self {
        Self {
            usb_c: ConnectorProfile::with_price(300.0),
            lightning: ConnectorProfile::with_price(500.0),
            microusb: ConnectorProfile::with_price(1000.0),
        }
    }
}

/// Partial connector table as written in a config file. Connectors and
/// fields left out keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConnectorOverrides {
    usb_c: Option<ProfileOverride>,
    lightning: Option<ProfileOverride>,
    microusb: Option<ProfileOverride>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ProfileOverride {
    charge: Option<ChargeDuration>,
    price_per_hour: Option<f64>,
}

impl ConnectorOverrides {
    fn apply(self, profiles: &mut ConnectorProfiles) {
        let overrides = [
            (ConnectorType::UsbC, self.usb_c),
            (ConnectorType::Lightning, self.lightning),
            (ConnectorType::MicroUsb, self.microusb),
        ];
        for (connector, profile) in overrides {
            let Some(profile) = profile else {
                continue;
            };
            let target = profiles.get_mut(connector);
            if let Some(charge) = profile.charge {
                target.charge = charge;
            }
            if let Some(price) = profile.price_per_hour {
                target.price_per_hour = price;
            }
        }
    }
}

fn deserialize_connectors<'de, D>(deserializer: D) -> Result<ConnectorProfiles, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = ConnectorOverrides::deserialize(deserializer)?;
    let mut profiles = ConnectorProfiles::default();
    overrides.apply(&mut profiles);
    Ok(profiles)
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ConnectorProfile {
    #[serde(default)]
    pub charge: ChargeDuration,
    pub price_per_hour: f64,
}

impl ConnectorProfile {
    pub fn with_price(price_per_hour: f64) -> Self {
        Self {
            charge: ChargeDuration::default(),
            price_per_hour,
        }
    }

    pub fn price_for(&self, minutes: f64) -> f64 {
        self.price_per_hour * minutes / 60.0
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ChargeDuration {
    Fixed { fixed_minutes: f64 },
    Table(Vec<ChargeStep>),
}

impl Default for ChargeDuration {
    fn default() -> Self {
        ChargeDuration::Table(vec![
            ChargeStep::new(60.0, 0.50),
            ChargeStep::new(120.0, 0.30),
            ChargeStep::new(180.0, 0.15),
            ChargeStep::new(240.0, 0.05),
        ])
    }
}

impl fmt::Display for ChargeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargeDuration::Fixed { fixed_minutes } => write!(f, "fixed {}min", fixed_minutes),
            ChargeDuration::Table(steps) => {
                let parts = steps
                    .iter()
                    .map(|step| format!("{}min@{}", step.minutes, step.probability))
                    .collect::<Vec<_>>();
                write!(f, "{}", parts.join(", "))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct ChargeStep {
    pub minutes: f64,
    pub probability: f64,
}

impl ChargeStep {
    pub fn new(minutes: f64, probability: f64) -> Self {
        Self {
            minutes,
            probability,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    TimeLimit,
    EventLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StopReason::TimeLimit => "time-limit",
            StopReason::EventLimit => "event-limit",
        };
        write!(f, "{}", label)
    }
}
