//! Keyword allow-list applied to messages for topic-gated personas.

use crate::config::TopicGateConfig;

/// Spanish and English automotive vocabulary. Matching is a case-insensitive
/// substring test, so stems such as `mecánic` cover their inflections.
pub const DEFAULT_TOPIC_KEYWORDS: &[&str] = &[
    // Spanish
    "manual",
    "motor",
    "esquema",
    "diagrama",
    "eléctric",
    "electric",
    "freno",
    "embrague",
    "transmisión",
    "transmision",
    "suspensión",
    "suspension",
    "batería",
    "bateria",
    "aceite",
    "neumático",
    "neumatico",
    "rueda",
    "vehículo",
    "vehiculo",
    "coche",
    "carro",
    "camión",
    "camion",
    "mecánic",
    "mecanic",
    "avería",
    "averia",
    "reparación",
    "reparacion",
    "taller",
    "alternador",
    "radiador",
    "bujía",
    "bujia",
    "correa",
    "inyector",
    "filtro",
    "fusible",
    "escape",
    "combustible",
    "gasolina",
    "diésel",
    "diesel",
    "turbo",
    "sensor",
    // English
    "engine",
    "brake",
    "clutch",
    "wiring",
    "diagram",
    "battery",
    "tire",
    "tyre",
    "wheel",
    "vehicle",
    "truck",
    "mechanic",
    "repair",
    "alternator",
    "radiator",
    "spark plug",
    "belt",
    "injector",
    "filter",
    "fuse",
    "exhaust",
    "fuel",
];

/// Case-insensitive keyword gate
#[derive(Debug, Clone)]
pub struct TopicGate {
    keywords: Vec<String>,
}

impl TopicGate {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &TopicGateConfig) -> Self {
        Self::new(&config.keywords)
    }

    /// Whether the message mentions at least one keyword.
    /// An empty keyword list lets everything through.
    pub fn allows(&self, message: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let message = message.to_lowercase();
        self.keywords.iter().any(|k| message.contains(k.as_str()))
    }
}

impl Default for TopicGate {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_KEYWORDS)
    }
}
