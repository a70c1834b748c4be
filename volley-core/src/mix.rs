use crate::ConfigError;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A named request payload size and its share of the traffic, in percent.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PayloadClass {
    pub name: String,
    pub size: usize,
    pub percent: u32,
}

/// Deterministic heterogeneous payload distribution.
///
/// Request `id` maps to the class whose cumulative percentage first exceeds `id % 100`, so every
/// block of 100 consecutive ids reproduces the configured shares exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PayloadMix {
    classes: Vec<PayloadClass>,
}

impl PayloadMix {
    pub fn new(classes: Vec<PayloadClass>) -> Result<Self, ConfigError> {
        if let Some(class) = classes.iter().find(|c| c.percent > 100) {
            return Err(ConfigError::BadMix(class.name.clone()));
        }
        let total: u64 = classes.iter().map(|c| u64::from(c.percent)).sum();
        if total != 100 {
            return Err(ConfigError::MixPercent(total));
        }
        Ok(Self { classes })
    }

    /// 50% 512B, 30% 8KiB, 20% 64KiB.
    pub fn small_medium_large() -> Self {
        Self {
            classes: vec![
                PayloadClass {
                    name: "small".to_string(),
                    size: 512,
                    percent: 50,
                },
                PayloadClass {
                    name: "medium".to_string(),
                    size: 8 * 1024,
                    percent: 30,
                },
                PayloadClass {
                    name: "large".to_string(),
                    size: 64 * 1024,
                    percent: 20,
                },
            ],
        }
    }

    pub fn classes(&self) -> &[PayloadClass] {
        &self.classes
    }

    pub fn pick(&self, id: u64) -> &PayloadClass {
        let slot = (id % 100) as u32;
        let mut cumulative = 0;
        for class in &self.classes {
            cumulative += class.percent;
            if slot < cumulative {
                return class;
            }
        }
        // Percentages sum to 100, so the loop always returns.
        &self.classes[self.classes.len() - 1]
    }
}

impl FromStr for PayloadMix {
    type Err = ConfigError;

    /// `"name:size:percent[,...]"`, e.g. `"small:512:50,medium:8192:30,large:65536:20"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut classes = vec![];
        for part in s.trim().split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let fields: Vec<_> = part.split(':').map(str::trim).collect();
            let &[name, size, percent] = fields.as_slice() else {
                return Err(ConfigError::BadMix(part.to_string()));
            };
            let size = size
                .parse()
                .map_err(|_| ConfigError::BadMix(part.to_string()))?;
            let percent = percent
                .parse()
                .map_err(|_| ConfigError::BadMix(part.to_string()))?;
            if name.is_empty() {
                return Err(ConfigError::BadMix(part.to_string()));
            }

            classes.push(PayloadClass {
                name: name.to_string(),
                size,
                percent,
            });
        }

        if classes.is_empty() {
            return Err(ConfigError::BadMix(s.to_string()));
        }
        Self::new(classes)
    }
}
