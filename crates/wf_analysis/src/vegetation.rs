// crates/wf_analysis/src/vegetation.rs

//! 植被类型与 Manning 糙率

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use wf_foundation::WfError;

/// 湿地植被类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VegetationType {
    /// 农作物
    Crop,
    /// 牧草
    Pasture,
    /// 灌木
    Bush,
    /// 乔木
    Tree,
}

impl VegetationType {
    /// Manning 糙率系数
    pub fn manning(self) -> f64 {
        match self {
            Self::Crop | Self::Pasture => 0.05,
            Self::Bush => 0.16,
            Self::Tree => 0.2,
        }
    }

    /// 名称
    pub fn name(self) -> &'static str {
        match self {
            Self::Crop => "crop",
            Self::Pasture => "pasture",
            Self::Bush => "bush",
            Self::Tree => "tree",
        }
    }
}

impl fmt::Display for VegetationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VegetationType {
    type Err = WfError;

    /// 不区分大小写，接受单复数
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "crop" | "crops" => Ok(Self::Crop),
            "pasture" | "pastures" => Ok(Self::Pasture),
            "bush" | "bushes" => Ok(Self::Bush),
            "tree" | "trees" => Ok(Self::Tree),
            other => Err(WfError::validation(format!("未知植被类型: {other}"))),
        }
    }
}

/// 按名称查 Manning 糙率，未知类型返回 `None`
pub fn manning_for(name: &str) -> Option<f64> {
    name.parse::<VegetationType>().ok().map(VegetationType::manning)
}
