use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub mod time;

/// # Summary
/// UDF 后端支持的 K 线周期。
///
/// # Invariants
/// - `Display` 输出 UDF 周期标记，`FromStr` 可将其解析回来 (另支持少量别名)。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Resolution {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Hour1,
    Hour4,
    Day1,
    Week1,
    Month1,
}

impl Resolution {
    /// 后端提供的全部周期，按 UDF 标记顺序排列。
    pub const ALL: [Resolution; 9] = [
        Resolution::Minute1,
        Resolution::Minute5,
        Resolution::Minute15,
        Resolution::Minute30,
        Resolution::Hour1,
        Resolution::Hour4,
        Resolution::Day1,
        Resolution::Week1,
        Resolution::Month1,
    ];

    /// # Summary
    /// 单根 K 线的名义时长 (秒)。
    ///
    /// # Returns
    /// 每根 K 线的秒数，一个月按 30 天计。
    pub fn seconds(&self) -> i64 {
        match self {
            Resolution::Minute1 => 60,
            Resolution::Minute5 => 300,
            Resolution::Minute15 => 900,
            Resolution::Minute30 => 1_800,
            Resolution::Hour1 => 3_600,
            Resolution::Hour4 => 14_400,
            Resolution::Day1 => 86_400,
            Resolution::Week1 => 604_800,
            Resolution::Month1 => 2_592_000,
        }
    }

    /// 周期是否短于一天。
    pub fn is_intraday(&self) -> bool {
        self.seconds() < Resolution::Day1.seconds()
    }

    /// [`Resolution::ALL`] 对应的 UDF 标记。
    pub fn tokens() -> Vec<String> {
        Self::ALL.iter().map(ToString::to_string).collect()
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(Resolution::Minute1),
            "5" => Ok(Resolution::Minute5),
            "15" => Ok(Resolution::Minute15),
            "30" => Ok(Resolution::Minute30),
            "60" | "1H" | "1h" => Ok(Resolution::Hour1),
            "240" | "4H" | "4h" => Ok(Resolution::Hour4),
            "D" | "1D" => Ok(Resolution::Day1),
            "W" | "1W" => Ok(Resolution::Week1),
            "M" | "1M" => Ok(Resolution::Month1),
            _ => Err(format!("Unsupported resolution: {}", s)),
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Minute1 => write!(f, "1"),
            Resolution::Minute5 => write!(f, "5"),
            Resolution::Minute15 => write!(f, "15"),
            Resolution::Minute30 => write!(f, "30"),
            Resolution::Hour1 => write!(f, "60"),
            Resolution::Hour4 => write!(f, "240"),
            Resolution::Day1 => write!(f, "1D"),
            Resolution::Week1 => write!(f, "1W"),
            Resolution::Month1 => write!(f, "1M"),
        }
    }
}
