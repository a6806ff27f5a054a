use clap::ValueEnum;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Zh,
    #[default]
    En,
}

impl Locale {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Zh => "zh",
            Self::En => "en",
        }
    }

    /// The other locale, as used by the header toggle.
    pub const fn toggled(self) -> Self {
        match self {
            Self::Zh => Self::En,
            Self::En => Self::Zh,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A string translated into every supported locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texts {
    pub zh: &'static str,
    pub en: &'static str,
}

impl Texts {
    pub const fn get(self, locale: Locale) -> &'static str {
        match locale {
            Locale::Zh => self.zh,
            Locale::En => self.en,
        }
    }
}

const fn texts(zh: &'static str, en: &'static str) -> Texts {
    Texts { zh, en }
}

/// Every piece of shell text the dashboard shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKey {
    Dashboard,
    Statistics,
    Staking,
    Ts,
    Pos,
    ShitCode,
    Revenue,
    Defi,
    Login,
    Language,
    ThemeLight,
    ThemeDark,
    DateRange,
    PreviousPeriod,
    NoData,
    TopStakers,
    TopUsers,
    RepeatRanking,
    DuplicateAddresses,
    RevenueComposition,
    Rank,
    Address,
    Amount,
    TxCount,
    ShitSent,
    ClaimCount,
    ClaimAmount,
    Count,
    Date,
    Source,
}

impl LabelKey {
    pub const ALL: [Self; 30] = [
        Self::Dashboard,
        Self::Statistics,
        Self::Staking,
        Self::Ts,
        Self::Pos,
        Self::ShitCode,
        Self::Revenue,
        Self::Defi,
        Self::Login,
        Self::Language,
        Self::ThemeLight,
        Self::ThemeDark,
        Self::DateRange,
        Self::PreviousPeriod,
        Self::NoData,
        Self::TopStakers,
        Self::TopUsers,
        Self::RepeatRanking,
        Self::DuplicateAddresses,
        Self::RevenueComposition,
        Self::Rank,
        Self::Address,
        Self::Amount,
        Self::TxCount,
        Self::ShitSent,
        Self::ClaimCount,
        Self::ClaimAmount,
        Self::Count,
        Self::Date,
        Self::Source,
    ];

    pub const fn texts(self) -> Texts {
        match self {
            Self::Dashboard => texts("仪表盘", "Dashboard"),
            Self::Statistics => texts("数据统计", "Statistics"),
            Self::Staking => texts("质押", "Staking"),
            Self::Ts => texts("TS 领取", "TS"),
            Self::Pos => texts("POS", "POS"),
            Self::ShitCode => texts("ShitCode 领取", "ShitCode"),
            Self::Revenue => texts("收入", "Revenue"),
            Self::Defi => texts("DeFi 交易", "DeFi"),
            Self::Login => texts("登录", "Login"),
            Self::Language => texts("English", "中文"),
            Self::ThemeLight => texts("浅色", "Light"),
            Self::ThemeDark => texts("深色", "Dark"),
            Self::DateRange => texts("日期范围", "Date range"),
            Self::PreviousPeriod => texts("对比上一周期", "vs previous period"),
            Self::NoData => texts("暂无数据", "No data available."),
            Self::TopStakers => texts("质押排行", "Top stakers"),
            Self::TopUsers => texts("用户排行", "Top users"),
            Self::RepeatRanking => texts("重复领取排行", "Repeat claims"),
            Self::DuplicateAddresses => texts("重复地址", "Duplicate addresses"),
            Self::RevenueComposition => texts("收入构成", "Revenue composition"),
            Self::Rank => texts("排名", "#"),
            Self::Address => texts("地址", "Address"),
            Self::Amount => texts("数量", "Amount"),
            Self::TxCount => texts("交易数", "Transactions"),
            Self::ShitSent => texts("发送 SHIT", "SHIT sent"),
            Self::ClaimCount => texts("领取次数", "Claims"),
            Self::ClaimAmount => texts("领取数量", "Claimed"),
            Self::Count => texts("次数", "Count"),
            Self::Date => texts("日期", "Date"),
            Self::Source => texts("来源", "Source"),
        }
    }

    pub const fn label(self, locale: Locale) -> &'static str {
        self.texts().get(locale)
    }

    /// Route segment this key names, if it names one.
    pub const fn segment(self) -> Option<&'static str> {
        match self {
            Self::Statistics => Some("statistics"),
            Self::Staking => Some("staking"),
            Self::Ts => Some("ts"),
            Self::Pos => Some("pos"),
            Self::ShitCode => Some("shitcode"),
            Self::Revenue => Some("revenue"),
            Self::Defi => Some("defi"),
            Self::Login => Some("login"),
            _ => None,
        }
    }
}

/// Segment-to-label lookup for one locale.
#[derive(Debug, Clone)]
pub struct LabelDictionary {
    root_label: String,
    labels: FxHashMap<String, String>,
}

impl LabelDictionary {
    pub fn for_locale(locale: Locale) -> Self {
        let labels = LabelKey::ALL
            .into_iter()
            .filter_map(|key| {
                key.segment()
                    .map(|segment| (segment.to_string(), key.label(locale).to_string()))
            })
            .collect();
        Self {
            root_label: LabelKey::Dashboard.label(locale).to_string(),
            labels,
        }
    }

    pub fn root_label(&self) -> &str {
        &self.root_label
    }

    pub fn get(&self, segment: &str) -> Option<&str> {
        self.labels.get(segment).map(String::as_str)
    }
}
