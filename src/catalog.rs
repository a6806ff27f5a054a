//! Per-call-site metric definitions for every dashboard section.

use crate::data::MetricRecord;
use crate::locale::{LabelKey, Locale, Texts};
use crate::metric::MetricFormat::{Decimal, Integer, PercentageOfOne};
use crate::metric::{MetricFormat, MetricSample, Presentation, TrendPolicy, present};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Staking,
    Ts,
    Pos,
    ShitCode,
    Revenue,
    Defi,
}

impl Section {
    pub const ALL: [Self; 6] = [
        Self::Staking,
        Self::Ts,
        Self::Pos,
        Self::ShitCode,
        Self::Revenue,
        Self::Defi,
    ];

    /// Path segment on the data service's `/calculate/{endpoint}` route.
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Staking => "staking",
            Self::Ts => "ts",
            Self::Pos => "pos",
            Self::ShitCode => "shitcode",
            Self::Revenue => "revenue",
            Self::Defi => "defi",
        }
    }

    pub const fn label_key(self) -> LabelKey {
        match self {
            Self::Staking => LabelKey::Staking,
            Self::Ts => LabelKey::Ts,
            Self::Pos => LabelKey::Pos,
            Self::ShitCode => LabelKey::ShitCode,
            Self::Revenue => LabelKey::Revenue,
            Self::Defi => LabelKey::Defi,
        }
    }

    pub const fn url(self) -> &'static str {
        match self {
            Self::Staking => "/statistics/staking",
            Self::Ts => "/statistics/ts",
            Self::Pos => "/statistics/pos",
            Self::ShitCode => "/statistics/shitcode",
            Self::Revenue => "/revenue",
            Self::Defi => "/defi",
        }
    }

    pub const fn metrics(self) -> &'static [MetricDefinition] {
        match self {
            Self::Staking => STAKING_METRICS,
            Self::Ts => TS_METRICS,
            Self::Pos => POS_METRICS,
            Self::ShitCode => SHITCODE_METRICS,
            Self::Revenue => REVENUE_METRICS,
            Self::Defi => DEFI_METRICS,
        }
    }

    /// Sections a route path displays: the matching section page, or every
    /// section on the dashboard root.
    pub fn for_path(path: &str) -> Vec<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            return Self::ALL.to_vec();
        }
        Self::ALL
            .into_iter()
            .filter(|section| {
                trimmed == section.url() || trimmed.starts_with(&format!("{}/", section.url()))
            })
            .collect()
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// How one metric card formats its value and judges its trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDefinition {
    /// Field stem used by the data service (`{key}Current`, `{key}Prev`).
    pub key: &'static str,
    pub title: Texts,
    pub format: MetricFormat,
    pub use_absolute_denominator: bool,
    pub policy: TrendPolicy,
}

impl MetricDefinition {
    const fn new(
        key: &'static str,
        zh: &'static str,
        en: &'static str,
        format: MetricFormat,
    ) -> Self {
        Self {
            key,
            title: Texts { zh, en },
            format,
            use_absolute_denominator: false,
            policy: TrendPolicy::ThreeWay,
        }
    }

    const fn signed_flow(mut self) -> Self {
        self.use_absolute_denominator = true;
        self
    }

    pub const fn title(&self, locale: Locale) -> &'static str {
        self.title.get(locale)
    }

    pub const fn sample(&self, record: &MetricRecord) -> MetricSample {
        MetricSample::new(record.value, record.prev_value, self.format)
            .with_absolute_denominator(self.use_absolute_denominator)
    }

    pub fn present(&self, record: &MetricRecord) -> Presentation {
        present(&self.sample(record), self.policy)
    }

    /// Same definition with the trend policy replaced.
    #[must_use]
    pub const fn with_policy(mut self, policy: TrendPolicy) -> Self {
        self.policy = policy;
        self
    }
}

const STAKING_METRICS: &[MetricDefinition] = &[
    MetricDefinition::new("totalStake", "质押总量", "Total staked", Decimal),
    MetricDefinition::new("totalUnstake", "解押总量", "Total unstaked", Decimal),
    MetricDefinition::new("netStake", "净质押", "Net stake", Decimal).signed_flow(),
    MetricDefinition::new("stakeCount", "质押笔数", "Stake count", Integer),
    MetricDefinition::new("rewardCount", "奖励笔数", "Reward count", Integer),
    MetricDefinition::new("rewardAmount", "奖励总额", "Reward amount", Decimal),
];

const TS_METRICS: &[MetricDefinition] = &[
    MetricDefinition::new("totalTx", "总交易数", "Total transactions", Integer),
    MetricDefinition::new("tsClaim", "TS 领取次数", "TS claims", Integer),
    MetricDefinition::new("totalAmount", "领取总额", "Total amount", Decimal),
    MetricDefinition::new("uniqueAddresses", "独立地址", "Unique addresses", Integer),
    MetricDefinition::new("meanClaims", "平均领取", "Mean claims", Decimal),
    MetricDefinition::new("medianClaims", "领取中位数", "Median claims", Decimal),
    MetricDefinition::new("avgInterval", "平均间隔", "Average interval", Decimal),
    MetricDefinition::new("wolfTx", "Wolf 交易", "Wolf transactions", Integer),
    MetricDefinition::new("oneRefTx", "一级推荐交易", "1-ref transactions", Integer),
    MetricDefinition::new("twoRefTx", "二级推荐交易", "2-ref transactions", Integer),
    MetricDefinition::new("luckyDraws", "幸运抽奖", "Lucky draws", Integer),
    MetricDefinition::new("luckyDrawAmount", "抽奖金额", "Lucky draw amount", Decimal),
    MetricDefinition::new("luckyDrawAddresses", "抽奖地址", "Lucky draw addresses", Integer),
    MetricDefinition::new("revenue", "收入", "Revenue", Decimal),
    MetricDefinition::new("shitCost", "SHIT 成本", "SHIT cost", Decimal),
    MetricDefinition::new("roi", "投资回报率", "ROI", PercentageOfOne).signed_flow(),
];

const POS_METRICS: &[MetricDefinition] = &[
    MetricDefinition::new("totalTx", "总交易数", "Total transactions", Integer),
    MetricDefinition::new("totalAmount", "交易总额", "Total amount", Decimal),
    MetricDefinition::new("maxAmount", "最大金额", "Max amount", Decimal),
    MetricDefinition::new("minAmount", "最小金额", "Min amount", Decimal),
    MetricDefinition::new("totalRevenue", "总收入", "Total revenue", Decimal),
    MetricDefinition::new("emissionEfficiency", "释放效率", "Emission efficiency", PercentageOfOne),
    MetricDefinition::new("avgReward", "平均奖励", "Average reward", Decimal),
];

const SHITCODE_METRICS: &[MetricDefinition] = &[
    MetricDefinition::new("claimCount", "领取次数", "Claim count", Integer),
    MetricDefinition::new("claimAmount", "领取总额", "Claim amount", Decimal),
    MetricDefinition::new("uniqueAddresses", "独立地址", "Unique addresses", Integer),
    MetricDefinition::new("avgClaimPerAddress", "地址平均领取", "Average claim per address", Decimal),
];

const REVENUE_METRICS: &[MetricDefinition] = &[
    MetricDefinition::new("totalRevenue", "总收入", "Total revenue", Decimal),
    MetricDefinition::new("tsRevenue", "TS 收入", "TS revenue", Decimal),
    MetricDefinition::new("posRevenue", "POS 收入", "POS revenue", Decimal),
    MetricDefinition::new("stakingRevenue", "质押收入", "Staking revenue", Decimal),
    MetricDefinition::new("shitCodeRevenue", "ShitCode 收入", "ShitCode revenue", Decimal),
];

const DEFI_METRICS: &[MetricDefinition] = &[
    MetricDefinition::new("buyShitAmount", "买入 SHIT", "SHIT bought", Decimal),
    MetricDefinition::new("buyCount", "买入笔数", "Buy count", Integer),
    MetricDefinition::new("buyUsdtAmount", "买入 USDT", "USDT spent on buys", Decimal),
    MetricDefinition::new("sellShitAmount", "卖出 SHIT", "SHIT sold", Decimal),
    MetricDefinition::new("sellCount", "卖出笔数", "Sell count", Integer),
    MetricDefinition::new("sellUsdtAmount", "卖出 USDT", "USDT from sells", Decimal),
    MetricDefinition::new("tsSellShitAmount", "TS 卖出 SHIT", "TS-sized SHIT sold", Decimal),
    MetricDefinition::new("tsSellUsdtAmount", "TS 卖出 USDT", "TS-sized USDT from sells", Decimal),
    MetricDefinition::new("liqAddUsdt", "添加流动性 USDT", "Liquidity added (USDT)", Decimal),
    MetricDefinition::new("liqAddCount", "添加流动性笔数", "Liquidity adds", Integer),
    MetricDefinition::new("liqRemoveUsdt", "移除流动性 USDT", "Liquidity removed (USDT)", Decimal),
    MetricDefinition::new("liqRemoveCount", "移除流动性笔数", "Liquidity removals", Integer),
];
