//! Assembles everything one rendered page needs.

use crate::catalog::Section;
use crate::data::{MetricRecord, SectionData, SectionMetrics, SectionTables, TopUser};
use crate::dates::DateRange;
use crate::formatting::NOT_AVAILABLE;
use crate::locale::{LabelDictionary, LabelKey, Locale, Theme};
use crate::metric::{MetricFormat, Presentation, TrendPolicy};
use crate::navigation::{NavigationState, Sidebar, nav_tree, resolve};

#[derive(Debug, Clone)]
pub struct Card {
    pub key: &'static str,
    pub title: &'static str,
    pub record: MetricRecord,
    pub presentation: Presentation,
}

/// A ranking or breakdown table with every cell already formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub title: &'static str,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct Panel {
    pub section: Section,
    pub title: &'static str,
    pub cards: Vec<Card>,
    pub tables: Vec<TableView>,
}

impl Panel {
    /// One card per catalog entry; metrics absent from `data` render as "NA".
    /// Tables follow in a fixed order, empty ones are skipped.
    pub fn build(
        section: Section,
        data: &SectionData,
        locale: Locale,
        policy: Option<TrendPolicy>,
    ) -> Self {
        Self {
            section,
            title: section.label_key().label(locale),
            cards: build_cards(section, &data.metrics, locale, policy),
            tables: build_tables(&data.tables, locale),
        }
    }
}

fn build_cards(
    section: Section,
    metrics: &SectionMetrics,
    locale: Locale,
    policy: Option<TrendPolicy>,
) -> Vec<Card> {
    section
        .metrics()
        .iter()
        .map(|definition| {
            let definition =
                policy.map_or(*definition, |policy| definition.with_policy(policy));
            let record = metrics.get(definition.key);
            Card {
                key: definition.key,
                title: definition.title(locale),
                record,
                presentation: definition.present(&record),
            }
        })
        .collect()
}

fn cell(value: Option<f64>, format: MetricFormat) -> String {
    value
        .filter(|value| value.is_finite())
        .map_or_else(|| NOT_AVAILABLE.to_string(), |value| format.render(value))
}

fn rank(index: usize) -> String {
    (index + 1).to_string()
}

fn table(
    title: LabelKey,
    headers: &[LabelKey],
    rows: Vec<Vec<String>>,
    locale: Locale,
) -> Option<TableView> {
    (!rows.is_empty()).then(|| TableView {
        title: title.label(locale),
        headers: headers.iter().map(|key| key.label(locale)).collect(),
        rows,
    })
}

type UserColumn = (LabelKey, fn(&TopUser) -> Option<f64>, MetricFormat);

const USER_COLUMNS: [UserColumn; 4] = [
    (LabelKey::TxCount, |user| user.tx_count, MetricFormat::Integer),
    (LabelKey::ShitSent, |user| user.shit_sent, MetricFormat::Decimal),
    (LabelKey::ClaimCount, |user| user.claim_count, MetricFormat::Integer),
    (LabelKey::ClaimAmount, |user| user.claim_amount, MetricFormat::Decimal),
];

/// Each section fills a different subset of the user counters, so only
/// columns with at least one value are shown.
fn top_users_table(users: &[TopUser], locale: Locale) -> Option<TableView> {
    let columns: Vec<&UserColumn> = USER_COLUMNS
        .iter()
        .filter(|(_, read, _)| users.iter().any(|user| read(user).is_some()))
        .collect();
    let mut headers = vec![LabelKey::Rank, LabelKey::Address];
    headers.extend(columns.iter().map(|(key, _, _)| *key));
    let rows = users
        .iter()
        .enumerate()
        .map(|(index, user)| {
            let mut row = vec![rank(index), user.address.clone()];
            row.extend(columns.iter().map(|(_, read, format)| cell(read(user), *format)));
            row
        })
        .collect();
    table(LabelKey::TopUsers, &headers, rows, locale)
}

fn build_tables(tables: &SectionTables, locale: Locale) -> Vec<TableView> {
    let stakers = tables
        .top_stakers
        .iter()
        .enumerate()
        .map(|(index, holder)| {
            vec![
                rank(index),
                holder.address.clone(),
                cell(holder.amount, MetricFormat::Decimal),
            ]
        })
        .collect();
    let repeats = tables
        .repeat_ranking
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            vec![
                rank(index),
                entry.address.clone(),
                cell(entry.count, MetricFormat::Integer),
            ]
        })
        .collect();
    let duplicates = tables
        .duplicate_addresses
        .iter()
        .map(|entry| {
            vec![
                entry.date.clone(),
                entry.address.clone(),
                cell(entry.tx_count, MetricFormat::Integer),
            ]
        })
        .collect();
    let composition = tables
        .composition
        .iter()
        .map(|share| vec![share.source.clone(), cell(share.amount, MetricFormat::Decimal)])
        .collect();

    [
        table(
            LabelKey::TopStakers,
            &[LabelKey::Rank, LabelKey::Address, LabelKey::Amount],
            stakers,
            locale,
        ),
        top_users_table(&tables.top_users, locale),
        table(
            LabelKey::RepeatRanking,
            &[LabelKey::Rank, LabelKey::Address, LabelKey::Count],
            repeats,
            locale,
        ),
        table(
            LabelKey::DuplicateAddresses,
            &[LabelKey::Date, LabelKey::Address, LabelKey::TxCount],
            duplicates,
            locale,
        ),
        table(
            LabelKey::RevenueComposition,
            &[LabelKey::Source, LabelKey::Amount],
            composition,
            locale,
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[derive(Debug, Clone)]
pub struct DashboardView {
    pub path: String,
    pub locale: Locale,
    pub theme: Theme,
    pub range: DateRange,
    pub navigation: NavigationState,
    pub sidebar: Sidebar,
    pub panels: Vec<Panel>,
}

#[derive(Debug, Clone, Copy)]
pub struct ViewOptions<'a> {
    pub path: &'a str,
    pub locale: Locale,
    pub theme: Theme,
    pub range: DateRange,
    pub policy: Option<TrendPolicy>,
}

impl DashboardView {
    pub fn build(options: ViewOptions<'_>, sections: &[(Section, SectionData)]) -> Self {
        let tree = nav_tree(options.locale);
        let labels = LabelDictionary::for_locale(options.locale);
        let navigation = resolve(options.path, &tree, &labels);
        let sidebar = Sidebar::mount(tree, options.path);
        let panels = sections
            .iter()
            .map(|(section, data)| {
                Panel::build(*section, data, options.locale, options.policy)
            })
            .collect();
        Self {
            path: options.path.to_string(),
            locale: options.locale,
            theme: options.theme,
            range: options.range,
            navigation,
            sidebar,
            panels,
        }
    }

    pub fn card_count(&self) -> usize {
        self.panels.iter().map(|panel| panel.cards.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RepeatClaim, RevenueShare, TopHolder};
    use crate::metric::Direction;

    fn options(path: &str) -> ViewOptions<'_> {
        ViewOptions {
            path,
            locale: Locale::En,
            theme: Theme::Light,
            range: DateRange::parse("2025-03-01", "2025-03-07").unwrap(),
            policy: None,
        }
    }

    fn metrics(key: &str, value: f64, prev: f64) -> SectionData {
        let metrics: SectionMetrics = [(key, MetricRecord::new(Some(value), Some(prev)))]
            .into_iter()
            .collect();
        metrics.into()
    }

    #[test]
    fn panels_cover_every_catalog_metric() {
        let data = metrics("totalStake", 150.0, 100.0);
        let view = DashboardView::build(
            options("/statistics/staking"),
            &[(Section::Staking, data)],
        );

        let panel = &view.panels[0];
        assert_eq!(panel.title, "Staking");
        assert_eq!(panel.cards.len(), Section::Staking.metrics().len());
        assert_eq!(panel.cards[0].presentation.formatted_value, "150.00");
        assert_eq!(panel.cards[0].presentation.direction(), Direction::Up);
        assert_eq!(panel.cards[1].presentation.formatted_value, "NA");
        assert!(panel.tables.is_empty());
        assert_eq!(
            view.navigation.active_menu_path,
            vec!["/statistics".to_string(), "/statistics/staking".to_string()]
        );
    }

    #[test]
    fn policy_override_reaches_every_card() {
        let mut opts = options("/revenue");
        opts.policy = Some(TrendPolicy::TwoWay);
        let view = DashboardView::build(
            opts,
            &[(Section::Revenue, metrics("totalRevenue", 1.0, 1.0))],
        );
        assert!(view.panels[0]
            .cards
            .iter()
            .all(|card| card.presentation.policy == TrendPolicy::TwoWay));
        assert_eq!(view.panels[0].cards[0].presentation.direction(), Direction::Up);
    }

    #[test]
    fn ranking_tables_are_formatted_in_order() {
        let mut data = SectionData::default();
        data.tables.composition = vec![RevenueShare {
            source: "TS".to_string(),
            amount: Some(1234.5),
        }];
        data.tables.top_stakers = vec![
            TopHolder {
                address: "0xaa..01".to_string(),
                full_address: "0xaa01".to_string(),
                amount: Some(2500.0),
            },
            TopHolder {
                address: "0xbb..02".to_string(),
                full_address: "0xbb02".to_string(),
                amount: None,
            },
        ];
        data.tables.repeat_ranking = vec![RepeatClaim {
            address: "0xcc..03".to_string(),
            count: Some(f64::NAN),
        }];

        let panel = Panel::build(Section::Staking, &data, Locale::En, None);
        let titles: Vec<_> = panel.tables.iter().map(|table| table.title).collect();
        assert_eq!(titles, ["Top stakers", "Repeat claims", "Revenue composition"]);

        let stakers = &panel.tables[0];
        assert_eq!(stakers.headers, ["#", "Address", "Amount"]);
        assert_eq!(stakers.rows[0], ["1", "0xaa..01", "2,500.00"]);
        assert_eq!(stakers.rows[1], ["2", "0xbb..02", "NA"]);
        assert_eq!(panel.tables[1].rows[0][2], "NA");
        assert_eq!(panel.tables[2].rows[0], ["TS", "1,234.50"]);
    }

    #[test]
    fn user_table_keeps_only_filled_counters() {
        let mut data = SectionData::default();
        data.tables.top_users = vec![
            TopUser {
                address: "0xdd..04".to_string(),
                claim_count: Some(3.0),
                claim_amount: Some(42.125),
                ..TopUser::default()
            },
            TopUser {
                address: "0xee..05".to_string(),
                claim_count: Some(1.0),
                ..TopUser::default()
            },
        ];

        let panel = Panel::build(Section::ShitCode, &data, Locale::Zh, None);
        let users = &panel.tables[0];
        assert_eq!(users.title, "用户排行");
        assert_eq!(users.headers, ["排名", "地址", "领取次数", "领取数量"]);
        assert_eq!(users.rows[0], ["1", "0xdd..04", "3", "42.13"]);
        assert_eq!(users.rows[1], ["2", "0xee..05", "1", "NA"]);
    }
}
