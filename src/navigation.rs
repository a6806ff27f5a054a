//! Breadcrumbs, active-menu highlighting and sidebar expansion, all derived
//! from the current URL path.

use crate::catalog::Section;
use crate::locale::{LabelDictionary, LabelKey, Locale};
use rustc_hash::FxHashMap;
use serde::Serialize;

pub const ROOT_URL: &str = "/";
pub const LOGIN_URL: &str = "/login";

const LOG_TARGET: &str = "navigation";

/// Non-empty `/`-separated segments of a URL path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoutePath {
    segments: Vec<String>,
}

impl RoutePath {
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        Self {
            segments: path
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Canonical `/a/b` form; `/` for the root.
    pub fn to_url(&self) -> String {
        if self.is_root() {
            ROOT_URL.to_string()
        } else {
            let mut url = String::new();
            for segment in &self.segments {
                url.push('/');
                url.push_str(segment);
            }
            url
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreadcrumbSegment {
    pub label: String,
    pub href: String,
    /// The trailing "current page" entry, rendered without a link.
    pub current: bool,
}

pub fn resolve_breadcrumbs(path: &RoutePath, labels: &LabelDictionary) -> Vec<BreadcrumbSegment> {
    if path.is_root() {
        return vec![BreadcrumbSegment {
            label: labels.root_label().to_string(),
            href: ROOT_URL.to_string(),
            current: true,
        }];
    }

    let last = path.segments().len() - 1;
    let mut href = String::new();
    path.segments()
        .iter()
        .enumerate()
        .map(|(idx, segment)| {
            href.push('/');
            href.push_str(segment);
            BreadcrumbSegment {
                label: labels.get(segment).unwrap_or(segment.as_str()).to_string(),
                href: href.clone(),
                current: idx == last,
            }
        })
        .collect()
}

/// Root matches only itself; every other item matches by prefix so a parent
/// stays highlighted while one of its sub-routes is open.
pub fn is_active(item_url: &str, current_path: &str) -> bool {
    if item_url == ROOT_URL {
        current_path == ROOT_URL
    } else {
        current_path.starts_with(item_url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavNode {
    pub title: String,
    pub url: String,
    /// Static default-open flag, independent of the current route.
    pub seed_open: bool,
    pub children: Vec<NavNode>,
}

impl NavNode {
    pub fn leaf(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            seed_open: false,
            children: Vec::new(),
        }
    }

    pub fn branch(title: impl Into<String>, url: impl Into<String>, children: Vec<Self>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            seed_open: false,
            children,
        }
    }

    #[must_use]
    pub const fn seeded_open(mut self) -> Self {
        self.seed_open = true;
        self
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_active(&self, current_path: &str) -> bool {
        is_active(&self.url, current_path)
    }

    /// The node itself or any descendant is active.
    pub fn is_branch_active(&self, current_path: &str) -> bool {
        self.is_active(current_path)
            || self
                .children
                .iter()
                .any(|child| child.is_branch_active(current_path))
    }

    pub fn default_open(&self, current_path: &str) -> bool {
        self.seed_open || self.is_branch_active(current_path)
    }
}

pub type NavTree = Vec<NavNode>;

pub fn nav_tree(locale: Locale) -> NavTree {
    let section =
        |section: Section| NavNode::leaf(section.label_key().label(locale), section.url());
    vec![
        NavNode::leaf(LabelKey::Dashboard.label(locale), ROOT_URL),
        NavNode::branch(
            LabelKey::Statistics.label(locale),
            "/statistics",
            vec![
                section(Section::Staking),
                section(Section::Ts),
                section(Section::Pos),
                section(Section::ShitCode),
            ],
        )
        .seeded_open(),
        section(Section::Revenue),
        section(Section::Defi),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationState {
    pub breadcrumbs: Vec<BreadcrumbSegment>,
    pub active_menu_path: Vec<String>,
}

pub fn resolve(current_path: &str, tree: &[NavNode], labels: &LabelDictionary) -> NavigationState {
    NavigationState {
        breadcrumbs: resolve_breadcrumbs(&RoutePath::parse(current_path), labels),
        active_menu_path: active_menu_path(tree, current_path),
    }
}

/// Urls of every active node, parents before their children.
pub fn active_menu_path(tree: &[NavNode], current_path: &str) -> Vec<String> {
    let mut active = Vec::new();
    for node in tree {
        if node.is_active(current_path) {
            active.push(node.url.clone());
        }
        for child in &node.children {
            if child.is_active(current_path) {
                active.push(child.url.clone());
            }
        }
    }
    active
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuState {
    Collapsed,
    Expanded,
}

impl MenuState {
    const fn from_open(open: bool) -> Self {
        if open { Self::Expanded } else { Self::Collapsed }
    }

    const fn toggled(self) -> Self {
        match self {
            Self::Collapsed => Self::Expanded,
            Self::Expanded => Self::Collapsed,
        }
    }
}

/// Mounted sidebar: highlighting follows the route, expansion only follows
/// the user.
#[derive(Debug, Clone)]
pub struct Sidebar {
    tree: NavTree,
    current_path: String,
    menus: FxHashMap<String, MenuState>,
}

impl Sidebar {
    pub fn mount(tree: NavTree, current_path: &str) -> Self {
        let menus = tree
            .iter()
            .filter(|node| node.has_children())
            .map(|node| {
                (
                    node.url.clone(),
                    MenuState::from_open(node.default_open(current_path)),
                )
            })
            .collect();
        Self {
            tree,
            current_path: current_path.to_string(),
            menus,
        }
    }

    pub fn tree(&self) -> &[NavNode] {
        &self.tree
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    /// `None` for leaves and unknown urls.
    pub fn menu_state(&self, url: &str) -> Option<MenuState> {
        self.menus.get(url).copied()
    }

    pub fn is_expanded(&self, url: &str) -> bool {
        self.menu_state(url) == Some(MenuState::Expanded)
    }

    /// Flips a parent menu; returns the new state, or `None` if `url` has no menu.
    pub fn toggle(&mut self, url: &str) -> Option<MenuState> {
        let state = self.menus.get_mut(url)?;
        *state = state.toggled();
        log::debug!(target: LOG_TARGET, "menu {url} is now {state:?}");
        Some(*state)
    }

    pub fn navigate(&mut self, path: &str) {
        path.clone_into(&mut self.current_path);
    }

    pub fn active_menu_path(&self) -> Vec<String> {
        active_menu_path(&self.tree, &self.current_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn en() -> LabelDictionary {
        LabelDictionary::for_locale(Locale::En)
    }

    #[test]
    fn parses_paths() {
        assert!(RoutePath::parse("/").is_root());
        assert!(RoutePath::parse("").is_root());
        assert_eq!(
            RoutePath::parse("//statistics///staking/").segments(),
            ["statistics", "staking"]
        );
        assert_eq!(RoutePath::parse("/defi?tab=liq#top").to_url(), "/defi");
    }

    #[test]
    fn root_breadcrumb_is_current_dashboard() {
        let crumbs = resolve_breadcrumbs(&RoutePath::parse("/"), &en());
        assert_eq!(
            crumbs,
            vec![BreadcrumbSegment {
                label: "Dashboard".into(),
                href: "/".into(),
                current: true,
            }]
        );
    }

    #[test]
    fn breadcrumbs_accumulate_hrefs() {
        let crumbs = resolve_breadcrumbs(&RoutePath::parse("/statistics/staking"), &en());
        assert_eq!(crumbs.len(), 2);
        assert_eq!(crumbs[0].label, "Statistics");
        assert_eq!(crumbs[0].href, "/statistics");
        assert!(!crumbs[0].current);
        assert_eq!(crumbs[1].label, "Staking");
        assert_eq!(crumbs[1].href, "/statistics/staking");
        assert!(crumbs[1].current);
    }

    #[test]
    fn unknown_segment_falls_back_to_raw_text() {
        let crumbs = resolve_breadcrumbs(&RoutePath::parse("/foobar"), &en());
        assert_eq!(crumbs[0].label, "foobar");
        assert!(crumbs[0].current);
    }

    #[test]
    fn labels_follow_locale() {
        let zh = LabelDictionary::for_locale(Locale::Zh);
        let crumbs = resolve_breadcrumbs(&RoutePath::parse("/statistics/ts"), &zh);
        assert_eq!(crumbs[0].label, "数据统计");
    }

    #[test]
    fn root_is_active_only_on_root() {
        assert!(is_active("/", "/"));
        assert!(!is_active("/", "/statistics"));
        assert!(is_active("/statistics", "/statistics/ts"));
        assert!(!is_active("/revenue", "/statistics"));
    }

    #[test]
    fn default_open_ors_seed_and_activity() {
        let tree = nav_tree(Locale::En);
        let statistics = &tree[1];
        assert!(statistics.default_open("/revenue"));

        let unseeded = NavNode::branch("Stats", "/statistics", statistics.children.clone());
        assert!(!unseeded.default_open("/revenue"));
        assert!(unseeded.default_open("/statistics/pos"));
    }

    #[test]
    fn active_menu_path_lists_parent_then_child() {
        let tree = nav_tree(Locale::En);
        assert_eq!(
            active_menu_path(&tree, "/statistics/staking"),
            vec!["/statistics".to_string(), "/statistics/staking".to_string()]
        );
        assert_eq!(active_menu_path(&tree, "/"), vec!["/".to_string()]);
        assert!(active_menu_path(&tree, "/nowhere").is_empty());
    }

    #[test]
    fn sidebar_expansion_ignores_navigation() {
        let unseeded = vec![NavNode::branch(
            "Stats",
            "/statistics",
            vec![NavNode::leaf("Staking", "/statistics/staking")],
        )];
        let mut sidebar = Sidebar::mount(unseeded, "/statistics/staking");
        assert_eq!(sidebar.menu_state("/statistics"), Some(MenuState::Expanded));

        assert_eq!(sidebar.toggle("/statistics"), Some(MenuState::Collapsed));
        sidebar.navigate("/statistics");
        assert!(!sidebar.is_expanded("/statistics"));
        assert_eq!(sidebar.active_menu_path(), vec!["/statistics".to_string()]);

        assert_eq!(sidebar.toggle("/statistics/staking"), None);
        assert_eq!(sidebar.toggle("/statistics"), Some(MenuState::Expanded));
    }

    #[test]
    fn sidebar_starts_collapsed_when_nothing_opens_it() {
        let tree = vec![NavNode::branch(
            "Stats",
            "/statistics",
            vec![NavNode::leaf("Staking", "/statistics/staking")],
        )];
        let sidebar = Sidebar::mount(tree, "/");
        assert_eq!(sidebar.menu_state("/statistics"), Some(MenuState::Collapsed));
    }
}
