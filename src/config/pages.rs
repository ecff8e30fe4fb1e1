//! Page model: the form-backed screens, grouped by area, each bound to one table.

use crate::config::schema::{self, tables, TableSchema, ValidationRule};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    List,
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

#[derive(Clone, Debug)]
pub struct PageSpec {
    /// URL segment under `/pages/`.
    pub path_segment: String,
    pub title: String,
    /// First menu level.
    pub area: String,
    /// Name of the row in the features table that grants access to this page.
    pub feature: String,
    pub table: String,
    pub schema: TableSchema,
    pub operations: Vec<Operation>,
    pub validation: BTreeMap<String, ValidationRule>,
    /// Columns never returned to clients.
    pub sensitive_columns: HashSet<String>,
    /// Sequence tag for ids of rows created through this page.
    pub id_tag: String,
}

impl PageSpec {
    pub fn allows(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct NavFeature {
    pub path: String,
    pub title: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct NavArea {
    pub area: String,
    pub features: Vec<NavFeature>,
}

#[derive(Clone, Debug)]
pub struct PageModel {
    pub pages: Vec<PageSpec>,
    pub page_by_path: HashMap<String, PageSpec>,
}

impl PageModel {
    pub fn new(pages: Vec<PageSpec>) -> Self {
        let page_by_path = pages.iter().map(|p| (p.path_segment.clone(), p.clone())).collect();
        PageModel { pages, page_by_path }
    }

    pub fn page_by_path(&self, path: &str) -> Option<&PageSpec> {
        self.page_by_path.get(path)
    }

    /// Two-level menu, areas in first-seen order, keeping only pages `visible` accepts.
    pub fn navigation<F>(&self, visible: F) -> Vec<NavArea>
    where
        F: Fn(&PageSpec) -> bool,
    {
        let mut areas: Vec<NavArea> = Vec::new();
        for page in self.pages.iter().filter(|&p| visible(p)) {
            let feature = NavFeature {
                path: page.path_segment.clone(),
                title: page.title.clone(),
            };
            match areas.iter_mut().find(|a| a.area == page.area) {
                Some(area) => area.features.push(feature),
                None => areas.push(NavArea {
                    area: page.area.clone(),
                    features: vec![feature],
                }),
            }
        }
        areas
    }

    /// Tables referenced by the pages, deduplicated, for bootstrap.
    pub fn tables(&self) -> Vec<(&str, TableSchema)> {
        let mut seen = HashSet::new();
        self.pages
            .iter()
            .filter(|p| seen.insert(p.table.as_str()))
            .map(|p| (p.table.as_str(), p.schema.clone()))
            .collect()
    }
}

const AREA_REGISTRY: &str = "Registry";
const AREA_ADMIN: &str = "Administration";

fn page(path: &str, title: &str, area: &str, table: &str, schema: TableSchema, id_tag: &str) -> PageSpec {
    PageSpec {
        path_segment: path.into(),
        title: title.into(),
        area: area.into(),
        feature: title.into(),
        table: table.into(),
        schema,
        operations: vec![
            Operation::List,
            Operation::Read,
            Operation::Create,
            Operation::Update,
            Operation::Delete,
        ],
        validation: BTreeMap::new(),
        sensitive_columns: HashSet::new(),
        id_tag: id_tag.into(),
    }
}

fn rules(pairs: Vec<(&str, ValidationRule)>) -> BTreeMap<String, ValidationRule> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Built-in pages: clients, menus, features, permissions and users.
pub fn builtin_pages() -> PageModel {
    let mut clients = page("clients", "Clients", AREA_REGISTRY, tables::CLIENTS, schema::clients_schema(), "cli");
    clients.validation = rules(vec![
        ("Name", ValidationRule::required()),
        ("BirthDate", ValidationRule::default().format("date")),
    ]);

    let mut menus = page("menus", "Menus", AREA_ADMIN, tables::MENUS, schema::menus_schema(), "menu");
    menus.validation = rules(vec![
        ("Name", ValidationRule::required()),
        ("Order", ValidationRule::required().minimum(1.0)),
    ]);

    let mut features = page("features", "Features", AREA_ADMIN, tables::FEATURES, schema::features_schema(), "feat");
    features.validation = rules(vec![
        ("Name", ValidationRule::required()),
        ("Path", ValidationRule::required()),
        ("MenuID", ValidationRule::required()),
    ]);

    let mut permissions = page(
        "permissions",
        "Permissions",
        AREA_ADMIN,
        tables::PERMISSIONS,
        schema::permissions_schema(),
        "perm",
    );
    permissions.operations = vec![Operation::List, Operation::Create, Operation::Delete];
    permissions.validation = rules(vec![
        ("UserID", ValidationRule::required()),
        ("FeatureID", ValidationRule::required()),
    ]);

    let mut users = page("users", "Users", AREA_ADMIN, tables::USERS, schema::users_schema(), "usr");
    users.validation = rules(vec![
        ("Name", ValidationRule::required()),
        ("Email", ValidationRule::required().format("email")),
        ("Password", ValidationRule::required()),
    ]);
    users.sensitive_columns = ["Password".to_string()].into_iter().collect();

    PageModel::new(vec![clients, menus, features, permissions, users])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_groups_by_area() {
        let model = builtin_pages();
        let nav = model.navigation(|_| true);
        assert_eq!(nav.len(), 2);
        assert_eq!(nav[0].area, AREA_REGISTRY);
        assert_eq!(nav[1].features.len(), 4);
        let only_clients = model.navigation(|p| p.path_segment == "clients");
        assert_eq!(only_clients.len(), 1);
        assert_eq!(only_clients[0].features[0].title, "Clients");
    }

    #[test]
    fn lookups() {
        let model = builtin_pages();
        assert!(model.page_by_path("users").is_some());
        assert!(model.page_by_path("finance").is_none());
        assert!(!model.page_by_path("permissions").unwrap().allows(Operation::Update));
        assert_eq!(model.tables().len(), 5);
    }
}
