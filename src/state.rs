use crate::catalog::Catalog;
use crate::model::ToolRecord;

/// One category node of the tool tree.
#[derive(Debug, PartialEq, Eq)]
pub struct CategoryGroup<'a> {
    pub category: &'a str,
    pub tools: Vec<&'a ToolRecord>,
}

/// The filtered, grouped view of the catalog shown in the tree.
pub struct ViewState<'a> {
    catalog: &'a Catalog,
    pub query: String,
    pub groups: Vec<CategoryGroup<'a>>,
}

impl<'a> ViewState<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        let mut state = Self {
            catalog,
            query: String::new(),
            groups: Vec::new(),
        };
        state.update_filter();
        state
    }

    pub fn update_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.update_filter();
    }

    /// Case-insensitive substring match on name or category, grouped by
    /// category in the order categories first appear. A query that matches
    /// nothing shows the whole catalog.
    pub fn update_filter(&mut self) {
        let catalog: &'a Catalog = self.catalog;
        let needle = self.query.to_lowercase();

        let hits: Vec<&'a ToolRecord> = catalog
            .tools()
            .iter()
            .filter(|tool| {
                needle.is_empty()
                    || tool.name.to_lowercase().contains(&needle)
                    || tool.category.to_lowercase().contains(&needle)
            })
            .collect();
        let groups = if hits.is_empty() {
            group_by_category(catalog.tools().iter())
        } else {
            group_by_category(hits.into_iter())
        };

        log::info!(
            "ViewState: query='{}', groups={}, tools={}",
            self.query,
            groups.len(),
            groups.iter().map(|g| g.tools.len()).sum::<usize>()
        );
        self.groups = groups;
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

fn group_by_category<'a>(tools: impl Iterator<Item = &'a ToolRecord>) -> Vec<CategoryGroup<'a>> {
    let mut groups: Vec<CategoryGroup<'a>> = Vec::new();
    for tool in tools {
        match groups.iter_mut().find(|g| g.category == tool.category) {
            Some(group) => group.tools.push(tool),
            None => groups.push(CategoryGroup {
                category: &tool.category,
                tools: vec![tool],
            }),
        }
    }
    groups
}
