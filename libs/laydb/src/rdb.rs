//! Report databases: per-layer annotated issues for inspection.

use arcstr::ArcStr;
use geometry::edge::DEdge;
use geometry::polygon::DPolygon;
use serde::{Deserialize, Serialize};

/// An identifier of a category within a [`ReportDatabase`].
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RdbCategoryId(usize);

/// An identifier of a cell entry within a [`ReportDatabase`].
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RdbCellId(usize);

/// An identifier of an item within a [`ReportDatabase`].
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RdbItemId(usize);

/// A value attached to a report item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RdbValue {
    /// A descriptive string.
    String(String),
    /// An offending polygon, in microns.
    Polygon(DPolygon),
    /// An offending edge, in microns.
    Edge(DEdge),
}

impl From<&str> for RdbValue {
    fn from(value: &str) -> Self {
        RdbValue::String(value.to_string())
    }
}

impl From<String> for RdbValue {
    fn from(value: String) -> Self {
        RdbValue::String(value)
    }
}

impl From<DPolygon> for RdbValue {
    fn from(value: DPolygon) -> Self {
        RdbValue::Polygon(value)
    }
}

impl From<DEdge> for RdbValue {
    fn from(value: DEdge) -> Self {
        RdbValue::Edge(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Category {
    name: ArcStr,
    parent: Option<RdbCategoryId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Item {
    cell: RdbCellId,
    category: RdbCategoryId,
    values: Vec<RdbValue>,
}

/// A database of annotated issues, organized as a category tree with items
/// attached to cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDatabase {
    name: ArcStr,
    categories: Vec<Category>,
    cells: Vec<ArcStr>,
    items: Vec<Item>,
}

impl ReportDatabase {
    /// Creates an empty report database.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            categories: Vec::new(),
            cells: Vec::new(),
            items: Vec::new(),
        }
    }

    /// The name of the database.
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Creates a top-level category.
    pub fn create_category(&mut self, name: impl Into<ArcStr>) -> RdbCategoryId {
        self.categories.push(Category {
            name: name.into(),
            parent: None,
        });
        RdbCategoryId(self.categories.len() - 1)
    }

    /// Creates a category nested under `parent`.
    pub fn create_sub_category(
        &mut self,
        parent: RdbCategoryId,
        name: impl Into<ArcStr>,
    ) -> RdbCategoryId {
        self.categories.push(Category {
            name: name.into(),
            parent: Some(parent),
        });
        RdbCategoryId(self.categories.len() - 1)
    }

    /// The dot-separated path of a category.
    pub fn category_path(&self, id: RdbCategoryId) -> String {
        let cat = &self.categories[id.0];
        match cat.parent {
            Some(parent) => format!("{}.{}", self.category_path(parent), cat.name),
            None => cat.name.to_string(),
        }
    }

    /// Finds a category by its dot-separated path.
    pub fn category_by_path(&self, path: &str) -> Option<RdbCategoryId> {
        (0..self.categories.len())
            .map(RdbCategoryId)
            .find(|&id| self.category_path(id) == path)
    }

    /// Registers a cell entry.
    pub fn create_cell(&mut self, name: impl Into<ArcStr>) -> RdbCellId {
        self.cells.push(name.into());
        RdbCellId(self.cells.len() - 1)
    }

    /// Creates an item attached to `cell` under `category`.
    pub fn create_item(&mut self, cell: RdbCellId, category: RdbCategoryId) -> RdbItemId {
        self.items.push(Item {
            cell,
            category,
            values: Vec::new(),
        });
        RdbItemId(self.items.len() - 1)
    }

    /// Appends a value to an item.
    pub fn add_value(&mut self, item: RdbItemId, value: impl Into<RdbValue>) {
        self.items[item.0].values.push(value.into());
    }

    /// The total number of items in the database.
    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    /// The number of items filed directly under `category`.
    pub fn items_in(&self, category: RdbCategoryId) -> usize {
        self.items.iter().filter(|i| i.category == category).count()
    }

    /// The values of an item.
    pub fn item_values(&self, item: RdbItemId) -> &[RdbValue] {
        &self.items[item.0].values
    }

    /// `(category path, item count)` pairs for every category with items,
    /// in category creation order.
    pub fn category_summary(&self) -> Vec<(String, usize)> {
        (0..self.categories.len())
            .map(RdbCategoryId)
            .map(|id| (self.category_path(id), self.items_in(id)))
            .filter(|(_, n)| *n > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_paths_nest() {
        let mut db = ReportDatabase::new("Routing Errors");
        let top = db.create_category("Manhattan Routing Collisions");
        let layer = db.create_sub_category(top, "1/0");
        let errors = db.create_sub_category(layer, "RoutingErrors");
        assert_eq!(
            db.category_path(errors),
            "Manhattan Routing Collisions.1/0.RoutingErrors"
        );
        assert_eq!(
            db.category_by_path("Manhattan Routing Collisions.1/0.RoutingErrors"),
            Some(errors)
        );
        assert_eq!(db.category_by_path("nope"), None);
    }

    #[test]
    fn items_collect_values() {
        let mut db = ReportDatabase::new("test");
        let cat = db.create_category("cat");
        let cell = db.create_cell("top");
        let item = db.create_item(cell, cat);
        db.add_value(item, "description");
        assert_eq!(db.num_items(), 1);
        assert_eq!(db.items_in(cat), 1);
        assert_eq!(db.item_values(item).len(), 1);
    }
}
